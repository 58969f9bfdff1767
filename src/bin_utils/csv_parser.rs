use std::io::Read;

use crate::{
    account::AccountId,
    command::{CommandArgs, OperationKind},
};
use chrono::NaiveDate;
use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

/// One row of the operations file. Columns that an operation doesn't use
/// are left empty.
#[derive(Debug, Deserialize)]
pub struct Operation {
    #[serde(rename = "op")]
    pub kind: OperationKind,
    pub national_id: Option<String>,
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub account: Option<AccountId>,
    pub to_national_id: Option<String>,
    pub to_account: Option<AccountId>,
    pub amount: Option<Decimal>,
    pub param: Option<Decimal>,
}

impl From<Operation> for CommandArgs {
    fn from(op: Operation) -> Self {
        CommandArgs {
            national_id: op.national_id,
            name: op.name,
            date: op.date,
            account: op.account,
            to_national_id: op.to_national_id,
            to_account: op.to_account,
            amount: op.amount,
            param: op.param,
        }
    }
}

/// Parses a list of ledger operations in CSV format. Yields the line number
/// of every row along with the row itself, or the reason it couldn't be
/// read.
pub struct CsvOperationParser<R> {
    iter: DeserializeRecordsIntoIter<R, Operation>,
}

impl<R> CsvOperationParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvOperationParser<R>
where
    R: Read,
{
    type Item = (u64, Result<Operation, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
