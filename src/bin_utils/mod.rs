//! Bootstraps the ledger from a CSV file of operations and prints the
//! resulting accounts. Used by the binary and by the integration tests.

use std::io::{Read, Write};

use crate::{
    config::LedgerConfig,
    ledger::Ledger,
    processor::{CommandProcessor, ProcessError, in_memory_processor::InMemoryProcessor},
};
use anyhow::Result;
use csv_parser::CsvOperationParser;
use csv_printer::{AccountRow, print_accounts};
pub mod csv_parser;
pub mod csv_printer;

/// Failure while handling a single row. None of them stop the run.
#[derive(Debug)]
pub enum RowError {
    Malformed(csv::Error),
    Rejected(ProcessError),
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub config: LedgerConfig,
    pub error_printer: Box<dyn FnMut(u64, RowError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvOperationParser::new(self.input);

        let mut processor = InMemoryProcessor::new(Ledger::from_config(&self.config));

        for (line, row) in parser {
            let op = match row {
                Ok(op) => op,
                Err(err) => {
                    (self.error_printer)(line, RowError::Malformed(err));
                    continue;
                }
            };
            if let Err(err) = processor.process_command(op.kind, op.into()) {
                (self.error_printer)(line, RowError::Rejected(err));
            }
        }

        let ledger = &processor.ledger;
        print_accounts(
            self.output,
            ledger.customers().flat_map(|customer| {
                customer.accounts().iter().map(move |acc| {
                    let acc = acc.read();
                    AccountRow {
                        customer: customer.id(),
                        national_id: customer.national_id().as_str(),
                        account: acc.id(),
                        kind: acc.kind().name(),
                        balance: acc.balance(),
                        entries: acc.transaction_log().len(),
                    }
                })
            }),
        )
    }
}
