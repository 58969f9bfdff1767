use std::io::Write;

use crate::{account::AccountId, customer::CustomerId};
use anyhow::Context;
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

/// One line of the account report.
#[derive(Debug, Serialize)]
pub struct AccountRow<'a> {
    pub customer: CustomerId,
    pub national_id: &'a str,
    pub account: AccountId,
    pub kind: &'static str,
    pub balance: Decimal,
    pub entries: usize,
}

pub fn print_accounts<'a, W>(
    output: &mut W,
    accounts: impl Iterator<Item = AccountRow<'a>>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for acc in accounts {
        let account = acc.account;
        writer
            .serialize(acc)
            .with_context(|| format!("Failed to write account {account} to CSV"))?;
    }
    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}
