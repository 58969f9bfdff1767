use tracing::debug;

use crate::{
    command::{CommandArgs, LedgerCommand, OperationKind},
    ledger::Ledger,
};

use super::{CommandProcessor, ProcessError};

pub struct InMemoryProcessor {
    pub ledger: Ledger,
}

impl InMemoryProcessor {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }
}

impl CommandProcessor for InMemoryProcessor {
    fn process_command(
        &mut self,
        kind: OperationKind,
        args: CommandArgs,
    ) -> Result<(), ProcessError> {
        let cmd = LedgerCommand::parse_command(kind, args)?;
        debug!(?cmd, "processing");
        match cmd {
            LedgerCommand::AddCustomer {
                full_name,
                national_id,
                date_of_birth,
            } => {
                self.ledger
                    .add_customer(full_name, national_id, date_of_birth)?;
            }
            LedgerCommand::UpdateCustomer {
                national_id,
                full_name,
                date_of_birth,
            } => {
                self.ledger
                    .update_customer(&national_id, full_name, date_of_birth)?;
            }
            LedgerCommand::RemoveCustomer { national_id } => {
                self.ledger.remove_customer(&national_id)?;
            }
            LedgerCommand::OpenAccount {
                national_id,
                kind,
                initial_balance,
            } => {
                self.ledger
                    .open_account(&national_id, kind, initial_balance)?;
            }
            LedgerCommand::Deposit { account, amount } => {
                self.ledger.deposit(&account, amount)?;
            }
            LedgerCommand::Withdraw { account, amount } => {
                self.ledger.withdraw(&account, amount)?;
            }
            LedgerCommand::Transfer { from, to, amount } => {
                self.ledger.transfer(&from, &to, amount)?;
            }
            LedgerCommand::MonthEnd { period } => {
                self.ledger.end_of_month(period)?;
            }
        };
        Ok(())
    }
}
