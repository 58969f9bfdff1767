use thiserror::Error;

use crate::{
    command::{CommandArgs, CommandError, OperationKind},
    ledger::LedgerError,
};

pub mod in_memory_processor;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    CommandErr(#[from] CommandError),
    #[error(transparent)]
    LedgerErr(#[from] LedgerError),
}

pub trait CommandProcessor {
    fn process_command(
        &mut self,
        kind: OperationKind,
        args: CommandArgs,
    ) -> Result<(), ProcessError>;
}
