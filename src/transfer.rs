use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::account::{Account, AccountError, AccountEvent, AccountEventKind, AccountId};

/// Why a transfer could not go ahead. Nothing was mutated in either case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InfeasibleReason {
    #[error(transparent)]
    Withdrawal(AccountError),
    /// The destination can't take the amount.
    #[error("destination can't be credited: {0}")]
    Deposit(AccountError),
    #[error("account {account} stayed locked after {attempts} attempts")]
    LockTimeout { account: AccountId, attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("Transfer amount must be positive, got {amount}")]
    InvalidAmount { amount: Decimal },
    #[error("Cannot transfer from account {account} to itself")]
    SameAccount { account: AccountId },
    #[error("Transfer from account {from} is infeasible: {reason}")]
    TransferInfeasible {
        from: AccountId,
        reason: InfeasibleReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
    pub from_balance: Decimal,
    pub to_balance: Decimal,
}

/// Moves `amount` from `from` to `to`.
///
/// The source kind's withdrawal rule is checked and all four log entries
/// (withdrawal, deposit, two cross reference notes) are decided before
/// either account is touched, so the pair is applied as a whole or not at
/// all.
pub(crate) fn transfer(
    from: &mut Account,
    to: &mut Account,
    amount: Decimal,
) -> Result<TransferReceipt, TransferError> {
    if amount <= Decimal::ZERO {
        return Err(TransferError::InvalidAmount { amount });
    }
    let (from_id, to_id) = (from.id(), to.id());
    if from_id == to_id {
        return Err(TransferError::SameAccount { account: from_id });
    }

    let infeasible = |reason| TransferError::TransferInfeasible {
        from: from_id,
        reason,
    };
    let withdrawn = from
        .handle_withdraw(amount)
        .map_err(|err| infeasible(InfeasibleReason::Withdrawal(err)))?;
    let deposited = to
        .handle_deposit(amount)
        .map_err(|err| infeasible(InfeasibleReason::Deposit(err)))?;

    let sent_note = AccountEvent::new(
        AccountEventKind::TransferredTo(to_id),
        amount,
        withdrawn.balance(),
    );
    let received_note = AccountEvent::new(
        AccountEventKind::ReceivedFrom(from_id),
        amount,
        deposited.balance(),
    );

    from.apply(withdrawn);
    from.apply(sent_note);
    to.apply(deposited);
    to.apply(received_note);

    debug!(from = from_id, to = to_id, %amount, "transfer applied");
    Ok(TransferReceipt {
        from: from_id,
        to: to_id,
        amount,
        from_balance: from.balance(),
        to_balance: to.balance(),
    })
}
