use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

pub type AccountId = u32;

/// Kind specific policy of an account. Withdrawal feasibility and month-end
/// processing are decided by matching on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    /// Interest bearing, balance never goes below zero.
    Savings { interest_rate: Decimal },
    /// May go below zero down to `-overdraft_limit`, no interest.
    Current { overdraft_limit: Decimal },
}

impl AccountKind {
    pub fn name(&self) -> &'static str {
        match self {
            AccountKind::Savings { .. } => "savings",
            AccountKind::Current { .. } => "current",
        }
    }

    /// Interest rate for savings, overdraft limit for current accounts.
    pub fn parameter(&self) -> Decimal {
        match *self {
            AccountKind::Savings { interest_rate } => interest_rate,
            AccountKind::Current { overdraft_limit } => overdraft_limit,
        }
    }

    /// Feasibility check for taking `amount` out of `balance`.
    pub fn check_withdrawal(&self, balance: Decimal, amount: Decimal) -> Result<(), AccountError> {
        match *self {
            AccountKind::Savings { .. } => {
                if balance < amount {
                    Err(AccountError::InsufficientFunds { balance, amount })
                } else {
                    Ok(())
                }
            }
            AccountKind::Current { overdraft_limit } => {
                // a sum past Decimal::MAX covers any amount
                let available = balance.checked_add(overdraft_limit);
                if available.is_some_and(|available| available < amount) {
                    Err(AccountError::OverdraftExceeded {
                        balance,
                        overdraft_limit,
                        amount,
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Interest accrued on `balance` at month end, `None` when the kind has
    /// no month-end processing at all.
    pub fn month_end_interest(&self, balance: Decimal) -> Result<Option<Decimal>, AccountError> {
        match *self {
            AccountKind::Savings { interest_rate } => balance
                .checked_mul(interest_rate)
                .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
                .map(Some)
                .ok_or(AccountError::Overflow {
                    balance,
                    amount: interest_rate,
                }),
            AccountKind::Current { .. } => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEventKind {
    Opened,
    Deposited,
    Withdrawn,
    InterestAccrued,
    /// Cross reference note written on the source side of a transfer.
    TransferredTo(AccountId),
    /// Cross reference note written on the destination side of a transfer.
    ReceivedFrom(AccountId),
}

/// Single transaction log entry. `balance` is the account balance right
/// after the entry was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEvent {
    kind: AccountEventKind,
    amount: Decimal,
    balance: Decimal,
    recorded_at: DateTime<Utc>,
}

impl AccountEvent {
    pub(crate) fn new(kind: AccountEventKind, amount: Decimal, balance: Decimal) -> Self {
        Self {
            kind,
            amount,
            balance,
            recorded_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> AccountEventKind {
        self.kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Signed effect of the entry on the balance. Transfer notes only
    /// reference the counterparty, the money moves with the
    /// withdrawal/deposit entries next to them.
    pub fn delta(&self) -> Decimal {
        match self.kind {
            AccountEventKind::Opened
            | AccountEventKind::Deposited
            | AccountEventKind::InterestAccrued => self.amount,
            AccountEventKind::Withdrawn => -self.amount,
            AccountEventKind::TransferredTo(_) | AccountEventKind::ReceivedFrom(_) => Decimal::ZERO,
        }
    }

    pub fn is_transfer_note(&self) -> bool {
        matches!(
            self.kind,
            AccountEventKind::TransferredTo(_) | AccountEventKind::ReceivedFrom(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("Invalid amount {amount}")]
    InvalidAmount { amount: Decimal },
    #[error("Insufficient funds: balance is {balance}, requested {amount}")]
    InsufficientFunds { balance: Decimal, amount: Decimal },
    #[error("Overdraft limit of {overdraft_limit} exceeded: balance is {balance}, requested {amount}")]
    OverdraftExceeded {
        balance: Decimal,
        overdraft_limit: Decimal,
        amount: Decimal,
    },
    #[error("Balance {balance} can't take {amount} without overflowing")]
    Overflow { balance: Decimal, amount: Decimal },
}

/// Balance plus the append-only log it is derived from.
///
/// Every mutation goes through two steps: `handle_*` decides on the entry
/// without touching the account, then [`Account::apply`] appends it and moves
/// the balance. Callers that must keep several accounts consistent decide
/// everything first and apply afterwards.
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    kind: AccountKind,
    balance: Decimal,
    date_opened: DateTime<Utc>,
    log: Vec<AccountEvent>,
}

impl Account {
    /// Ids come from the ledger's allocator, see [`crate::ledger::Ledger::open_account`].
    pub(crate) fn open(
        id: AccountId,
        kind: AccountKind,
        initial_balance: Decimal,
    ) -> Result<Self, AccountError> {
        if initial_balance < Decimal::ZERO {
            return Err(AccountError::InvalidAmount {
                amount: initial_balance,
            });
        }
        if kind.parameter() < Decimal::ZERO {
            return Err(AccountError::InvalidAmount {
                amount: kind.parameter(),
            });
        }
        let opened = AccountEvent::new(AccountEventKind::Opened, initial_balance, initial_balance);
        let mut account = Self {
            id,
            kind,
            balance: Decimal::ZERO,
            date_opened: opened.recorded_at,
            log: Vec::new(),
        };
        account.apply(opened);
        Ok(account)
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn date_opened(&self) -> DateTime<Utc> {
        self.date_opened
    }

    pub fn transaction_log(&self) -> &[AccountEvent] {
        &self.log
    }

    /// Balance recomputed from the transaction log.
    pub fn replayed_balance(&self) -> Decimal {
        self.log.iter().map(AccountEvent::delta).sum()
    }

    pub fn handle_deposit(&self, amount: Decimal) -> Result<AccountEvent, AccountError> {
        ensure_positive(amount)?;
        Ok(AccountEvent::new(
            AccountEventKind::Deposited,
            amount,
            self.moved_by(amount)?,
        ))
    }

    pub fn handle_withdraw(&self, amount: Decimal) -> Result<AccountEvent, AccountError> {
        ensure_positive(amount)?;
        self.kind.check_withdrawal(self.balance, amount)?;
        Ok(AccountEvent::new(
            AccountEventKind::Withdrawn,
            amount,
            self.moved_by(-amount)?,
        ))
    }

    /// `Ok(None)` when the kind has nothing to do at month end.
    pub fn handle_end_of_month(&self) -> Result<Option<AccountEvent>, AccountError> {
        let Some(interest) = self.kind.month_end_interest(self.balance)? else {
            return Ok(None);
        };
        Ok(Some(AccountEvent::new(
            AccountEventKind::InterestAccrued,
            interest,
            self.moved_by(interest)?,
        )))
    }

    fn moved_by(&self, delta: Decimal) -> Result<Decimal, AccountError> {
        self.balance.checked_add(delta).ok_or(AccountError::Overflow {
            balance: self.balance,
            amount: delta.abs(),
        })
    }

    pub(crate) fn apply(&mut self, event: AccountEvent) {
        self.balance += event.delta();
        debug_assert_eq!(self.balance, event.balance, "log entry out of sync with balance");
        self.log.push(event);
    }

    /// Returns the new balance.
    pub fn deposit(&mut self, amount: Decimal) -> Result<Decimal, AccountError> {
        let event = self.handle_deposit(amount)?;
        self.apply(event);
        Ok(self.balance)
    }

    /// Returns the new balance.
    pub fn withdraw(&mut self, amount: Decimal) -> Result<Decimal, AccountError> {
        let event = self.handle_withdraw(amount)?;
        self.apply(event);
        Ok(self.balance)
    }

    /// Applies the kind's month-end rule and returns the accrued interest.
    /// Running it twice in one period accrues twice; scheduling is up to
    /// the caller.
    pub fn end_of_month_process(&mut self) -> Result<Option<Decimal>, AccountError> {
        let Some(event) = self.handle_end_of_month()? else {
            return Ok(None);
        };
        let interest = event.amount;
        self.apply(event);
        Ok(Some(interest))
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), AccountError> {
    if amount <= Decimal::ZERO {
        Err(AccountError::InvalidAmount { amount })
    } else {
        Ok(())
    }
}
