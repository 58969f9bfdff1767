use std::{sync::Arc, time::Duration};

use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    account::{Account, AccountError, AccountEvent, AccountId},
    ledger::MonthEndSummary,
    transfer::{self, InfeasibleReason, TransferError, TransferReceipt},
};

/// Bounded wait used for every per-account lock. A lock that can't be taken
/// within `timeout` is retried `retries` more times before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(50),
            retries: 3,
        }
    }
}

impl LockPolicy {
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SharedAccountError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("account {account} stayed locked after {attempts} attempts")]
    LockTimeout { account: AccountId, attempts: u32 },
}

/// Account guarded by its own lock, the unit of mutual exclusion when
/// several threads work on the same accounts. The ledger stores every account
/// this way and hands out clones, which share the account.
#[derive(Debug, Clone)]
pub struct SharedAccount {
    id: AccountId,
    inner: Arc<Mutex<Account>>,
}

impl SharedAccount {
    pub(crate) fn new(account: Account) -> Self {
        Self {
            id: account.id(),
            inner: Arc::new(Mutex::new(account)),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Takes the lock within the policy's bounded wait.
    pub fn try_lock(&self, policy: &LockPolicy) -> Option<MutexGuard<'_, Account>> {
        (0..policy.attempts()).find_map(|_| self.inner.try_lock_for(policy.timeout))
    }

    /// Waits for the lock without a bound. Meant for reporting.
    pub fn read(&self) -> MutexGuard<'_, Account> {
        self.inner.lock()
    }

    pub fn balance(&self) -> Decimal {
        self.read().balance()
    }

    /// Copy of the account taken under its lock.
    pub fn snapshot(&self, policy: &LockPolicy) -> Result<Account, SharedAccountError> {
        Ok(self.lock_or_timeout(policy)?.clone())
    }

    pub fn deposit(&self, amount: Decimal, policy: &LockPolicy) -> Result<Decimal, SharedAccountError> {
        Ok(self.lock_or_timeout(policy)?.deposit(amount)?)
    }

    pub fn withdraw(&self, amount: Decimal, policy: &LockPolicy) -> Result<Decimal, SharedAccountError> {
        Ok(self.lock_or_timeout(policy)?.withdraw(amount)?)
    }

    fn lock_or_timeout(
        &self,
        policy: &LockPolicy,
    ) -> Result<MutexGuard<'_, Account>, SharedAccountError> {
        self.try_lock(policy).ok_or_else(|| {
            warn!(account = self.id, "account lock timed out");
            SharedAccountError::LockTimeout {
                account: self.id,
                attempts: policy.attempts(),
            }
        })
    }
}

/// Transfer between two shared accounts.
///
/// Both locks are taken before either account is touched, lower account id
/// first, so concurrent transfers in opposite directions can't deadlock. If
/// the second lock isn't available the first one is released before the
/// next attempt. Running out of attempts is reported as an infeasible
/// transfer and nothing is mutated.
pub fn transfer_shared(
    from: &SharedAccount,
    to: &SharedAccount,
    amount: Decimal,
    policy: &LockPolicy,
) -> Result<TransferReceipt, TransferError> {
    if amount <= Decimal::ZERO {
        return Err(TransferError::InvalidAmount { amount });
    }
    if from.id == to.id {
        return Err(TransferError::SameAccount { account: from.id });
    }

    let from_first = from.id < to.id;
    let (first, second) = if from_first { (from, to) } else { (to, from) };

    let mut blocked = first.id;
    for attempt in 1..=policy.attempts() {
        let Some(mut first_guard) = first.inner.try_lock_for(policy.timeout) else {
            blocked = first.id;
            debug!(account = first.id, attempt, "lock busy");
            continue;
        };
        let Some(mut second_guard) = second.inner.try_lock_for(policy.timeout) else {
            drop(first_guard);
            blocked = second.id;
            debug!(account = second.id, attempt, "lock busy");
            continue;
        };
        let (source, destination) = if from_first {
            (&mut *first_guard, &mut *second_guard)
        } else {
            (&mut *second_guard, &mut *first_guard)
        };
        return transfer::transfer(source, destination, amount);
    }

    warn!(from = from.id, to = to.id, blocked, "transfer gave up waiting for locks");
    Err(TransferError::TransferInfeasible {
        from: from.id,
        reason: InfeasibleReason::LockTimeout {
            account: blocked,
            attempts: policy.attempts(),
        },
    })
}

/// Locks every account, lowest id first, the same order [`transfer_shared`]
/// uses. Either all guards are returned or none is held.
pub(crate) fn lock_all<'a>(
    accounts: &'a [SharedAccount],
    policy: &LockPolicy,
) -> Result<Vec<MutexGuard<'a, Account>>, SharedAccountError> {
    let mut ordered: Vec<&SharedAccount> = accounts.iter().collect();
    ordered.sort_by_key(|account| account.id);
    ordered
        .into_iter()
        .map(|account| account.lock_or_timeout(policy))
        .collect()
}

/// Month-end processing over shared accounts, one account at a time. Each
/// account is processed under its own lock; accounts whose lock can't be
/// taken, or whose interest doesn't fit, are skipped and reported so the
/// caller can retry them. Scheduling (once per period) is up to the caller,
/// see [`crate::ledger::Ledger::end_of_month`] for the all-or-nothing run.
pub fn end_of_month_shared(accounts: &[SharedAccount], policy: &LockPolicy) -> MonthEndSummary {
    let mut summary = MonthEndSummary::default();
    for account in accounts {
        let Some(mut guard) = account.try_lock(policy) else {
            warn!(account = account.id, "month end skipped, account locked");
            summary.skipped.push(account.id);
            continue;
        };
        let decided = guard.handle_end_of_month().and_then(|entry| {
            let interest = entry.as_ref().map_or(Decimal::ZERO, AccountEvent::amount);
            let total = summary
                .interest
                .checked_add(interest)
                .ok_or(AccountError::Overflow {
                    balance: summary.interest,
                    amount: interest,
                })?;
            Ok((entry, total))
        });
        match decided {
            Ok((entry, total)) => {
                if let Some(entry) = entry {
                    guard.apply(entry);
                }
                summary.processed += 1;
                summary.interest = total;
            }
            Err(err) => {
                warn!(account = account.id, "month end skipped: {err}");
                summary.skipped.push(account.id);
            }
        }
    }
    summary
}
