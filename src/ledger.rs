use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use chrono::{Datelike, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    account::{Account, AccountError, AccountId, AccountKind},
    config::LedgerConfig,
    customer::{self, Customer, CustomerError, CustomerId, NationalId},
    ids::IdAllocator,
    sync::{self, LockPolicy, SharedAccount, SharedAccountError},
    transfer::{TransferError, TransferReceipt},
};

/// Calendar month used to schedule month-end processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Addresses an account through the customer owning it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountRef {
    pub national_id: NationalId,
    pub account_id: AccountId,
}

impl AccountRef {
    pub fn new(national_id: NationalId, account_id: AccountId) -> Self {
        Self {
            national_id,
            account_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthEndSummary {
    /// Accounts the month-end rule ran on
    pub processed: usize,
    /// Interest accrued over all accounts
    pub interest: Decimal,
    /// Accounts that could not be processed
    pub skipped: Vec<AccountId>,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Customer with national ID {national_id} already exists")]
    DuplicateNationalId { national_id: NationalId },
    #[error("Customer with national ID {national_id} not found")]
    CustomerNotFound { national_id: NationalId },
    #[error("Account {account_id} not found for customer {national_id}")]
    AccountNotFound {
        national_id: NationalId,
        account_id: AccountId,
    },
    #[error("Customer {national_id} cannot be removed, account {account_id} holds {balance}")]
    NonZeroBalanceRemoval {
        national_id: NationalId,
        account_id: AccountId,
        balance: Decimal,
    },
    #[error("Period {period} is already closed, last closed period is {last_closed}")]
    PeriodAlreadyClosed { period: Period, last_closed: Period },
    #[error("Account {account} stayed locked after {attempts} attempts")]
    LockTimeout { account: AccountId, attempts: u32 },
    #[error(transparent)]
    Customer(#[from] CustomerError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl From<SharedAccountError> for LedgerError {
    fn from(err: SharedAccountError) -> Self {
        match err {
            SharedAccountError::Account(err) => Self::Account(err),
            SharedAccountError::LockTimeout { account, attempts } => {
                Self::LockTimeout { account, attempts }
            }
        }
    }
}

/// Registry of customers and, through them, of every account of a branch.
///
/// Registry changes need `&mut self`. Account operations only need `&self`
/// and take the per-account locks under the ledger's [`LockPolicy`], so a
/// shared `&Ledger` can serve several threads.
#[derive(Debug)]
pub struct Ledger {
    name: String,
    branch_code: String,
    lock_policy: LockPolicy,
    customers: BTreeMap<CustomerId, Customer>,
    by_national_id: HashMap<NationalId, CustomerId>,
    customer_ids: IdAllocator,
    account_ids: IdAllocator,
    // held for a whole month-end run
    last_closed: Mutex<Option<Period>>,
}

impl Ledger {
    pub fn new(name: impl Into<String>, branch_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branch_code: branch_code.into(),
            lock_policy: LockPolicy::default(),
            customers: BTreeMap::new(),
            by_national_id: HashMap::new(),
            customer_ids: IdAllocator::default(),
            account_ids: IdAllocator::default(),
            last_closed: Mutex::new(None),
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.name.clone(), config.branch_code.clone())
            .with_lock_policy(config.lock.policy())
    }

    pub fn with_lock_policy(mut self, lock_policy: LockPolicy) -> Self {
        self.lock_policy = lock_policy;
        self
    }

    pub fn lock_policy(&self) -> LockPolicy {
        self.lock_policy
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn branch_code(&self) -> &str {
        &self.branch_code
    }

    /// Customers in registration order.
    pub fn customers(&self) -> impl Iterator<Item = &Customer> {
        self.customers.values()
    }

    pub fn total_balance(&self) -> Decimal {
        self.customers.values().map(Customer::total_balance).sum()
    }

    pub fn last_closed_period(&self) -> Option<Period> {
        *self.last_closed.lock()
    }

    /// Handles to every account of the branch, lowest id first.
    pub fn shared_accounts(&self) -> Vec<SharedAccount> {
        let mut accounts: Vec<SharedAccount> = self
            .customers
            .values()
            .flat_map(|customer| customer.accounts().iter().cloned())
            .collect();
        accounts.sort_by_key(SharedAccount::id);
        accounts
    }

    pub fn add_customer(
        &mut self,
        full_name: impl Into<String>,
        national_id: NationalId,
        date_of_birth: NaiveDate,
    ) -> Result<CustomerId, LedgerError> {
        if self.by_national_id.contains_key(&national_id) {
            return Err(LedgerError::DuplicateNationalId { national_id });
        }
        let full_name = full_name.into();
        let today = Utc::now().date_naive();
        let customer = self.customer_ids.allocate_with(|id| {
            Customer::new(id, full_name, national_id.clone(), date_of_birth, today)
        })?;
        let id = customer.id();
        info!(customer = id, %national_id, "customer added");
        self.by_national_id.insert(national_id, id);
        self.customers.insert(id, customer);
        Ok(id)
    }

    pub fn update_customer(
        &mut self,
        national_id: &NationalId,
        full_name: impl Into<String>,
        date_of_birth: NaiveDate,
    ) -> Result<(), LedgerError> {
        let full_name = full_name.into();
        customer::validate_name(&full_name)?;
        customer::validate_birth_date(date_of_birth, Utc::now().date_naive())?;
        let customer = self.customer_mut(national_id)?;
        customer.set_full_name(full_name);
        customer.set_date_of_birth(date_of_birth);
        debug!(%national_id, "customer updated");
        Ok(())
    }

    /// Removes the customer together with all its accounts. Only allowed
    /// once every account is at exactly zero.
    pub fn remove_customer(&mut self, national_id: &NationalId) -> Result<Customer, LedgerError> {
        let customer = self.customer(national_id)?;
        if let Some((account_id, balance)) = customer.unsettled_account() {
            return Err(LedgerError::NonZeroBalanceRemoval {
                national_id: national_id.clone(),
                account_id,
                balance,
            });
        }
        let id = customer.id();
        self.by_national_id.remove(national_id);
        let removed = self
            .customers
            .remove(&id)
            .ok_or_else(|| LedgerError::CustomerNotFound {
                national_id: national_id.clone(),
            })?;
        info!(customer = id, %national_id, accounts = removed.accounts().len(), "customer removed");
        Ok(removed)
    }

    /// Case-insensitive exact match, first registered customer wins.
    pub fn find_by_name(&self, name: &str) -> Option<&Customer> {
        let needle = name.to_lowercase();
        self.customers
            .values()
            .find(|customer| customer.full_name().to_lowercase() == needle)
    }

    pub fn find_by_national_id(&self, national_id: &NationalId) -> Option<&Customer> {
        self.by_national_id
            .get(national_id)
            .and_then(|id| self.customers.get(id))
    }

    pub fn customer(&self, national_id: &NationalId) -> Result<&Customer, LedgerError> {
        self.find_by_national_id(national_id)
            .ok_or_else(|| LedgerError::CustomerNotFound {
                national_id: national_id.clone(),
            })
    }

    fn customer_mut(&mut self, national_id: &NationalId) -> Result<&mut Customer, LedgerError> {
        self.by_national_id
            .get(national_id)
            .and_then(|id| self.customers.get_mut(id))
            .ok_or_else(|| LedgerError::CustomerNotFound {
                national_id: national_id.clone(),
            })
    }

    pub fn open_account(
        &mut self,
        national_id: &NationalId,
        kind: AccountKind,
        initial_balance: Decimal,
    ) -> Result<AccountId, LedgerError> {
        let customer = self
            .by_national_id
            .get(national_id)
            .and_then(|id| self.customers.get_mut(id))
            .ok_or_else(|| LedgerError::CustomerNotFound {
                national_id: national_id.clone(),
            })?;
        let account = self
            .account_ids
            .allocate_with(|id| Account::open(id, kind, initial_balance))?;
        let id = account.id();
        customer.attach(account);
        info!(
            account = id,
            %national_id,
            kind = kind.name(),
            %initial_balance,
            "account opened"
        );
        Ok(id)
    }

    /// Resolves `account` through its owning customer. Clones of the
    /// returned handle can be used from other threads.
    pub fn account(&self, account: &AccountRef) -> Result<&SharedAccount, LedgerError> {
        self.customer(&account.national_id)?
            .account(account.account_id)
            .ok_or_else(|| account_not_found(account))
    }

    /// Returns the new balance.
    pub fn deposit(&self, account: &AccountRef, amount: Decimal) -> Result<Decimal, LedgerError> {
        let balance = self.account(account)?.deposit(amount, &self.lock_policy)?;
        debug!(account = account.account_id, %amount, %balance, "deposit");
        Ok(balance)
    }

    /// Returns the new balance.
    pub fn withdraw(&self, account: &AccountRef, amount: Decimal) -> Result<Decimal, LedgerError> {
        let balance = self.account(account)?.withdraw(amount, &self.lock_policy)?;
        debug!(account = account.account_id, %amount, %balance, "withdrawal");
        Ok(balance)
    }

    /// Both references are resolved before anything else is checked.
    pub fn transfer(
        &self,
        from: &AccountRef,
        to: &AccountRef,
        amount: Decimal,
    ) -> Result<TransferReceipt, LedgerError> {
        let source = self.account(from)?;
        let destination = self.account(to)?;
        Ok(sync::transfer_shared(
            source,
            destination,
            amount,
            &self.lock_policy,
        )?)
    }

    /// Runs month-end processing over every account, once per period.
    /// Periods must be closed in increasing order.
    ///
    /// All accounts are locked and every entry is decided before any account
    /// is credited, so a failing account leaves the whole branch untouched
    /// and the period open.
    pub fn end_of_month(&self, period: Period) -> Result<MonthEndSummary, LedgerError> {
        let mut last_closed = self.last_closed.lock();
        if let Some(last_closed) = *last_closed {
            if period <= last_closed {
                return Err(LedgerError::PeriodAlreadyClosed {
                    period,
                    last_closed,
                });
            }
        }

        let accounts = self.shared_accounts();
        let mut guards = sync::lock_all(&accounts, &self.lock_policy)?;
        let mut summary = MonthEndSummary::default();
        let mut entries = Vec::with_capacity(guards.len());
        for guard in &guards {
            let entry = guard.handle_end_of_month()?;
            if let Some(entry) = &entry {
                summary.interest = summary.interest.checked_add(entry.amount()).ok_or(
                    AccountError::Overflow {
                        balance: summary.interest,
                        amount: entry.amount(),
                    },
                )?;
            }
            entries.push(entry);
        }
        for (guard, entry) in guards.iter_mut().zip(entries) {
            summary.processed += 1;
            if let Some(entry) = entry {
                guard.apply(entry);
            }
        }
        drop(guards);

        *last_closed = Some(period);
        info!(
            %period,
            accounts = summary.processed,
            interest = %summary.interest,
            "month end closed"
        );
        Ok(summary)
    }
}

fn account_not_found(account: &AccountRef) -> LedgerError {
    LedgerError::AccountNotFound {
        national_id: account.national_id.clone(),
        account_id: account.account_id,
    }
}

#[cfg(test)]
mod tests {
    use crate::account::AccountEventKind;

    use super::*;

    fn nid(value: &str) -> NationalId {
        value.parse().unwrap()
    }

    fn dob() -> NaiveDate {
        NaiveDate::from_ymd_opt(1990, 6, 15).unwrap()
    }

    fn savings(rate: i64) -> AccountKind {
        AccountKind::Savings {
            interest_rate: Decimal::from(rate),
        }
    }

    fn current(limit: i64) -> AccountKind {
        AccountKind::Current {
            overdraft_limit: Decimal::from(limit),
        }
    }

    fn ledger_with_customer() -> (Ledger, NationalId) {
        let mut ledger = Ledger::new("National Bank", "CAI-001");
        let id = nid("29001011234567");
        ledger.add_customer("Nayira Ali", id.clone(), dob()).unwrap();
        (ledger, id)
    }

    #[test]
    fn add_and_find_customers() {
        let (mut ledger, first) = ledger_with_customer();
        let second = nid("29101011234567");
        assert_eq!(ledger.add_customer("Mona", second.clone(), dob()).unwrap(), 2);

        assert_eq!(ledger.find_by_name("NAYIRA ali").unwrap().national_id(), &first);
        assert_eq!(ledger.find_by_national_id(&second).unwrap().full_name(), "Mona");
        assert!(ledger.find_by_name("Nayira").is_none());
        assert!(ledger.find_by_national_id(&nid("00000000000000")).is_none());
    }

    #[test]
    fn duplicate_national_id_leaves_registry_unchanged() {
        let (mut ledger, first) = ledger_with_customer();
        let err = ledger.add_customer("Someone Else", first.clone(), dob()).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateNationalId { national_id } if national_id == first));
        assert_eq!(ledger.customers().count(), 1);
        assert_eq!(ledger.find_by_national_id(&first).unwrap().full_name(), "Nayira Ali");
        assert!(ledger.find_by_name("Someone Else").is_none());
    }

    #[test]
    fn add_customer_validates_domain_constraints() {
        let mut ledger = Ledger::new("National Bank", "CAI-001");
        let tomorrow = Utc::now().date_naive().succ_opt().unwrap();
        let err = ledger
            .add_customer("Mona", nid("29101011234567"), tomorrow)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Customer(CustomerError::BirthDateNotInPast { .. })
        ));
        let err = ledger
            .add_customer("", nid("29101011234567"), dob())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Customer(CustomerError::EmptyName)));
        assert_eq!(ledger.customers().count(), 0);
        // rejected registrations don't consume ids
        assert_eq!(ledger.add_customer("Mona", nid("29101011234567"), dob()).unwrap(), 1);
    }

    #[test]
    fn update_customer() {
        let (mut ledger, id) = ledger_with_customer();
        let new_dob = NaiveDate::from_ymd_opt(1991, 1, 1).unwrap();
        ledger.update_customer(&id, "Nayira A.", new_dob).unwrap();
        let customer = ledger.find_by_national_id(&id).unwrap();
        assert_eq!(customer.full_name(), "Nayira A.");
        assert_eq!(customer.date_of_birth(), new_dob);

        let err = ledger
            .update_customer(&nid("11111111111111"), "X", new_dob)
            .unwrap_err();
        assert!(matches!(err, LedgerError::CustomerNotFound { .. }));
    }

    #[test]
    fn open_account_checks() {
        let (mut ledger, id) = ledger_with_customer();
        let err = ledger
            .open_account(&nid("11111111111111"), savings(1), Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, LedgerError::CustomerNotFound { .. }));

        let err = ledger
            .open_account(&id, savings(1), Decimal::from(-5))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Account(AccountError::InvalidAmount { .. })
        ));

        assert_eq!(ledger.open_account(&id, savings(1), Decimal::ZERO).unwrap(), 1);
        assert_eq!(ledger.open_account(&id, current(100), Decimal::TEN).unwrap(), 2);
        let customer = ledger.find_by_national_id(&id).unwrap();
        assert_eq!(customer.accounts().len(), 2);
        assert_eq!(customer.total_balance(), Decimal::TEN);
    }

    #[test]
    fn remove_customer_requires_zero_balances() {
        let (mut ledger, id) = ledger_with_customer();
        let account = ledger.open_account(&id, current(0), Decimal::TEN).unwrap();
        let account = AccountRef::new(id.clone(), account);

        let err = ledger.remove_customer(&id).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::NonZeroBalanceRemoval { balance, .. } if balance == Decimal::TEN
        ));
        assert!(ledger.find_by_national_id(&id).is_some());

        ledger.withdraw(&account, Decimal::TEN).unwrap();
        let removed = ledger.remove_customer(&id).unwrap();
        assert_eq!(removed.accounts().len(), 1);
        assert!(ledger.find_by_national_id(&id).is_none());
        assert!(ledger.find_by_name("Nayira Ali").is_none());
        assert!(matches!(
            ledger.account(&account).unwrap_err(),
            LedgerError::CustomerNotFound { .. }
        ));
        assert!(matches!(
            ledger.remove_customer(&id).unwrap_err(),
            LedgerError::CustomerNotFound { .. }
        ));
    }

    #[test]
    fn account_ids_are_never_reused() {
        let (mut ledger, id) = ledger_with_customer();
        ledger.open_account(&id, savings(1), Decimal::ZERO).unwrap();
        ledger.remove_customer(&id).unwrap();
        ledger.add_customer("Nayira Ali", id.clone(), dob()).unwrap();
        assert_eq!(ledger.open_account(&id, savings(1), Decimal::ZERO).unwrap(), 2);
        assert_eq!(ledger.find_by_national_id(&id).unwrap().id(), 2);
    }

    #[test]
    fn account_lookup_goes_through_owner() {
        let (mut ledger, first) = ledger_with_customer();
        let second = nid("29101011234567");
        ledger.add_customer("Mona", second.clone(), dob()).unwrap();
        let account = ledger.open_account(&first, savings(1), Decimal::ONE).unwrap();

        assert!(ledger.account(&AccountRef::new(first, account)).is_ok());
        let err = ledger
            .account(&AccountRef::new(second.clone(), account))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::AccountNotFound { account_id, .. } if account_id == account
        ));
        let err = ledger
            .deposit(&AccountRef::new(second, account), Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound { .. }));
    }

    #[test]
    fn savings_walkthrough() {
        let (mut ledger, first) = ledger_with_customer();
        let second = nid("29101011234567");
        ledger.add_customer("Mona", second.clone(), dob()).unwrap();

        let savings_ref = AccountRef::new(
            first.clone(),
            ledger.open_account(&first, savings(5), Decimal::from(1000)).unwrap(),
        );
        let current_ref = AccountRef::new(
            second.clone(),
            ledger.open_account(&second, current(0), Decimal::from(60)).unwrap(),
        );

        assert_eq!(ledger.withdraw(&savings_ref, Decimal::from(200)).unwrap(), Decimal::from(800));
        let summary = ledger.end_of_month(Period::new(2024, 1).unwrap()).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.interest, Decimal::from(40));
        assert!(summary.skipped.is_empty());
        assert_eq!(ledger.account(&savings_ref).unwrap().balance(), Decimal::from(840));
        assert_eq!(ledger.account(&current_ref).unwrap().balance(), Decimal::from(60));

        let receipt = ledger
            .transfer(&savings_ref, &current_ref, Decimal::from(840))
            .unwrap();
        assert_eq!(receipt.from_balance, Decimal::ZERO);
        assert_eq!(receipt.to_balance, Decimal::from(900));

        {
            let source = ledger.account(&savings_ref).unwrap().read();
            assert_eq!(
                source.transaction_log().last().unwrap().kind(),
                AccountEventKind::TransferredTo(current_ref.account_id)
            );
            assert_eq!(source.replayed_balance(), source.balance());
        }
        assert_eq!(ledger.total_balance(), Decimal::from(900));
    }

    #[test]
    fn transfer_within_one_customer() {
        let (mut ledger, id) = ledger_with_customer();
        let a = AccountRef::new(
            id.clone(),
            ledger.open_account(&id, current(100), Decimal::ZERO).unwrap(),
        );
        let b = AccountRef::new(
            id.clone(),
            ledger.open_account(&id, savings(1), Decimal::ZERO).unwrap(),
        );
        ledger.transfer(&a, &b, Decimal::from(100)).unwrap();
        let customer = ledger.find_by_national_id(&id).unwrap();
        assert_eq!(customer.total_balance(), Decimal::ZERO);
        assert_eq!(ledger.account(&a).unwrap().balance(), Decimal::from(-100));

        // back the other way would make savings negative
        let err = ledger.transfer(&b, &a, Decimal::from(101)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Transfer(TransferError::TransferInfeasible { .. })
        ));
        let err = ledger.transfer(&a, &a, Decimal::ONE).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Transfer(TransferError::SameAccount { .. })
        ));
        let err = ledger
            .transfer(&a, &AccountRef::new(id, 99), Decimal::ONE)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::AccountNotFound { account_id: 99, .. }
        ));
        assert_eq!(ledger.account(&a).unwrap().read().transaction_log().len(), 3);
    }

    #[test]
    fn transfer_resolves_both_references_first() {
        let (mut ledger, first) = ledger_with_customer();
        let account = ledger.open_account(&first, savings(1), Decimal::TEN).unwrap();
        let from = AccountRef::new(first, account);

        let unregistered = nid("29101011234567");
        let err = ledger
            .transfer(&from, &AccountRef::new(unregistered.clone(), account), Decimal::ONE)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::CustomerNotFound { national_id } if national_id == unregistered
        ));

        ledger.add_customer("Mona", unregistered.clone(), dob()).unwrap();
        let err = ledger
            .transfer(&from, &AccountRef::new(unregistered, account), Decimal::ONE)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::AccountNotFound { account_id, .. } if account_id == account
        ));
        assert_eq!(ledger.account(&from).unwrap().balance(), Decimal::TEN);
    }

    #[test]
    fn month_end_runs_once_per_period() {
        let (mut ledger, id) = ledger_with_customer();
        ledger.open_account(&id, savings(10), Decimal::from(100)).unwrap();
        let march = Period::new(2024, 3).unwrap();
        ledger.end_of_month(march).unwrap();

        for period in [march, Period::new(2024, 2).unwrap()] {
            let err = ledger.end_of_month(period).unwrap_err();
            assert!(matches!(
                err,
                LedgerError::PeriodAlreadyClosed { last_closed, .. } if last_closed == march
            ));
        }
        assert_eq!(ledger.find_by_national_id(&id).unwrap().total_balance(), Decimal::from(110));

        let summary = ledger.end_of_month(Period::new(2024, 4).unwrap()).unwrap();
        assert_eq!(summary.interest, Decimal::from(11));
        assert_eq!(ledger.last_closed_period(), Period::new(2024, 4));
    }

    #[test]
    fn failed_month_end_credits_nobody() {
        let (mut ledger, first) = ledger_with_customer();
        let second = nid("29101011234567");
        ledger.add_customer("Mona", second.clone(), dob()).unwrap();
        let small = AccountRef::new(
            first.clone(),
            ledger.open_account(&first, savings(5), Decimal::from(1000)).unwrap(),
        );
        let huge = Decimal::from(10_000_000_000_000_000_000u64);
        let big = AccountRef::new(
            second.clone(),
            ledger
                .open_account(&second, AccountKind::Savings { interest_rate: huge }, huge)
                .unwrap(),
        );

        let january = Period::new(2024, 1).unwrap();
        for _ in 0..2 {
            let err = ledger.end_of_month(january).unwrap_err();
            assert!(matches!(
                err,
                LedgerError::Account(AccountError::Overflow { .. })
            ));
            assert_eq!(ledger.last_closed_period(), None);
            assert_eq!(ledger.account(&small).unwrap().balance(), Decimal::from(1000));
            assert_eq!(ledger.account(&small).unwrap().read().transaction_log().len(), 1);
            assert_eq!(ledger.account(&big).unwrap().balance(), huge);
            assert_eq!(ledger.account(&big).unwrap().read().transaction_log().len(), 1);
        }

        // once the offending account is emptied the period closes normally
        ledger.withdraw(&big, huge).unwrap();
        let summary = ledger.end_of_month(january).unwrap();
        assert_eq!(summary.interest, Decimal::from(50));
        assert_eq!(ledger.account(&small).unwrap().balance(), Decimal::from(1050));
    }

    #[test]
    fn ledger_accounts_use_the_configured_locks() {
        let config = LedgerConfig::from_toml_str(
            r#"
            [lock]
            timeout_ms = 1
            retries = 0
            "#,
        )
        .unwrap();
        let mut ledger = Ledger::from_config(&config);
        assert_eq!(ledger.lock_policy(), config.lock.policy());

        let id = nid("29001011234567");
        ledger.add_customer("Nayira Ali", id.clone(), dob()).unwrap();
        let a = AccountRef::new(
            id.clone(),
            ledger.open_account(&id, savings(10), Decimal::from(100)).unwrap(),
        );
        let b = AccountRef::new(
            id.clone(),
            ledger.open_account(&id, current(0), Decimal::ZERO).unwrap(),
        );

        let handle = ledger.account(&b).unwrap().clone();
        let held = handle.try_lock(&ledger.lock_policy()).unwrap();
        assert!(matches!(
            ledger.deposit(&b, Decimal::ONE).unwrap_err(),
            LedgerError::LockTimeout { account, attempts: 1 } if account == b.account_id
        ));
        assert!(matches!(
            ledger.transfer(&a, &b, Decimal::ONE).unwrap_err(),
            LedgerError::Transfer(TransferError::TransferInfeasible { .. })
        ));
        assert!(matches!(
            ledger.end_of_month(Period::new(2024, 1).unwrap()).unwrap_err(),
            LedgerError::LockTimeout { .. }
        ));
        drop(held);

        // nothing moved while the lock was held
        assert_eq!(ledger.account(&a).unwrap().balance(), Decimal::from(100));
        assert_eq!(ledger.last_closed_period(), None);
        ledger.transfer(&a, &b, Decimal::ONE).unwrap();
        assert_eq!(handle.balance(), Decimal::ONE);
    }

    #[test]
    fn shared_accounts_are_ordered_by_id() {
        let (mut ledger, first) = ledger_with_customer();
        let second = nid("29101011234567");
        ledger.add_customer("Mona", second.clone(), dob()).unwrap();
        ledger.open_account(&second, savings(1), Decimal::ZERO).unwrap();
        ledger.open_account(&first, savings(1), Decimal::ZERO).unwrap();
        ledger.open_account(&second, current(1), Decimal::ZERO).unwrap();

        let ids: Vec<_> = ledger.shared_accounts().iter().map(SharedAccount::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn period_construction() {
        assert!(Period::new(2024, 0).is_none());
        assert!(Period::new(2024, 13).is_none());
        let period = Period::containing(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(period, Period::new(2023, 12).unwrap());
        assert_eq!(period.to_string(), "2023-12");
        assert!(period < Period::new(2024, 1).unwrap());
    }
}
