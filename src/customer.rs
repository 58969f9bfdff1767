use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::{Account, AccountId},
    sync::SharedAccount,
};

pub type CustomerId = u32;

const NATIONAL_ID_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomerError {
    #[error("National ID must be exactly 14 digits, got `{value}`")]
    InvalidNationalId { value: String },
    #[error("Full name must not be empty")]
    EmptyName,
    #[error("Date of birth {date} is not in the past")]
    BirthDateNotInPast { date: NaiveDate },
}

/// Exactly 14 ASCII digits. Immutable once assigned to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NationalId(String);

impl NationalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for NationalId {
    type Err = CustomerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.len() == NATIONAL_ID_LEN && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value.to_owned()))
        } else {
            Err(CustomerError::InvalidNationalId {
                value: value.to_owned(),
            })
        }
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Customer {
    id: CustomerId,
    full_name: String,
    national_id: NationalId,
    date_of_birth: NaiveDate,
    accounts: Vec<SharedAccount>,
}

impl Customer {
    /// `today` is the reference date the birth date must precede.
    pub fn new(
        id: CustomerId,
        full_name: String,
        national_id: NationalId,
        date_of_birth: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, CustomerError> {
        validate_name(&full_name)?;
        validate_birth_date(date_of_birth, today)?;
        Ok(Self {
            id,
            full_name,
            national_id,
            date_of_birth,
            accounts: Vec::new(),
        })
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn national_id(&self) -> &NationalId {
        &self.national_id
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        self.date_of_birth
    }

    pub fn set_full_name(&mut self, full_name: String) {
        self.full_name = full_name;
    }

    pub fn set_date_of_birth(&mut self, date_of_birth: NaiveDate) {
        self.date_of_birth = date_of_birth;
    }

    pub fn accounts(&self) -> &[SharedAccount] {
        &self.accounts
    }

    pub fn account(&self, id: AccountId) -> Option<&SharedAccount> {
        self.accounts.iter().find(|acc| acc.id() == id)
    }

    pub(crate) fn attach(&mut self, account: Account) {
        self.accounts.push(SharedAccount::new(account));
    }

    pub fn total_balance(&self) -> Decimal {
        self.accounts.iter().map(SharedAccount::balance).sum()
    }

    /// First owned account whose balance isn't exactly zero, with that
    /// balance. `None` once the customer can be removed.
    pub fn unsettled_account(&self) -> Option<(AccountId, Decimal)> {
        self.accounts
            .iter()
            .map(|acc| (acc.id(), acc.balance()))
            .find(|(_, balance)| !balance.is_zero())
    }
}

pub(crate) fn validate_name(full_name: &str) -> Result<(), CustomerError> {
    if full_name.trim().is_empty() {
        Err(CustomerError::EmptyName)
    } else {
        Ok(())
    }
}

pub(crate) fn validate_birth_date(date: NaiveDate, today: NaiveDate) -> Result<(), CustomerError> {
    if date < today {
        Ok(())
    } else {
        Err(CustomerError::BirthDateNotInPast { date })
    }
}
