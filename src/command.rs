use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    account::{AccountId, AccountKind},
    customer::{CustomerError, NationalId},
    ledger::{AccountRef, Period},
};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    AddCustomer,
    UpdateCustomer,
    RemoveCustomer,
    OpenSavings,
    OpenCurrent,
    Deposit,
    Withdraw,
    Transfer,
    MonthEnd,
}

/// Raw, untyped arguments of an operation. Which ones are required depends
/// on the [`OperationKind`].
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    pub national_id: Option<String>,
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub account: Option<AccountId>,
    pub to_national_id: Option<String>,
    pub to_account: Option<AccountId>,
    pub amount: Option<Decimal>,
    pub param: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    AddCustomer {
        full_name: String,
        national_id: NationalId,
        date_of_birth: NaiveDate,
    },
    UpdateCustomer {
        national_id: NationalId,
        full_name: String,
        date_of_birth: NaiveDate,
    },
    RemoveCustomer {
        national_id: NationalId,
    },
    OpenAccount {
        national_id: NationalId,
        kind: AccountKind,
        initial_balance: Decimal,
    },
    Deposit {
        account: AccountRef,
        amount: Decimal,
    },
    Withdraw {
        account: AccountRef,
        amount: Decimal,
    },
    Transfer {
        from: AccountRef,
        to: AccountRef,
        amount: Decimal,
    },
    MonthEnd {
        period: Period,
    },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("`{field}` is required for {kind:?}")]
    MissingField {
        kind: OperationKind,
        field: &'static str,
    },
    #[error("`{field}` must not be empty for {kind:?}")]
    EmptyField {
        kind: OperationKind,
        field: &'static str,
    },
    #[error("`{field}` must not be negative for {kind:?}")]
    NegativeAmount {
        kind: OperationKind,
        field: &'static str,
    },
    #[error(transparent)]
    InvalidNationalId(#[from] CustomerError),
}

impl LedgerCommand {
    /// Turns raw arguments into a typed command. Only input shape is checked
    /// here (presence, national ID format, non-negative amounts); domain
    /// rules are left to the ledger.
    pub fn parse_command(kind: OperationKind, args: CommandArgs) -> Result<Self, CommandError> {
        let parser = ArgParser { kind, args };
        match kind {
            OperationKind::AddCustomer => Ok(Self::AddCustomer {
                full_name: parser.text()?,
                national_id: parser.national_id()?,
                date_of_birth: parser.date()?,
            }),
            OperationKind::UpdateCustomer => Ok(Self::UpdateCustomer {
                national_id: parser.national_id()?,
                full_name: parser.text()?,
                date_of_birth: parser.date()?,
            }),
            OperationKind::RemoveCustomer => Ok(Self::RemoveCustomer {
                national_id: parser.national_id()?,
            }),
            OperationKind::OpenSavings => Ok(Self::OpenAccount {
                national_id: parser.national_id()?,
                kind: AccountKind::Savings {
                    interest_rate: parser.param()?,
                },
                initial_balance: parser.amount()?,
            }),
            OperationKind::OpenCurrent => Ok(Self::OpenAccount {
                national_id: parser.national_id()?,
                kind: AccountKind::Current {
                    overdraft_limit: parser.param()?,
                },
                initial_balance: parser.amount()?,
            }),
            OperationKind::Deposit => Ok(Self::Deposit {
                account: parser.account()?,
                amount: parser.amount()?,
            }),
            OperationKind::Withdraw => Ok(Self::Withdraw {
                account: parser.account()?,
                amount: parser.amount()?,
            }),
            OperationKind::Transfer => Ok(Self::Transfer {
                from: parser.account()?,
                to: parser.to_account()?,
                amount: parser.amount()?,
            }),
            OperationKind::MonthEnd => Ok(Self::MonthEnd {
                period: Period::containing(parser.date()?),
            }),
        }
    }
}

struct ArgParser {
    kind: OperationKind,
    args: CommandArgs,
}

impl ArgParser {
    fn required<T: Clone>(&self, value: &Option<T>, field: &'static str) -> Result<T, CommandError> {
        value.clone().ok_or(CommandError::MissingField {
            kind: self.kind,
            field,
        })
    }

    fn text(&self) -> Result<String, CommandError> {
        let name = self.required(&self.args.name, "name")?;
        if name.trim().is_empty() {
            return Err(CommandError::EmptyField {
                kind: self.kind,
                field: "name",
            });
        }
        Ok(name)
    }

    fn national_id(&self) -> Result<NationalId, CommandError> {
        Ok(self.required(&self.args.national_id, "national_id")?.parse()?)
    }

    fn date(&self) -> Result<NaiveDate, CommandError> {
        self.required(&self.args.date, "date")
    }

    fn non_negative(&self, value: &Option<Decimal>, field: &'static str) -> Result<Decimal, CommandError> {
        let value = self.required(value, field)?;
        if value < Decimal::ZERO {
            return Err(CommandError::NegativeAmount {
                kind: self.kind,
                field,
            });
        }
        Ok(value)
    }

    fn amount(&self) -> Result<Decimal, CommandError> {
        self.non_negative(&self.args.amount, "amount")
    }

    fn param(&self) -> Result<Decimal, CommandError> {
        self.non_negative(&self.args.param, "param")
    }

    fn account(&self) -> Result<AccountRef, CommandError> {
        Ok(AccountRef::new(
            self.national_id()?,
            self.required(&self.args.account, "account")?,
        ))
    }

    fn to_account(&self) -> Result<AccountRef, CommandError> {
        Ok(AccountRef::new(
            self.required(&self.args.to_national_id, "to_national_id")?
                .parse()?,
            self.required(&self.args.to_account, "to_account")?,
        ))
    }
}
