/// Accounts and their transaction logs. Balance only moves by applying log
/// entries, which are decided by the `handle_*` methods first.
pub mod account;

/// Customers and national ID validation.
pub mod customer;

/// The branch registry: customers, account addressing, month-end runs.
pub mod ledger;

/// Atomic transfer between two accounts.
pub mod transfer;

/// Per-account locking for callers working on accounts from several threads.
pub mod sync;

/// Ledger settings loaded from TOML.
pub mod config;

/// Id allocation for customers and accounts.
pub mod ids;

/// Typed ledger commands parsed from raw operation arguments.
pub mod command;

/// Command processor interface, plus "in memory" implementation backed by a
/// [`ledger::Ledger`].
pub mod processor;

/// CSV driver used by the binary and the integration tests.
pub mod bin_utils;
