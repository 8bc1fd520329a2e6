//! The Breachline economy.
//!
//! Every user has a [`UserProfile`] document holding a spendable `$BTC`
//! balance. The [`Ledger`] sells [`StatusTier`]s out of a fixed catalog:
//! each purchase debits the balance and applies its effect (a new status,
//! or +1 prestige) in a single store transaction, so a balance is never
//! read stale and never goes negative.

mod catalog;
mod error;
mod ledger;
mod profile;

pub use catalog::StatusTier;
pub use error::EconomyError;
pub use ledger::{Ledger, Purchase};
pub use profile::{BtcAmount, DEFAULT_STATUS, USERS, UserProfile, profile_key};
