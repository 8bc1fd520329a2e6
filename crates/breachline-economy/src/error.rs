//! Error types for the economy layer.

use breachline_protocol::{ErrorCode, Uid};
use breachline_store::StoreError;

use crate::BtcAmount;

/// Errors that can occur while purchasing.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// The item id matches nothing in the catalog.
    #[error("the item \"{0}\" does not exist")]
    UnknownItem(String),

    /// The caller has no profile document.
    #[error("user profile {0} not found")]
    ProfileNotFound(Uid),

    /// Guest accounts may not buy anything.
    #[error("guests cannot make purchases")]
    GuestPurchase,

    /// The balance does not cover the price.
    #[error("insufficient $BTC balance: have {balance}, need {cost}")]
    InsufficientBalance { balance: BtcAmount, cost: BtcAmount },

    /// The store failed or gave up retrying.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EconomyError {
    /// The taxonomy code reported to callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownItem(_) | Self::ProfileNotFound(_) => ErrorCode::NotFound,
            Self::GuestPurchase => ErrorCode::PermissionDenied,
            Self::InsufficientBalance { .. } => ErrorCode::FailedPrecondition,
            Self::Store(_) => ErrorCode::Internal,
        }
    }
}
