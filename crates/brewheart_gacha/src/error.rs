//! # Gacha Error Types
//!
//! All errors that can occur in the pull engine.

use thiserror::Error;

use crate::banner::BannerId;
use crate::catalog::ItemId;
use crate::ledger::Overdraft;

/// Errors that can occur in the pull engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GachaError {
    /// Banner id does not resolve, or the banner is outside its active window.
    #[error("banner not found or not active: {0}")]
    BannerNotFound(BannerId),

    /// Item not found in the catalog.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// The player cannot pay for the pull, even after premium conversion.
    ///
    /// This is an expected business outcome. Nothing was debited.
    #[error(
        "insufficient funds: need {required_tickets} tickets (have {available_tickets}), \
         conversion needs {required_premium} premium (have {available_premium})"
    )]
    InsufficientFunds {
        /// Ticket cost of the whole batch.
        required_tickets: u64,
        /// Ticket balance at the time of the call.
        available_tickets: u64,
        /// Premium required to cover the ticket shortfall.
        required_premium: u64,
        /// Premium balance at the time of the call.
        available_premium: u64,
    },

    /// The ledger refused a debit the engine had already validated.
    #[error(transparent)]
    Ledger(#[from] Overdraft),

    /// Catalog data is inconsistent. Fatal at load time.
    #[error("catalog integrity error: {0}")]
    CatalogIntegrity(String),

    /// A pull batch must contain at least one pull.
    #[error("pull count must be at least 1")]
    InvalidPullCount,

    /// Arithmetic overflow in a cost calculation.
    #[error("arithmetic overflow in economic calculation")]
    ArithmeticOverflow,

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GachaError {
    /// Returns true for the funds outcome the UI turns into a conversion prompt.
    #[inline]
    #[must_use]
    pub const fn is_insufficient_funds(&self) -> bool {
        matches!(self, Self::InsufficientFunds { .. })
    }
}

/// Result type for gacha operations.
pub type GachaResult<T> = Result<T, GachaError>;
