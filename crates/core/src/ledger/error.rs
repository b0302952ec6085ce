//! Error types for ledger arithmetic.

use thiserror::Error;

/// Errors raised while adjusting the spent aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The adjustment overflowed the integer width.
    #[error("amount arithmetic overflowed")]
    Overflow,

    /// The adjustment would make the aggregate negative.
    #[error("amount_used would go negative: {amount_used} + {delta}")]
    NegativeAmountUsed {
        /// The aggregate before the adjustment.
        amount_used: i64,
        /// The rejected delta.
        delta: i64,
    },
}
