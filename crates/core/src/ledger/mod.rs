//! Overflow-safe maintenance of a budget's spent aggregate.
//!
//! A budget stores `amount_used`, a denormalized total of its expense
//! amounts. The store layer adjusts it incrementally on every expense
//! mutation; the arithmetic for those adjustments lives here so the policy
//! is applied identically on every path.

mod error;


pub use error::LedgerError;

/// Applies a signed delta to a spent aggregate.
///
/// Policy: a result below zero is an invariant violation and is reported,
/// never clamped. A clean mutation history cannot produce one.
///
/// # Errors
///
/// Returns `LedgerError::Overflow` when the addition overflows `i64`, and
/// `LedgerError::NegativeAmountUsed` when the result would drop below zero.
pub fn apply_delta(amount_used: i64, delta: i64) -> Result<i64, LedgerError> {
    let updated = amount_used
        .checked_add(delta)
        .ok_or(LedgerError::Overflow)?;

    if updated < 0 {
        return Err(LedgerError::NegativeAmountUsed {
            amount_used,
            delta,
        });
    }

    Ok(updated)
}

/// Computes the aggregate delta for replacing an expense amount.
///
/// The delta is derived from the *stored* prior amount, never from the
/// caller's patch alone; anything else double-counts when a patch is
/// replayed.
///
/// # Errors
///
/// Returns `LedgerError::Overflow` when the subtraction overflows `i64`.
pub fn replacement_delta(stored: i64, new: i64) -> Result<i64, LedgerError> {
    new.checked_sub(stored).ok_or(LedgerError::Overflow)
}
