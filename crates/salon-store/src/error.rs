//! # Store Error Types
//!
//! Error types for local persistence and the entity store.

use chrono::NaiveDate;
use thiserror::Error;

use salon_core::ValidationError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Local store and entity store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity invariants violated; nothing was stored or queued.
    /// Carries every violated field.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Referenced menu does not exist locally.
    #[error("Menu not found: {0}")]
    MenuNotFound(String),

    /// Referenced receipt does not exist locally.
    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),

    /// The per-day receipt sequence ran out. Surfaced immediately and
    /// never retried automatically; the caller decides the fallback.
    #[error("receipt sequence exhausted for {date}: a day holds at most 9999 receipts")]
    SequenceExhausted { date: NaiveDate },

    /// The underlying local store failed a read or an atomic commit.
    #[error("local store failure: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_core::Violation;

    #[test]
    fn test_sequence_exhausted_message_names_the_date() {
        let err = StoreError::SequenceExhausted {
            date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        };
        assert!(err.to_string().contains("2026-01-15"));
    }

    #[test]
    fn test_validation_error_passes_through_transparently() {
        let err: StoreError = ValidationError::new(vec![Violation::EmptyItems]).into();
        assert!(err.to_string().contains("items must not be empty"));
    }
}
