//! # Error Types
//!
//! Domain error types for salon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  salon-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                       │
//! │  └── ValidationError  - Entity invariant violations (field list)    │
//! │                                                                     │
//! │  salon-store errors (separate crate)                                │
//! │  └── StoreError       - Persistence and numbering failures          │
//! │                                                                     │
//! │  salon-sync errors (separate crate)                                 │
//! │  └── SyncError        - Per-entity remote operation failures        │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → StoreError → caller            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (entity id, field name)
//! 3. Validation reports EVERY violated field at once, so a form can
//!    highlight all of them in a single round trip

use thiserror::Error;

// =============================================================================
// Violation
// =============================================================================

/// One violated entity invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: String, value: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative, got {value}")]
    Negative { field: String, value: i64 },

    /// Numeric value is out of the allowed range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g. malformed receipt number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A receipt must carry at least one item.
    #[error("items must not be empty")]
    EmptyItems,

    /// An item's subtotal does not equal price * quantity.
    #[error("subtotal for item {menu_id} must be {expected}, got {actual}")]
    SubtotalMismatch {
        menu_id: String,
        expected: i64,
        actual: i64,
    },

    /// The receipt total does not equal the sum of item subtotals.
    #[error("totalAmount must be {expected}, got {actual}")]
    TotalMismatch { expected: i64, actual: i64 },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Entity invariant violations, all of them at once.
///
/// Rejected synchronously before storage; a failed validation never
/// reaches the change queue.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("validation failed: {}", summarize(.violations))]
pub struct ValidationError {
    /// Every violated field, in check order.
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Wraps a non-empty violation list.
    pub fn new(violations: Vec<Violation>) -> Self {
        debug_assert!(!violations.is_empty());
        ValidationError { violations }
    }

    /// True if the given field name appears in any violation message.
    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.to_string().contains(field))
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced menu does not exist.
    #[error("Menu not found: {0}")]
    MenuNotFound(String),

    /// Referenced receipt does not exist.
    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),

    /// Entity invariants violated (wraps the full field list).
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_messages() {
        let v = Violation::NotPositive {
            field: "duration".into(),
            value: 0,
        };
        assert_eq!(v.to_string(), "duration must be positive, got 0");

        let v = Violation::SubtotalMismatch {
            menu_id: "m-1".into(),
            expected: 12000,
            actual: 11000,
        };
        assert_eq!(
            v.to_string(),
            "subtotal for item m-1 must be 12000, got 11000"
        );
    }

    #[test]
    fn test_validation_error_lists_every_field() {
        let err = ValidationError::new(vec![
            Violation::Negative {
                field: "price".into(),
                value: -1,
            },
            Violation::NotPositive {
                field: "duration".into(),
                value: 0,
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("price"));
        assert!(msg.contains("duration"));
        assert!(err.mentions("price"));
        assert!(err.mentions("duration"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err = ValidationError::new(vec![Violation::EmptyItems]);
        let core: CoreError = err.into();
        assert!(matches!(core, CoreError::Validation(_)));
    }
}
