//! # Validation Module
//!
//! Entity invariant checks for menus and receipts.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: UI forms (TypeScript)                                     │
//! │  ├── Basic format checks, immediate feedback                        │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE (entity invariants)                           │
//! │  ├── Runs on every upsert, before anything is stored or queued      │
//! │  └── Collects EVERY violation - one rejection lists all bad fields  │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Local store commit (atomic batch, no partial writes)      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A mutation that fails here never reaches the change queue.

use crate::error::{ValidationError, Violation};
use crate::numbering::parse_receipt_number;
use crate::types::{Menu, Receipt};
use crate::{MAX_ITEM_QUANTITY, MAX_MEMO_LEN, MAX_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult = Result<(), ValidationError>;

// =============================================================================
// Menu Validation
// =============================================================================

/// Validates every menu invariant, collecting all violations.
///
/// ## Rules
/// - `name` non-empty, at most [`MAX_NAME_LEN`] characters
/// - `price` >= 0 (zero is allowed: campaign freebies exist)
/// - `duration` > 0
pub fn validate_menu(menu: &Menu) -> ValidationResult {
    let mut violations = Vec::new();

    check_name("name", &menu.name, &mut violations);

    if menu.price < 0 {
        violations.push(Violation::Negative {
            field: "price".into(),
            value: menu.price,
        });
    }

    if menu.duration <= 0 {
        violations.push(Violation::NotPositive {
            field: "duration".into(),
            value: menu.duration,
        });
    }

    finish(violations)
}

// =============================================================================
// Receipt Validation
// =============================================================================

/// Validates every receipt invariant, collecting all violations.
///
/// ## Rules
/// - `receipt_number` matches `YYYYMMDD-NNNN`
/// - `customer_name` and `staff_name` non-empty, bounded length
/// - at least one item; each item has positive bounded quantity,
///   non-negative price, and `subtotal == price * quantity`
/// - `total_amount` equals the sum of item subtotals
/// - `memo` bounded length when present
pub fn validate_receipt(receipt: &Receipt) -> ValidationResult {
    let mut violations = Vec::new();

    if parse_receipt_number(&receipt.receipt_number).is_none() {
        violations.push(Violation::InvalidFormat {
            field: "receiptNumber".into(),
            reason: "expected YYYYMMDD-NNNN".into(),
        });
    }

    check_name("customerName", &receipt.customer_name, &mut violations);
    check_name("staffName", &receipt.staff_name, &mut violations);

    if receipt.items.is_empty() {
        violations.push(Violation::EmptyItems);
    }

    for item in &receipt.items {
        if item.quantity <= 0 {
            violations.push(Violation::NotPositive {
                field: format!("items[{}].quantity", item.menu_id),
                value: item.quantity,
            });
        } else if item.quantity > MAX_ITEM_QUANTITY {
            violations.push(Violation::OutOfRange {
                field: format!("items[{}].quantity", item.menu_id),
                min: 1,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if item.price < 0 {
            violations.push(Violation::Negative {
                field: format!("items[{}].price", item.menu_id),
                value: item.price,
            });
        }

        if item.subtotal != item.expected_subtotal() {
            violations.push(Violation::SubtotalMismatch {
                menu_id: item.menu_id.clone(),
                expected: item.expected_subtotal(),
                actual: item.subtotal,
            });
        }
    }

    let items_total = receipt.items_total();
    if receipt.total_amount != items_total {
        violations.push(Violation::TotalMismatch {
            expected: items_total,
            actual: receipt.total_amount,
        });
    }

    if let Some(memo) = &receipt.memo {
        if memo.len() > MAX_MEMO_LEN {
            violations.push(Violation::TooLong {
                field: "memo".into(),
                max: MAX_MEMO_LEN,
            });
        }
    }

    finish(violations)
}

// =============================================================================
// Helpers
// =============================================================================

fn check_name(field: &str, value: &str, violations: &mut Vec<Violation>) {
    if value.trim().is_empty() {
        violations.push(Violation::Required {
            field: field.into(),
        });
    } else if value.len() > MAX_NAME_LEN {
        violations.push(Violation::TooLong {
            field: field.into(),
            max: MAX_NAME_LEN,
        });
    }
}

fn finish(violations: Vec<Violation>) -> ValidationResult {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(violations))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MenuCategory, PaymentMethod, ReceiptItem, SyncStatus};
    use chrono::Utc;

    fn valid_menu() -> Menu {
        Menu {
            id: "m-1".into(),
            name: "Gel Nail".into(),
            price: 6000,
            duration: 60,
            category: MenuCategory::Nail,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn valid_receipt() -> Receipt {
        let item = ReceiptItem::for_menu(&valid_menu(), 2);
        let total = item.subtotal;
        Receipt {
            id: "r-1".into(),
            receipt_number: "20260115-0001".into(),
            customer_name: "Sato".into(),
            service_date: Utc::now(),
            items: vec![item],
            total_amount: total,
            staff_name: "Aoi".into(),
            payment_method: PaymentMethod::Cash,
            memo: None,
            sync_status: SyncStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            synced_at: None,
        }
    }

    #[test]
    fn test_valid_menu_passes() {
        assert!(validate_menu(&valid_menu()).is_ok());
    }

    #[test]
    fn test_zero_price_menu_is_allowed() {
        let mut m = valid_menu();
        m.price = 0;
        assert!(validate_menu(&m).is_ok());
    }

    #[test]
    fn test_menu_collects_every_violation() {
        let mut m = valid_menu();
        m.name = "  ".into();
        m.price = -500;
        m.duration = 0;

        let err = validate_menu(&m).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.mentions("name"));
        assert!(err.mentions("price"));
        assert!(err.mentions("duration"));
    }

    #[test]
    fn test_valid_receipt_passes() {
        assert!(validate_receipt(&valid_receipt()).is_ok());
    }

    #[test]
    fn test_receipt_rejects_empty_items() {
        let mut r = valid_receipt();
        r.items.clear();
        r.total_amount = 0;

        let err = validate_receipt(&r).unwrap_err();
        assert!(err.violations.contains(&Violation::EmptyItems));
    }

    #[test]
    fn test_receipt_rejects_subtotal_and_total_drift() {
        let mut r = valid_receipt();
        r.items[0].subtotal += 100; // no longer price * quantity
        // total_amount now also disagrees with the declared subtotals

        let err = validate_receipt(&r).unwrap_err();
        assert!(err
            .violations
            .iter()
            .any(|v| matches!(v, Violation::SubtotalMismatch { .. })));
        assert!(err
            .violations
            .iter()
            .any(|v| matches!(v, Violation::TotalMismatch { .. })));
    }

    #[test]
    fn test_receipt_rejects_bad_number_and_quantity() {
        let mut r = valid_receipt();
        r.receipt_number = "not-a-number".into();
        r.items[0].quantity = 0;
        r.items[0].subtotal = 0;
        r.total_amount = 0;

        let err = validate_receipt(&r).unwrap_err();
        assert!(err.mentions("receiptNumber"));
        assert!(err.mentions("quantity"));
    }
}
