//! # Conflict Resolver
//!
//! Deterministic resolution between a local and a remote version of the
//! same entity. Pure functions: given the same two inputs the resolver
//! always yields the same output, which is what makes sync rounds
//! reproducible in tests.
//!
//! ## Decision Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Resolution Decision Table                       │
//! │                                                                     │
//! │  remote missing ─────────────────────────► LOCAL   (no conflict)    │
//! │                                                                     │
//! │  local untouched since its last sync ────► REMOTE  (no conflict,    │
//! │  (updated_at <= last_synced_at)                     normal pull)    │
//! │                                                                     │
//! │  both changed since last sync:                      conflict is     │
//! │    local.updated_at  > remote.updated_at ► LOCAL    recorded for    │
//! │    local.updated_at  < remote.updated_at ► REMOTE   every branch    │
//! │    exact tie, receipt ───────────────────► MERGED   below this      │
//! │    exact tie, menu ──────────────────────► REMOTE   line            │
//! │                                                                     │
//! │  Receipt tie merge: item union keyed by menu_id (local quantity     │
//! │  wins for shared items), total recomputed, local free-text fields   │
//! │  kept. Menu ties go remote: the sheet is the catalog of record      │
//! │  for pricing.                                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::types::{EntityType, EntityVersion, Menu, Receipt, Resolution, SyncConflict};

// =============================================================================
// Resolved Outcome
// =============================================================================

/// Outcome of resolving one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<E> {
    /// The state that should survive on both sides.
    pub winner: E,

    /// Which side (or merge) produced the winner.
    pub resolution: Resolution,

    /// Audit record, present exactly when both sides had changed.
    pub conflict: Option<SyncConflict>,
}

/// A local copy untouched since its last successful sync cannot be in
/// conflict; the remote change simply supersedes it.
fn local_unchanged_since_sync(
    local_updated: DateTime<Utc>,
    last_synced_at: Option<DateTime<Utc>>,
) -> bool {
    matches!(last_synced_at, Some(watermark) if local_updated <= watermark)
}

// =============================================================================
// Menu Resolution
// =============================================================================

/// Resolves a menu against its remote counterpart.
///
/// `last_synced_at` is the instant this menu was last confirmed by the
/// remote store, `None` if it never was.
pub fn resolve_menu(
    local: &Menu,
    remote: Option<&Menu>,
    last_synced_at: Option<DateTime<Utc>>,
) -> Resolved<Menu> {
    let Some(remote) = remote else {
        // New-local-only: nothing to compare against.
        return Resolved {
            winner: local.clone(),
            resolution: Resolution::Local,
            conflict: None,
        };
    };

    if local_unchanged_since_sync(local.updated_at, last_synced_at) {
        // Normal pull, not a conflict.
        return Resolved {
            winner: remote.clone(),
            resolution: Resolution::Remote,
            conflict: None,
        };
    }

    // Both sides changed since the last sync.
    // Tie goes remote: the spreadsheet is authoritative for pricing.
    let (winner, resolution) = if local.updated_at > remote.updated_at {
        (local.clone(), Resolution::Local)
    } else {
        (remote.clone(), Resolution::Remote)
    };

    Resolved {
        winner,
        resolution,
        conflict: Some(SyncConflict {
            entity_type: EntityType::Menu,
            entity_id: local.id.clone(),
            local_version: EntityVersion::Menu(local.clone()),
            remote_version: EntityVersion::Menu(remote.clone()),
            resolution,
        }),
    }
}

// =============================================================================
// Receipt Resolution
// =============================================================================

/// Resolves a receipt against its remote counterpart.
pub fn resolve_receipt(
    local: &Receipt,
    remote: Option<&Receipt>,
    last_synced_at: Option<DateTime<Utc>>,
) -> Resolved<Receipt> {
    let Some(remote) = remote else {
        // New-local-only: nothing to compare against.
        return Resolved {
            winner: local.clone(),
            resolution: Resolution::Local,
            conflict: None,
        };
    };

    if local_unchanged_since_sync(local.updated_at, last_synced_at) {
        // Normal pull, not a conflict.
        return Resolved {
            winner: remote.clone(),
            resolution: Resolution::Remote,
            conflict: None,
        };
    }

    // Both sides changed since the last sync.
    let (winner, resolution) = if local.updated_at > remote.updated_at {
        (local.clone(), Resolution::Local)
    } else if local.updated_at < remote.updated_at {
        (remote.clone(), Resolution::Remote)
    } else {
        (merge_receipts(local, remote), Resolution::Merged)
    };

    Resolved {
        winner,
        resolution,
        conflict: Some(SyncConflict {
            entity_type: EntityType::Receipt,
            entity_id: local.id.clone(),
            local_version: EntityVersion::Receipt(local.clone()),
            remote_version: EntityVersion::Receipt(remote.clone()),
            resolution,
        }),
    }
}

/// Field-level merge for an exact-timestamp receipt tie.
///
/// Items become the union keyed by `menu_id`: items both sides know
/// keep the local line (quantity included), items only one side knows
/// are taken from that side, remote-only lines appended after the local
/// order. Free-text fields (customer, staff, memo) keep the local
/// value; the total is recomputed from the merged items.
fn merge_receipts(local: &Receipt, remote: &Receipt) -> Receipt {
    let mut merged = local.clone();

    for remote_item in &remote.items {
        let known_locally = merged
            .items
            .iter()
            .any(|i| i.menu_id == remote_item.menu_id);
        if !known_locally {
            merged.items.push(remote_item.clone());
        }
    }

    merged.recompute_total();
    merged
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MenuCategory, PaymentMethod, ReceiptItem, SyncStatus};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, h, m, 0).unwrap()
    }

    fn menu(updated_at: DateTime<Utc>) -> Menu {
        Menu {
            id: "m-1".into(),
            name: "Gel Nail".into(),
            price: 6000,
            duration: 60,
            category: MenuCategory::Nail,
            is_active: true,
            created_at: at(9, 0),
            updated_at,
        }
    }

    fn receipt(updated_at: DateTime<Utc>) -> Receipt {
        let item = ReceiptItem {
            menu_id: "m-1".into(),
            menu_name: "Gel Nail".into(),
            price: 6000,
            quantity: 1,
            subtotal: 6000,
        };
        Receipt {
            id: "r-1".into(),
            receipt_number: "20260115-0001".into(),
            customer_name: "Sato".into(),
            service_date: at(10, 0),
            items: vec![item],
            total_amount: 6000,
            staff_name: "Aoi".into(),
            payment_method: PaymentMethod::Cash,
            memo: None,
            sync_status: SyncStatus::Pending,
            created_at: at(10, 0),
            updated_at,
            synced_at: None,
        }
    }

    fn extra_item(menu_id: &str, price: i64, quantity: i64) -> ReceiptItem {
        ReceiptItem {
            menu_id: menu_id.into(),
            menu_name: format!("Menu {menu_id}"),
            price,
            quantity,
            subtotal: price * quantity,
        }
    }

    #[test]
    fn test_new_local_only_wins_without_conflict() {
        let local = receipt(at(10, 0));
        let resolved = resolve_receipt(&local, None, None);

        assert_eq!(resolved.resolution, Resolution::Local);
        assert_eq!(resolved.winner, local);
        assert!(resolved.conflict.is_none());
    }

    #[test]
    fn test_untouched_local_pulls_remote_without_conflict() {
        // Local menu last edited before its last sync; remote changed price.
        let local = menu(at(9, 0));
        let mut remote = menu(at(11, 0));
        remote.price = 6500;

        let resolved = resolve_menu(&local, Some(&remote), Some(at(10, 0)));

        assert_eq!(resolved.resolution, Resolution::Remote);
        assert_eq!(resolved.winner.price, 6500);
        assert!(resolved.conflict.is_none());
    }

    #[test]
    fn test_true_conflict_later_timestamp_wins_and_is_recorded() {
        // Local memo edit at 12:00, remote payment edit at 11:00.
        let mut local = receipt(at(12, 0));
        local.memo = Some("regular customer".into());
        let mut remote = receipt(at(11, 0));
        remote.payment_method = PaymentMethod::Credit;

        let resolved = resolve_receipt(&local, Some(&remote), Some(at(10, 0)));

        assert_eq!(resolved.resolution, Resolution::Local);
        assert_eq!(resolved.winner.memo.as_deref(), Some("regular customer"));
        assert_eq!(resolved.winner.total_amount, resolved.winner.items_total());
        let conflict = resolved.conflict.expect("conflict must be recorded");
        assert_eq!(conflict.entity_type, EntityType::Receipt);
        assert_eq!(conflict.resolution, Resolution::Local);
    }

    #[test]
    fn test_conflict_remote_newer_wins() {
        let local = receipt(at(11, 0));
        let mut remote = receipt(at(12, 0));
        remote.customer_name = "Tanaka".into();

        let resolved = resolve_receipt(&local, Some(&remote), Some(at(10, 0)));

        assert_eq!(resolved.resolution, Resolution::Remote);
        assert_eq!(resolved.winner.customer_name, "Tanaka");
        assert!(resolved.conflict.is_some());
    }

    #[test]
    fn test_receipt_tie_merges_item_union() {
        // Both sides added a different item at the exact same instant.
        let tie = at(12, 0);
        let mut local = receipt(tie);
        local.items.push(extra_item("m-x", 1000, 1));
        local.recompute_total();
        local.memo = Some("local note".into());

        let mut remote = receipt(tie);
        remote.items.push(extra_item("m-y", 2000, 2));
        remote.recompute_total();
        remote.staff_name = "Mika".into();

        let resolved = resolve_receipt(&local, Some(&remote), Some(at(10, 0)));

        assert_eq!(resolved.resolution, Resolution::Merged);
        let ids: Vec<&str> = resolved.winner.items.iter().map(|i| i.menu_id.as_str()).collect();
        assert_eq!(ids, vec!["m-1", "m-x", "m-y"]);
        assert_eq!(resolved.winner.total_amount, 6000 + 1000 + 4000);
        // Local free-text fields win the tie.
        assert_eq!(resolved.winner.memo.as_deref(), Some("local note"));
        assert_eq!(resolved.winner.staff_name, "Aoi");
        assert_eq!(
            resolved.conflict.unwrap().resolution,
            Resolution::Merged
        );
    }

    #[test]
    fn test_shared_item_keeps_local_quantity_on_tie() {
        let tie = at(12, 0);
        let mut local = receipt(tie);
        local.items[0].quantity = 3;
        local.recompute_total();
        let mut remote = receipt(tie);
        remote.items[0].quantity = 2;
        remote.recompute_total();

        let resolved = resolve_receipt(&local, Some(&remote), None);

        assert_eq!(resolved.winner.items[0].quantity, 3);
        assert_eq!(resolved.winner.total_amount, 18000);
    }

    #[test]
    fn test_menu_tie_prefers_remote() {
        let tie = at(12, 0);
        let mut local = menu(tie);
        local.price = 6100;
        let mut remote = menu(tie);
        remote.price = 6200;

        let resolved = resolve_menu(&local, Some(&remote), Some(at(10, 0)));

        assert_eq!(resolved.resolution, Resolution::Remote);
        assert_eq!(resolved.winner.price, 6200);
        assert!(resolved.conflict.is_some());
    }

    #[test]
    fn test_never_synced_collision_is_a_conflict() {
        // last_synced_at None but a remote version exists: both sides
        // changed as far as anyone can tell.
        let local = menu(at(9, 0));
        let remote = menu(at(8, 0));

        let resolved = resolve_menu(&local, Some(&remote), None);

        assert_eq!(resolved.resolution, Resolution::Local);
        assert!(resolved.conflict.is_some());
    }

    #[test]
    fn test_resolver_is_pure() {
        let tie = at(12, 0);
        let mut local = receipt(tie);
        local.items.push(extra_item("m-x", 1000, 1));
        local.recompute_total();
        let mut remote = receipt(tie);
        remote.items.push(extra_item("m-y", 2000, 2));
        remote.recompute_total();

        let first = resolve_receipt(&local, Some(&remote), Some(at(10, 0)));
        let second = resolve_receipt(&local, Some(&remote), Some(at(10, 0)));

        assert_eq!(first, second);
    }
}
