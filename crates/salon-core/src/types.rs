//! # Domain Types
//!
//! Core domain types for the salon receipt keeper.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐   │
//! │  │      Menu       │   │     Receipt     │   │  ReceiptItem    │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │   │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  menu_id (FK)   │   │
//! │  │  name           │   │  receipt_number │   │  menu_name *    │   │
//! │  │  price (yen)    │   │  items[]        │   │  price *        │   │
//! │  │  duration (min) │   │  total_amount   │   │  quantity       │   │
//! │  │  category       │   │  sync_status    │   │  subtotal       │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘   │
//! │                                               * frozen snapshot    │
//! │                                                                     │
//! │  Sync bookkeeping: LocalMetadata, SyncConflict, SyncFailure,        │
//! │  SyncReport - the wire shapes exchanged with the remote store.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! All wire shapes serialize as camelCase JSON with lowercase string
//! enums ("nail", "cash", "pending", ...) - the format the TypeScript
//! UI and the spreadsheet rows use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Menu Category
// =============================================================================

/// Service category a menu entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MenuCategory {
    /// Base nail service (gel, polish).
    Nail,
    /// Hand/foot care.
    Care,
    /// Nail art add-on.
    Art,
    /// Optional extra (parts, repair).
    Option,
    /// Bundled set course.
    Set,
    /// Anything else.
    Other,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Credit card.
    Credit,
    /// PayPay QR payment.
    PayPay,
    /// Gift voucher, bank transfer, etc.
    Other,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Credit => write!(f, "credit"),
            PaymentMethod::PayPay => write!(f, "paypay"),
            PaymentMethod::Other => write!(f, "other"),
        }
    }
}

// =============================================================================
// Sync Status
// =============================================================================

/// Synchronization state of a locally stored entity.
///
/// ## Lifecycle
/// ```text
/// local mutation ──► Pending ──► (sync round ok) ──► Synced
///                       ▲                              │
///                       │        local edit            │
///                       └──────────────────────────────┘
///                       │
///                 (retries exhausted in a round)
///                       ▼
///                     Error ──► (next round ok) ──► Synced
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Confirmed by the remote store.
    Synced,
    /// Local change awaiting synchronization.
    #[default]
    Pending,
    /// Last sync round failed for this entity; retried next round.
    Error,
}

// =============================================================================
// Entity Type
// =============================================================================

/// Discriminator for the two synchronized entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Menu,
    Receipt,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Menu => write!(f, "menu"),
            EntityType::Receipt => write!(f, "receipt"),
        }
    }
}

// =============================================================================
// Menu
// =============================================================================

/// A service offered by the salon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on the menu board and receipts.
    pub name: String,

    /// Price in yen. Invariant: price >= 0.
    pub price: i64,

    /// Service duration in minutes. Invariant: duration > 0.
    pub duration: i64,

    /// Service category.
    pub category: MenuCategory,

    /// Whether the menu is currently offered (soft delete).
    pub is_active: bool,

    /// When the menu was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the menu was last updated. Drives conflict resolution.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Receipt Item
// =============================================================================

/// A line item on a receipt.
///
/// Uses the snapshot pattern: `menu_name` and `price` are frozen at
/// creation time and must not change even if the referenced Menu does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    /// Referenced menu (not owned - the snapshot fields below are).
    pub menu_id: String,

    /// Menu name at time of sale (frozen).
    pub menu_name: String,

    /// Unit price in yen at time of sale (frozen).
    pub price: i64,

    /// Quantity sold. Invariant: quantity > 0.
    pub quantity: i64,

    /// Line total. Invariant: subtotal == price * quantity.
    pub subtotal: i64,
}

impl ReceiptItem {
    /// Creates an item by snapshotting the given menu.
    pub fn for_menu(menu: &Menu, quantity: i64) -> Self {
        ReceiptItem {
            menu_id: menu.id.clone(),
            menu_name: menu.name.clone(),
            price: menu.price,
            quantity,
            subtotal: menu.price * quantity,
        }
    }

    /// The subtotal this item should carry.
    #[inline]
    pub fn expected_subtotal(&self) -> i64 {
        self.price * self.quantity
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// A service receipt issued to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable number, `YYYYMMDD-NNNN`, unique per calendar day.
    pub receipt_number: String,

    /// Customer the service was performed for.
    pub customer_name: String,

    /// When the service took place.
    #[ts(as = "String")]
    pub service_date: DateTime<Utc>,

    /// Ordered line items.
    pub items: Vec<ReceiptItem>,

    /// Invariant: total_amount == sum of item subtotals.
    pub total_amount: i64,

    /// Staff member who performed the service.
    pub staff_name: String,

    /// How the customer paid.
    pub payment_method: PaymentMethod,

    /// Free-text note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,

    /// Synchronization state of this receipt.
    pub sync_status: SyncStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Last local edit time. Drives conflict resolution.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// When the remote store last confirmed this receipt.
    #[ts(as = "Option<String>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl Receipt {
    /// Sum of the item subtotals.
    pub fn items_total(&self) -> i64 {
        self.items.iter().map(|i| i.subtotal).sum()
    }

    /// Recomputes `total_amount` from the items.
    ///
    /// Call after any mutation of the items list; `total_amount` is
    /// derived state and never independently editable.
    pub fn recompute_total(&mut self) {
        for item in &mut self.items {
            item.subtotal = item.expected_subtotal();
        }
        self.total_amount = self.items_total();
    }
}

// =============================================================================
// Local Metadata
// =============================================================================

/// Schema version written into [`LocalMetadata`].
pub const SCHEMA_VERSION: u32 = 1;

/// Process-wide sync bookkeeping record.
///
/// Exactly one of these exists in the local store. `pending_sync_count`
/// always equals the number of entities whose sync status is not
/// `Synced` - it is recalculated eagerly on every mutation so the UI
/// can show a badge without scanning the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LocalMetadata {
    /// Local schema version, for future migrations.
    pub version: u32,

    /// Watermark: remote changes up to this instant have been pulled.
    #[ts(as = "Option<String>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,

    /// Count of entities with sync status != Synced.
    pub pending_sync_count: u32,
}

impl Default for LocalMetadata {
    fn default() -> Self {
        LocalMetadata {
            version: SCHEMA_VERSION,
            last_sync_at: None,
            pending_sync_count: 0,
        }
    }
}

// =============================================================================
// Conflict Resolution Wire Shapes
// =============================================================================

/// How a conflict was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// The local version won.
    Local,
    /// The remote version won.
    Remote,
    /// A field-level merge of both versions was produced.
    Merged,
}

/// One concrete entity version carried inside a conflict record.
///
/// Keyed by the conflict's `entity_type`; serializes as the bare entity
/// object so the audit record reads the same as the entity endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum EntityVersion {
    Menu(Menu),
    Receipt(Receipt),
}

impl EntityVersion {
    /// The entity kind this version holds.
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityVersion::Menu(_) => EntityType::Menu,
            EntityVersion::Receipt(_) => EntityType::Receipt,
        }
    }

    /// The wrapped entity's id.
    pub fn entity_id(&self) -> &str {
        match self {
            EntityVersion::Menu(m) => &m.id,
            EntityVersion::Receipt(r) => &r.id,
        }
    }

    /// The wrapped entity's last edit time.
    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            EntityVersion::Menu(m) => m.updated_at,
            EntityVersion::Receipt(r) => r.updated_at,
        }
    }
}

/// Immutable audit record of one resolved conflict.
///
/// Appended whenever both sides changed the same entity since the last
/// successful sync; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub local_version: EntityVersion,
    pub remote_version: EntityVersion,
    pub resolution: Resolution,
}

/// Per-entity sync failure record.
///
/// One per entity that failed to synchronize in a round. Failures are
/// isolated: recording one never blocks other entities in the round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub entity_type: EntityType,
    pub entity_id: String,
    /// Machine-readable code ("timeout", "remote_rejected", ...).
    pub error_code: String,
    /// Human-readable detail.
    pub error_message: String,
}

/// Report returned by one sync round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Start instant of the round (the new watermark when fetch succeeded).
    #[ts(as = "String")]
    pub synced_at: DateTime<Utc>,

    /// Receipt ids that reached `Synced` this round (pushed or pulled).
    pub synced_receipts: Vec<String>,

    /// Menu ids that reached `Synced` this round (pushed or pulled).
    pub synced_menus: Vec<String>,

    /// Conflicts encountered and how each was resolved.
    pub conflicts: Vec<SyncConflict>,

    /// Per-entity failures; these entities retry next round.
    pub errors: Vec<SyncFailure>,
}

impl SyncReport {
    /// Creates an empty report for a round starting at `synced_at`.
    pub fn new(synced_at: DateTime<Utc>) -> Self {
        SyncReport {
            synced_at,
            synced_receipts: Vec::new(),
            synced_menus: Vec::new(),
            conflicts: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// True when every entity in the round synchronized cleanly.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn menu() -> Menu {
        Menu {
            id: "m-1".into(),
            name: "Gel Nail".into(),
            price: 6000,
            duration: 60,
            category: MenuCategory::Nail,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_item_snapshot_freezes_menu_fields() {
        let mut m = menu();
        let item = ReceiptItem::for_menu(&m, 2);
        m.name = "Renamed".into();
        m.price = 9999;

        assert_eq!(item.menu_name, "Gel Nail");
        assert_eq!(item.price, 6000);
        assert_eq!(item.subtotal, 12000);
    }

    #[test]
    fn test_recompute_total_repairs_drift() {
        let m = menu();
        let mut receipt = Receipt {
            id: "r-1".into(),
            receipt_number: "20250601-0001".into(),
            customer_name: "Sato".into(),
            service_date: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            items: vec![ReceiptItem::for_menu(&m, 1), ReceiptItem::for_menu(&m, 2)],
            total_amount: 0,
            staff_name: "Aoi".into(),
            payment_method: PaymentMethod::Cash,
            memo: None,
            sync_status: SyncStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            synced_at: None,
        };
        receipt.items[0].subtotal = 1; // drifted
        receipt.recompute_total();

        assert_eq!(receipt.items[0].subtotal, 6000);
        assert_eq!(receipt.total_amount, 18000);
        assert_eq!(receipt.total_amount, receipt.items_total());
    }

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(
            serde_json::to_string(&MenuCategory::Nail).unwrap(),
            "\"nail\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::PayPay).unwrap(),
            "\"paypay\""
        );
        assert_eq!(
            serde_json::to_string(&SyncStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(serde_json::to_string(&Resolution::Merged).unwrap(), "\"merged\"");
        assert_eq!(serde_json::to_string(&EntityType::Receipt).unwrap(), "\"receipt\"");
    }

    #[test]
    fn test_camel_case_wire_fields() {
        let m = menu();
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"isActive\""));
        assert!(json.contains("\"createdAt\""));
        assert!(!json.contains("\"is_active\""));
    }

    #[test]
    fn test_entity_version_untagged_roundtrip() {
        let v = EntityVersion::Menu(menu());
        let json = serde_json::to_string(&v).unwrap();
        // Serializes as the bare menu object, no enum wrapper.
        assert!(json.starts_with('{'));
        let back: EntityVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entity_type(), EntityType::Menu);
        assert_eq!(back.entity_id(), "m-1");
    }

    #[test]
    fn test_metadata_default() {
        let meta = LocalMetadata::default();
        assert_eq!(meta.version, SCHEMA_VERSION);
        assert_eq!(meta.pending_sync_count, 0);
        assert!(meta.last_sync_at.is_none());
    }
}
