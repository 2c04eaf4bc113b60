//! # salon-core: Pure Business Logic for the Salon Receipt Keeper
//!
//! This crate is the heart of the system: domain types, invariant
//! validation, receipt-number formatting, deterministic conflict
//! resolution and sales analytics - all as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Salon POS Architecture                          │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │              UI / API layer (external, TypeScript)           │   │
//! │  └─────────────────────────────┬───────────────────────────────┘   │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────┐   │
//! │  │                ★ salon-core (THIS CRATE) ★                  │   │
//! │  │                                                             │   │
//! │  │  ┌──────────┐ ┌────────────┐ ┌──────────┐ ┌─────────────┐  │   │
//! │  │  │  types   │ │ validation │ │ resolver │ │  analytics  │  │   │
//! │  │  │  Menu    │ │ invariant  │ │ conflict │ │ sales       │  │   │
//! │  │  │  Receipt │ │ checks     │ │ merging  │ │ rollups     │  │   │
//! │  │  └──────────┘ └────────────┘ └──────────┘ └─────────────┘  │   │
//! │  │                                                             │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────┬───────────────────────────────┘   │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────┐   │
//! │  │        salon-store (entity store + change queue)             │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Menu, Receipt, sync wire shapes)
//! - [`requests`] - DTOs submitted by the UI/API layer
//! - [`error`] - Domain error types
//! - [`validation`] - Entity invariant checks
//! - [`numbering`] - Receipt number format (`YYYYMMDD-NNNN`)
//! - [`resolver`] - Deterministic conflict resolution
//! - [`analytics`] - Sales rollups
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output - the resolver in
//!    particular must be reproducible in tests
//! 2. **No I/O**: storage and network live in salon-store/salon-sync
//! 3. **Integer Money**: prices are integer yen (i64), never floats
//! 4. **Exhaustive Enums**: statuses and categories are sum types so
//!    every match is checked at compile time

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod error;
pub mod numbering;
pub mod requests;
pub mod resolver;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use analytics::{sales_analytics, DateRange, GroupBy, SalesAnalytics};
pub use error::{CoreError, CoreResult, ValidationError, Violation};
pub use numbering::{format_receipt_number, parse_receipt_number, MAX_DAILY_SEQUENCE};
pub use requests::{
    CreateMenuRequest, CreateReceiptRequest, PageInfo, ReceiptItemRequest, ReceiptQuery,
    UpdateMenuRequest,
};
pub use resolver::{resolve_menu, resolve_receipt, Resolved};
pub use types::*;
pub use validation::{validate_menu, validate_receipt, ValidationResult};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length for names (menu, customer, staff).
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length for the receipt memo.
pub const MAX_MEMO_LEN: usize = 500;

/// Maximum quantity of a single line item.
///
/// Guards against fat-finger entry (typing 100 instead of 10); a nail
/// salon never sells a hundred of anything on one receipt.
pub const MAX_ITEM_QUANTITY: i64 = 99;
