//! # salon-store: Local Entity Store for Salon POS
//!
//! Offline-first local side of the system: validated entity storage,
//! the change queue feeding the sync engine, receipt numbering, and the
//! persistence seam to whatever durable store the host provides.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Salon POS Data Flow                          │
//! │                                                                     │
//! │  UI/API layer (create receipt, edit menu, search, analytics)        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌──────────────────────────────────────────────────────────────┐   │
//! │  │                  salon-store (THIS CRATE)                    │   │
//! │  │                                                              │   │
//! │  │   ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐   │   │
//! │  │   │ EntityStore │   │ ChangeQueue │   │  DailyCounters   │   │   │
//! │  │   │ (validated  │──►│ (pending    │   │  (receipt        │   │   │
//! │  │   │  CRUD)      │   │  mutations) │   │   numbering)     │   │   │
//! │  │   └──────┬──────┘   └──────┬──────┘   └────────┬─────────┘   │   │
//! │  │          └─────────────────┴───────────────────┘             │   │
//! │  │                            │ one atomic WriteBatch           │   │
//! │  │                            ▼                                 │   │
//! │  │   ┌──────────────────────────────────────────────────────┐   │   │
//! │  │   │        LocalStore trait (MemoryStore included)       │   │   │
//! │  │   └──────────────────────────────────────────────────────┘   │   │
//! │  └──────────────────────────────────────────────────────────────┘   │
//! │       ▲                                                             │
//! │       │ pending_changes / apply_remote / confirm_synced             │
//! │  salon-sync (the coordinator drives these during a round)           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`entity_store`] - validated CRUD plus the coordinator interface
//! - [`queue`] - pending change records with per-entity coalescing
//! - [`numbering`] - per-date receipt sequence counters
//! - [`local`] - the `LocalStore` collaborator trait and `MemoryStore`
//! - [`error`] - store error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod entity_store;
pub mod error;
pub mod local;
pub mod numbering;
pub mod queue;

// =============================================================================
// Re-exports
// =============================================================================

pub use entity_store::{EntityStore, ReceiptPage};
pub use error::{StoreError, StoreResult};
pub use local::{LocalStore, MemoryStore, MenuRecord, StoreSnapshot, WriteBatch};
pub use numbering::DailyCounters;
pub use queue::{ChangeOp, ChangeQueue, ChangeRecord};
