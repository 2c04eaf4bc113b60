//! # salon-sync: Sync Engine for Salon POS
//!
//! Offline-first synchronization between the local entity store and the
//! remote spreadsheet store: the app stays fully usable offline, local
//! mutations queue up, and each sync round pulls, pushes and resolves
//! conflicts deterministically.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Sync Engine Architecture                       │
//! │                                                                     │
//! │  ┌──────────────────────────────────────────────────────────────┐   │
//! │  │                   SyncCoordinator                            │   │
//! │  │                                                              │   │
//! │  │  • Single-flight rounds (concurrent triggers coalesce)       │   │
//! │  │  • Bounded timeout on every remote call                      │   │
//! │  │  • Per-entity failure isolation + next-round retry           │   │
//! │  │  • Watermark only advances after a successful fetch          │   │
//! │  └──────────┬────────────────────────────┬──────────────────────┘   │
//! │             │                            │                          │
//! │             ▼                            ▼                          │
//! │  ┌────────────────────┐      ┌──────────────────────────────────┐   │
//! │  │  salon-store       │      │  RemoteStore trait               │   │
//! │  │  EntityStore       │      │  (Google Sheets client outside   │   │
//! │  │  + ChangeQueue     │      │   this workspace)                │   │
//! │  └────────────────────┘      └──────────────────────────────────┘   │
//! │             │                                                       │
//! │             ▼                                                       │
//! │  salon-core resolver: pure, deterministic conflict decisions        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`coordinator`] - the `SyncCoordinator` round state machine
//! - [`remote`] - the remote spreadsheet collaborator trait
//! - [`config`] - TOML sync configuration
//! - [`error`] - sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use salon_store::{EntityStore, MemoryStore};
//! use salon_sync::{SyncConfig, SyncCoordinator};
//!
//! let store = Arc::new(EntityStore::open(Arc::new(MemoryStore::new())).await?);
//! let config = SyncConfig::load_or_default(None);
//! let coordinator = SyncCoordinator::new(store, sheets_client, &config);
//!
//! // Periodically, or when the user taps "sync now":
//! let report = coordinator.trigger_sync().await;
//! println!("synced {} receipts", report.synced_receipts.len());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod coordinator;
pub mod error;
pub mod remote;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{SpreadsheetConfig, SyncConfig, SyncSettings};
pub use coordinator::{PeriodicSyncHandle, SyncCoordinator, SyncState};
pub use error::{SyncError, SyncResult};
pub use remote::{RemoteChanges, RemoteStore};
