//! # Local Durable Store
//!
//! The persistence seam. The concrete engine (SQLite, IndexedDB via a
//! host bridge, flat files) is an external collaborator; everything in
//! this crate talks to it through the [`LocalStore`] trait.
//!
//! ## Atomic Batches
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     One Local Mutation                              │
//! │                                                                     │
//! │  EntityStore::create_receipt(...)                                   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌──────────────────────────────────────────────────────────────┐   │
//! │  │                  SINGLE WriteBatch                           │   │
//! │  │                                                              │   │
//! │  │  1. put receipt           (the entity itself)                │   │
//! │  │  2. put change record     (queued for the next sync round)   │   │
//! │  │  3. put daily counter     (the consumed receipt sequence)    │   │
//! │  │  4. put metadata          (eager pendingSyncCount)           │   │
//! │  └──────────────────────────────────────────────────────────────┘   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  LocalStore::commit ← all keys land or none do                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `MemoryStore` is the in-process reference implementation, used by
//! tests and as the backing store when the host provides durability by
//! other means (e.g. snapshotting the whole state).

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use salon_core::{EntityType, LocalMetadata, Menu, Receipt, SyncStatus};

use crate::error::StoreResult;
use crate::queue::ChangeRecord;

// =============================================================================
// Stored Records
// =============================================================================

/// A menu as the local store keeps it.
///
/// The `Menu` wire shape carries no sync fields (the catalog sheet is
/// shared verbatim with the UI), so the store wraps it with its own
/// bookkeeping instead of widening the wire type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuRecord {
    pub menu: Menu,
    pub sync_status: SyncStatus,
    pub synced_at: Option<DateTime<Utc>>,
}

impl MenuRecord {
    /// Wraps a locally mutated menu (always starts out pending).
    pub fn pending(menu: Menu) -> Self {
        MenuRecord {
            menu,
            sync_status: SyncStatus::Pending,
            synced_at: None,
        }
    }

    /// Wraps a remotely confirmed menu.
    pub fn synced(menu: Menu, synced_at: DateTime<Utc>) -> Self {
        MenuRecord {
            menu,
            sync_status: SyncStatus::Synced,
            synced_at: Some(synced_at),
        }
    }
}

/// Everything the local store holds, loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub menus: Vec<MenuRecord>,
    pub receipts: Vec<Receipt>,
    pub queue: Vec<ChangeRecord>,
    /// Last issued receipt sequence per date.
    pub counters: Vec<(NaiveDate, u32)>,
    pub metadata: LocalMetadata,
}

// =============================================================================
// Write Batch
// =============================================================================

/// A set of writes that must land atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    menus: Vec<MenuRecord>,
    receipts: Vec<Receipt>,
    queue_put: Vec<ChangeRecord>,
    queue_ack: Vec<(EntityType, String)>,
    counters: Vec<(NaiveDate, u32)>,
    metadata: Option<LocalMetadata>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch::default()
    }

    pub fn put_menu(mut self, record: MenuRecord) -> Self {
        self.menus.push(record);
        self
    }

    pub fn put_receipt(mut self, receipt: Receipt) -> Self {
        self.receipts.push(receipt);
        self
    }

    /// Upserts a change record (replaces any record for the same entity).
    pub fn put_change(mut self, record: ChangeRecord) -> Self {
        self.queue_put.push(record);
        self
    }

    /// Removes the change record for an entity.
    pub fn ack_change(mut self, entity_type: EntityType, entity_id: &str) -> Self {
        self.queue_ack.push((entity_type, entity_id.to_string()));
        self
    }

    pub fn put_counter(mut self, date: NaiveDate, seq: u32) -> Self {
        self.counters.push((date, seq));
        self
    }

    pub fn put_metadata(mut self, metadata: LocalMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
            && self.receipts.is_empty()
            && self.queue_put.is_empty()
            && self.queue_ack.is_empty()
            && self.counters.is_empty()
            && self.metadata.is_none()
    }
}

// =============================================================================
// LocalStore Trait
// =============================================================================

/// Durable key-value collaborator for entities, queue records, daily
/// counters and the metadata singleton.
///
/// Implementations must apply a [`WriteBatch`] atomically: a commit
/// either lands every write or leaves the store untouched. The entity
/// store only updates its in-memory state after a successful commit, so
/// that guarantee is what keeps entity and queue in lockstep.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Loads the full persisted state. Called once at startup.
    async fn load(&self) -> StoreResult<StoreSnapshot>;

    /// Atomically applies all writes in the batch.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory [`LocalStore`]. Reference implementation and test double.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    menus: HashMap<String, MenuRecord>,
    receipts: HashMap<String, Receipt>,
    queue: Vec<ChangeRecord>,
    counters: BTreeMap<NaiveDate, u32>,
    metadata: LocalMetadata,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Builds a store pre-populated with the given snapshot (tests,
    /// host-provided state restore).
    pub fn seeded(snapshot: StoreSnapshot) -> Self {
        let store = MemoryStore::new();
        {
            let mut inner = store.locked();
            for record in snapshot.menus {
                inner.menus.insert(record.menu.id.clone(), record);
            }
            for receipt in snapshot.receipts {
                inner.receipts.insert(receipt.id.clone(), receipt);
            }
            inner.queue = snapshot.queue;
            inner.counters = snapshot.counters.into_iter().collect();
            inner.metadata = snapshot.metadata;
        }
        store
    }

    /// A poisoned lock just hands back the data; commits are total, so
    /// the inner state is valid even if a holder panicked.
    fn locked(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn load(&self) -> StoreResult<StoreSnapshot> {
        let inner = self.locked();
        Ok(StoreSnapshot {
            menus: inner.menus.values().cloned().collect(),
            receipts: inner.receipts.values().cloned().collect(),
            queue: inner.queue.clone(),
            counters: inner.counters.iter().map(|(&d, &s)| (d, s)).collect(),
            metadata: inner.metadata.clone(),
        })
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        // Everything below is infallible, so the whole batch applies
        // under one lock acquisition - atomic by construction.
        let mut inner = self.locked();

        for record in batch.menus {
            inner.menus.insert(record.menu.id.clone(), record);
        }
        for receipt in batch.receipts {
            inner.receipts.insert(receipt.id.clone(), receipt);
        }
        for record in batch.queue_put {
            match inner
                .queue
                .iter_mut()
                .find(|r| r.entity_type == record.entity_type && r.entity_id == record.entity_id)
            {
                Some(existing) => *existing = record,
                None => inner.queue.push(record),
            }
        }
        for (entity_type, entity_id) in batch.queue_ack {
            inner
                .queue
                .retain(|r| !(r.entity_type == entity_type && r.entity_id == entity_id));
        }
        for (date, seq) in batch.counters {
            inner.counters.insert(date, seq);
        }
        if let Some(metadata) = batch.metadata {
            inner.metadata = metadata;
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ChangeOp;
    use chrono::TimeZone;
    use salon_core::{EntityVersion, MenuCategory};

    fn menu(id: &str) -> Menu {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
        Menu {
            id: id.into(),
            name: "Gel Nail".into(),
            price: 6000,
            duration: 60,
            category: MenuCategory::Nail,
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_commit_then_load_roundtrip() {
        let store = MemoryStore::new();
        let m = menu("m-1");
        let record = ChangeRecord::new(
            ChangeOp::Create,
            EntityVersion::Menu(m.clone()),
            m.updated_at,
        );

        let batch = WriteBatch::new()
            .put_menu(MenuRecord::pending(m.clone()))
            .put_change(record)
            .put_counter(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(), 3)
            .put_metadata(LocalMetadata {
                pending_sync_count: 1,
                ..LocalMetadata::default()
            });
        store.commit(batch).await.unwrap();

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.menus.len(), 1);
        assert_eq!(snapshot.menus[0].menu, m);
        assert_eq!(snapshot.menus[0].sync_status, SyncStatus::Pending);
        assert_eq!(snapshot.queue.len(), 1);
        assert_eq!(snapshot.counters, vec![(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(), 3)]);
        assert_eq!(snapshot.metadata.pending_sync_count, 1);
    }

    #[tokio::test]
    async fn test_queue_put_replaces_and_ack_removes() {
        let store = MemoryStore::new();
        let first = ChangeRecord::new(
            ChangeOp::Create,
            EntityVersion::Menu(menu("m-1")),
            Utc::now(),
        );
        store
            .commit(WriteBatch::new().put_change(first.clone()))
            .await
            .unwrap();

        let mut updated_menu = menu("m-1");
        updated_menu.price = 7000;
        let second = ChangeRecord::new(
            ChangeOp::Create,
            EntityVersion::Menu(updated_menu),
            Utc::now(),
        );
        store.commit(WriteBatch::new().put_change(second)).await.unwrap();

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.queue.len(), 1);

        store
            .commit(WriteBatch::new().ack_change(EntityType::Menu, "m-1"))
            .await
            .unwrap();
        assert!(store.load().await.unwrap().queue.is_empty());
    }

    #[test]
    fn test_empty_batch_detection() {
        assert!(WriteBatch::new().is_empty());
        assert!(!WriteBatch::new()
            .put_metadata(LocalMetadata::default())
            .is_empty());
    }
}
