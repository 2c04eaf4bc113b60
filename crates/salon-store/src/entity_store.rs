//! # Entity Store
//!
//! Canonical local copies of menus and receipts, with validation, sync
//! bookkeeping and the change queue kept in lockstep.
//!
//! ## Mutation Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    One Local Mutation                               │
//! │                                                                     │
//! │  1. VALIDATE     every invariant; reject with the full list of      │
//! │                  violated fields, nothing stored or queued          │
//! │  2. MARK         sync status = pending                              │
//! │  3. COMMIT       entity + change record + metadata in ONE batch     │
//! │                  (+ the daily counter when a receipt is issued)     │
//! │  4. APPLY        in-memory state updated only after the commit      │
//! │                                                                     │
//! │  A failed commit leaves memory, queue and counters untouched.       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Readers always observe whole entities: writes happen under the write
//! lock and replace an entity in one step, so a reader sees either the
//! pre-mutation or the post-mutation value, never a half-applied merge.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use salon_core::{
    format_receipt_number, sales_analytics, validate_menu, validate_receipt, CreateMenuRequest,
    CreateReceiptRequest, DateRange, EntityType, EntityVersion, GroupBy, LocalMetadata, Menu,
    PageInfo, Receipt, ReceiptItem, ReceiptQuery, SalesAnalytics, SyncStatus, UpdateMenuRequest,
};

use crate::error::{StoreError, StoreResult};
use crate::local::{LocalStore, MenuRecord, WriteBatch};
use crate::numbering::DailyCounters;
use crate::queue::{ChangeOp, ChangeQueue, ChangeRecord};

// =============================================================================
// Result Page
// =============================================================================

/// One page of a receipt search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPage {
    pub receipts: Vec<Receipt>,
    pub pagination: PageInfo,
}

// =============================================================================
// Entity Store
// =============================================================================

/// Local authoritative cache of menus and receipts.
pub struct EntityStore {
    /// Durable collaborator; every mutation lands here first.
    local: Arc<dyn LocalStore>,

    /// In-memory state, rebuilt from the local store at startup.
    inner: RwLock<Inner>,
}

struct Inner {
    menus: HashMap<String, MenuRecord>,
    receipts: HashMap<String, Receipt>,
    queue: ChangeQueue,
    counters: DailyCounters,
    metadata: LocalMetadata,
}

impl Inner {
    /// Entities whose sync status is not `Synced`.
    fn count_pending(&self) -> u32 {
        let menus = self
            .menus
            .values()
            .filter(|r| r.sync_status != SyncStatus::Synced)
            .count();
        let receipts = self
            .receipts
            .values()
            .filter(|r| r.sync_status != SyncStatus::Synced)
            .count();
        (menus + receipts) as u32
    }

    /// Metadata after one entity transitions `old` -> `new`.
    /// `old = None` means the entity did not exist before.
    fn metadata_after(&self, old: Option<SyncStatus>, new: SyncStatus) -> LocalMetadata {
        let was_pending = matches!(old, Some(s) if s != SyncStatus::Synced);
        let is_pending = new != SyncStatus::Synced;
        let mut metadata = self.metadata.clone();
        match (was_pending, is_pending) {
            (false, true) => metadata.pending_sync_count += 1,
            (true, false) => {
                metadata.pending_sync_count = metadata.pending_sync_count.saturating_sub(1)
            }
            _ => {}
        }
        metadata
    }
}

impl EntityStore {
    /// Opens the store on top of a local collaborator, loading all
    /// persisted state.
    ///
    /// Daily counters are raised to cover every stored receipt number,
    /// and a stale `pending_sync_count` self-heals against the actual
    /// entity statuses.
    pub async fn open(local: Arc<dyn LocalStore>) -> StoreResult<Self> {
        let snapshot = local.load().await?;

        let mut counters = DailyCounters::from_entries(snapshot.counters);
        for receipt in &snapshot.receipts {
            counters.observe_receipt_number(&receipt.receipt_number);
        }

        let mut inner = Inner {
            menus: snapshot
                .menus
                .into_iter()
                .map(|r| (r.menu.id.clone(), r))
                .collect(),
            receipts: snapshot
                .receipts
                .into_iter()
                .map(|r| (r.id.clone(), r))
                .collect(),
            queue: ChangeQueue::from_records(snapshot.queue),
            counters,
            metadata: snapshot.metadata,
        };

        let actual_pending = inner.count_pending();
        if inner.metadata.pending_sync_count != actual_pending {
            warn!(
                stored = inner.metadata.pending_sync_count,
                actual = actual_pending,
                "Repairing stale pendingSyncCount"
            );
            inner.metadata.pending_sync_count = actual_pending;
        }

        debug!(
            menus = inner.menus.len(),
            receipts = inner.receipts.len(),
            queued = inner.queue.len(),
            "Entity store opened"
        );

        Ok(EntityStore {
            local,
            inner: RwLock::new(inner),
        })
    }

    // =========================================================================
    // Menu CRUD
    // =========================================================================

    /// Creates a new menu from a request.
    pub async fn create_menu(&self, req: CreateMenuRequest) -> StoreResult<Menu> {
        let now = Utc::now();
        let menu = Menu {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            price: req.price,
            duration: req.duration,
            category: req.category,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        validate_menu(&menu)?;

        debug!(id = %menu.id, name = %menu.name, "Creating menu");

        let mut inner = self.inner.write().await;
        let record = MenuRecord::pending(menu.clone());
        self.commit_menu_mutation(&mut inner, record, None, ChangeOp::Create, now)
            .await?;
        Ok(menu)
    }

    /// Applies a partial update to an existing menu.
    pub async fn update_menu(&self, id: &str, patch: &UpdateMenuRequest) -> StoreResult<Menu> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let existing = inner
            .menus
            .get(id)
            .ok_or_else(|| StoreError::MenuNotFound(id.to_string()))?
            .clone();

        let mut menu = existing.menu.clone();
        patch.apply(&mut menu);
        menu.updated_at = now;
        validate_menu(&menu)?;

        debug!(id = %menu.id, "Updating menu");

        // A never-synced menu is still a Create from the remote's view.
        let op = if existing.synced_at.is_some() {
            ChangeOp::Update
        } else {
            ChangeOp::Create
        };
        let record = MenuRecord {
            menu: menu.clone(),
            sync_status: SyncStatus::Pending,
            synced_at: existing.synced_at,
        };
        self.commit_menu_mutation(&mut inner, record, Some(existing.sync_status), op, now)
            .await?;
        Ok(menu)
    }

    /// Stores a menu exactly as given (after validation), marking it
    /// pending and enqueueing it for sync.
    ///
    /// Fields are not touched: `upsert` followed by `get` round-trips.
    pub async fn upsert_menu(&self, menu: Menu) -> StoreResult<Menu> {
        validate_menu(&menu)?;
        let now = Utc::now();

        let mut inner = self.inner.write().await;
        let existing = inner.menus.get(&menu.id).cloned();
        let op = match &existing {
            Some(record) if record.synced_at.is_some() => ChangeOp::Update,
            _ => ChangeOp::Create,
        };
        let record = MenuRecord {
            menu: menu.clone(),
            sync_status: SyncStatus::Pending,
            synced_at: existing.as_ref().and_then(|r| r.synced_at),
        };
        self.commit_menu_mutation(
            &mut inner,
            record,
            existing.map(|r| r.sync_status),
            op,
            now,
        )
        .await?;
        Ok(menu)
    }

    /// Pure read.
    pub async fn get_menu(&self, id: &str) -> Option<Menu> {
        let inner = self.inner.read().await;
        inner.menus.get(id).map(|r| r.menu.clone())
    }

    /// Lists menus sorted by name (id breaks name ties).
    pub async fn list_menus(&self, include_inactive: bool) -> Vec<Menu> {
        let inner = self.inner.read().await;
        let mut menus: Vec<Menu> = inner
            .menus
            .values()
            .filter(|r| include_inactive || r.menu.is_active)
            .map(|r| r.menu.clone())
            .collect();
        menus.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        menus
    }

    // =========================================================================
    // Receipt CRUD
    // =========================================================================

    /// Issues a new receipt: snapshots menu name/price into the items,
    /// allocates the day's next receipt number, and commits receipt,
    /// counter, change record and metadata atomically.
    pub async fn create_receipt(&self, req: CreateReceiptRequest) -> StoreResult<Receipt> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        let mut items = Vec::with_capacity(req.items.len());
        for line in &req.items {
            let record = inner
                .menus
                .get(&line.menu_id)
                .ok_or_else(|| StoreError::MenuNotFound(line.menu_id.clone()))?;
            items.push(ReceiptItem::for_menu(&record.menu, line.quantity));
        }

        let date = req.service_date.date_naive();
        let seq = inner.counters.peek_next(date)?;

        let mut receipt = Receipt {
            id: Uuid::new_v4().to_string(),
            receipt_number: format_receipt_number(date, seq),
            customer_name: req.customer_name,
            service_date: req.service_date,
            items,
            total_amount: 0,
            staff_name: req.staff_name,
            payment_method: req.payment_method,
            memo: req.memo,
            sync_status: SyncStatus::Pending,
            created_at: now,
            updated_at: now,
            synced_at: None,
        };
        receipt.recompute_total();
        validate_receipt(&receipt)?;

        debug!(
            id = %receipt.id,
            receipt_number = %receipt.receipt_number,
            total = receipt.total_amount,
            "Issuing receipt"
        );

        let change = inner.queue.coalesce(ChangeRecord::new(
            ChangeOp::Create,
            EntityVersion::Receipt(receipt.clone()),
            now,
        ));
        let metadata = inner.metadata_after(None, SyncStatus::Pending);
        let batch = WriteBatch::new()
            .put_receipt(receipt.clone())
            .put_counter(date, seq)
            .put_change(change.clone())
            .put_metadata(metadata.clone());
        self.local.commit(batch).await?;

        inner.receipts.insert(receipt.id.clone(), receipt.clone());
        inner.counters.commit(date, seq);
        inner.queue.enqueue(change);
        inner.metadata = metadata;
        Ok(receipt)
    }

    /// Stores a receipt exactly as given (after validation), marking it
    /// pending and enqueueing it for sync.
    ///
    /// The receipt's own fields round-trip untouched; an edit to a
    /// previously synced receipt transitions it back to pending.
    pub async fn upsert_receipt(&self, mut receipt: Receipt) -> StoreResult<Receipt> {
        receipt.sync_status = SyncStatus::Pending;
        validate_receipt(&receipt)?;
        let now = Utc::now();

        let mut inner = self.inner.write().await;
        let existing = inner.receipts.get(&receipt.id).cloned();
        let op = match &existing {
            Some(r) if r.synced_at.is_some() => ChangeOp::Update,
            _ => ChangeOp::Create,
        };

        debug!(id = %receipt.id, ?op, "Upserting receipt");

        let change = inner.queue.coalesce(ChangeRecord::new(
            op,
            EntityVersion::Receipt(receipt.clone()),
            now,
        ));
        let metadata =
            inner.metadata_after(existing.map(|r| r.sync_status), SyncStatus::Pending);
        let batch = WriteBatch::new()
            .put_receipt(receipt.clone())
            .put_change(change.clone())
            .put_metadata(metadata.clone());
        self.local.commit(batch).await?;

        inner.receipts.insert(receipt.id.clone(), receipt.clone());
        inner.queue.enqueue(change);
        inner.metadata = metadata;
        Ok(receipt)
    }

    /// Pure read.
    pub async fn get_receipt(&self, id: &str) -> Option<Receipt> {
        let inner = self.inner.read().await;
        inner.receipts.get(id).cloned()
    }

    /// Searches receipts with filters and pagination, newest first.
    pub async fn list_receipts(&self, query: &ReceiptQuery) -> ReceiptPage {
        let inner = self.inner.read().await;
        let mut matching: Vec<Receipt> = inner
            .receipts
            .values()
            .filter(|r| matches_query(r, query))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.service_date
                .cmp(&a.service_date)
                .then(b.receipt_number.cmp(&a.receipt_number))
        });

        let pagination = PageInfo::compute(matching.len() as u32, query.page, query.page_size);
        let start = ((pagination.page - 1) * pagination.page_size) as usize;
        let receipts = matching
            .into_iter()
            .skip(start)
            .take(pagination.page_size as usize)
            .collect();
        ReceiptPage {
            receipts,
            pagination,
        }
    }

    // =========================================================================
    // Receipt Numbering
    // =========================================================================

    /// Allocates and persists the next receipt number for a date.
    ///
    /// The allocated sequence is consumed even if the caller discards
    /// it; receipts issued through [`create_receipt`] instead bundle
    /// the allocation into the receipt's own commit.
    ///
    /// [`create_receipt`]: EntityStore::create_receipt
    pub async fn next_receipt_number(&self, date: NaiveDate) -> StoreResult<String> {
        let mut inner = self.inner.write().await;
        let seq = inner.counters.peek_next(date)?;
        self.local
            .commit(WriteBatch::new().put_counter(date, seq))
            .await?;
        inner.counters.commit(date, seq);
        Ok(format_receipt_number(date, seq))
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    /// Sales rollup over the stored receipts. Sync status never gates
    /// inclusion; a pending receipt is already a completed sale.
    pub async fn analytics(&self, range: &DateRange, group_by: GroupBy) -> SalesAnalytics {
        let inner = self.inner.read().await;
        let receipts: Vec<Receipt> = inner.receipts.values().cloned().collect();
        let menus: Vec<Menu> = inner.menus.values().map(|r| r.menu.clone()).collect();
        sales_analytics(&receipts, &menus, range, group_by)
    }

    // =========================================================================
    // Sync Coordinator Interface
    // =========================================================================
    // The operations below are driven by the sync coordinator only.
    // None of them enqueues anything: they record the OUTCOME of a
    // round, they are not local mutations.

    /// Snapshot of all pending change records.
    pub async fn pending_changes(&self) -> Vec<ChangeRecord> {
        let inner = self.inner.read().await;
        inner.queue.drain()
    }

    /// Current metadata record.
    pub async fn metadata(&self) -> LocalMetadata {
        let inner = self.inner.read().await;
        inner.metadata.clone()
    }

    /// Sync bookkeeping for a menu (status and last confirmed sync).
    pub async fn menu_record(&self, id: &str) -> Option<MenuRecord> {
        let inner = self.inner.read().await;
        inner.menus.get(id).cloned()
    }

    /// Adopts a remote menu version as the local canonical copy.
    pub async fn apply_remote_menu(&self, menu: Menu, synced_at: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let old = inner.menus.get(&menu.id).map(|r| r.sync_status);
        let record = MenuRecord::synced(menu, synced_at);
        self.commit_sync_outcome(
            &mut inner,
            StoredEntity::Menu(record),
            old,
            SyncStatus::Synced,
            true,
        )
        .await
    }

    /// Adopts a remote receipt version as the local canonical copy.
    pub async fn apply_remote_receipt(
        &self,
        mut receipt: Receipt,
        synced_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let old = inner.receipts.get(&receipt.id).map(|r| r.sync_status);
        receipt.sync_status = SyncStatus::Synced;
        receipt.synced_at = Some(synced_at);
        self.commit_sync_outcome(
            &mut inner,
            StoredEntity::Receipt(receipt),
            old,
            SyncStatus::Synced,
            true,
        )
        .await
    }

    /// Marks a locally pushed menu as confirmed by the remote store and
    /// acks its change record.
    pub async fn confirm_menu_synced(
        &self,
        id: &str,
        synced_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let mut record = inner
            .menus
            .get(id)
            .ok_or_else(|| StoreError::MenuNotFound(id.to_string()))?
            .clone();
        let old = Some(record.sync_status);
        record.sync_status = SyncStatus::Synced;
        record.synced_at = Some(synced_at);
        self.commit_sync_outcome(
            &mut inner,
            StoredEntity::Menu(record),
            old,
            SyncStatus::Synced,
            true,
        )
        .await
    }

    /// Marks a locally pushed receipt as confirmed by the remote store
    /// and acks its change record.
    pub async fn confirm_receipt_synced(
        &self,
        id: &str,
        synced_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let mut receipt = inner
            .receipts
            .get(id)
            .ok_or_else(|| StoreError::ReceiptNotFound(id.to_string()))?
            .clone();
        let old = Some(receipt.sync_status);
        receipt.sync_status = SyncStatus::Synced;
        receipt.synced_at = Some(synced_at);
        self.commit_sync_outcome(
            &mut inner,
            StoredEntity::Receipt(receipt),
            old,
            SyncStatus::Synced,
            true,
        )
        .await
    }

    /// Records a per-entity sync failure: status becomes `Error`, the
    /// change record stays queued for the next round.
    pub async fn mark_sync_error(&self, entity_type: EntityType, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match entity_type {
            EntityType::Menu => {
                let mut record = inner
                    .menus
                    .get(id)
                    .ok_or_else(|| StoreError::MenuNotFound(id.to_string()))?
                    .clone();
                let old = Some(record.sync_status);
                record.sync_status = SyncStatus::Error;
                self.commit_sync_outcome(
                    &mut inner,
                    StoredEntity::Menu(record),
                    old,
                    SyncStatus::Error,
                    false,
                )
                .await
            }
            EntityType::Receipt => {
                let mut receipt = inner
                    .receipts
                    .get(id)
                    .ok_or_else(|| StoreError::ReceiptNotFound(id.to_string()))?
                    .clone();
                let old = Some(receipt.sync_status);
                receipt.sync_status = SyncStatus::Error;
                self.commit_sync_outcome(
                    &mut inner,
                    StoredEntity::Receipt(receipt),
                    old,
                    SyncStatus::Error,
                    false,
                )
                .await
            }
        }
    }

    /// Advances the sync watermark. Only called after a successful
    /// remote fetch.
    pub async fn set_last_sync_at(&self, at: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let mut metadata = inner.metadata.clone();
        metadata.last_sync_at = Some(at);
        self.local
            .commit(WriteBatch::new().put_metadata(metadata.clone()))
            .await?;
        inner.metadata = metadata;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Commits one local menu mutation: record + change + metadata in a
    /// single batch, then applies to memory.
    async fn commit_menu_mutation(
        &self,
        inner: &mut Inner,
        record: MenuRecord,
        old_status: Option<SyncStatus>,
        op: ChangeOp,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let change = inner.queue.coalesce(ChangeRecord::new(
            op,
            EntityVersion::Menu(record.menu.clone()),
            now,
        ));
        let metadata = inner.metadata_after(old_status, record.sync_status);
        let batch = WriteBatch::new()
            .put_menu(record.clone())
            .put_change(change.clone())
            .put_metadata(metadata.clone());
        self.local.commit(batch).await?;

        inner.menus.insert(record.menu.id.clone(), record);
        inner.queue.enqueue(change);
        inner.metadata = metadata;
        Ok(())
    }

    /// Commits one coordinator-driven status change (entity write +
    /// optional queue ack + metadata), then applies to memory.
    async fn commit_sync_outcome(
        &self,
        inner: &mut Inner,
        entity: StoredEntity,
        old_status: Option<SyncStatus>,
        new_status: SyncStatus,
        ack: bool,
    ) -> StoreResult<()> {
        let metadata = inner.metadata_after(old_status, new_status);
        let (entity_type, entity_id) = match &entity {
            StoredEntity::Menu(record) => (EntityType::Menu, record.menu.id.clone()),
            StoredEntity::Receipt(receipt) => (EntityType::Receipt, receipt.id.clone()),
        };

        let mut batch = WriteBatch::new().put_metadata(metadata.clone());
        batch = match &entity {
            StoredEntity::Menu(record) => batch.put_menu(record.clone()),
            StoredEntity::Receipt(receipt) => batch.put_receipt(receipt.clone()),
        };
        if ack {
            batch = batch.ack_change(entity_type, &entity_id);
        }
        self.local.commit(batch).await?;

        match entity {
            StoredEntity::Menu(record) => {
                inner.menus.insert(record.menu.id.clone(), record);
            }
            StoredEntity::Receipt(receipt) => {
                inner.receipts.insert(receipt.id.clone(), receipt);
            }
        }
        if ack {
            inner.queue.ack(entity_type, &entity_id);
        }
        inner.metadata = metadata;
        Ok(())
    }
}

/// Entity payload of a sync outcome write.
enum StoredEntity {
    Menu(MenuRecord),
    Receipt(Receipt),
}

fn matches_query(receipt: &Receipt, query: &ReceiptQuery) -> bool {
    if let Some(customer) = &query.customer_name {
        if !receipt
            .customer_name
            .to_lowercase()
            .contains(&customer.to_lowercase())
        {
            return false;
        }
    }
    if let Some(staff) = &query.staff_name {
        if !receipt
            .staff_name
            .to_lowercase()
            .contains(&staff.to_lowercase())
        {
            return false;
        }
    }
    if let Some(start) = query.start_date {
        if receipt.service_date < start {
            return false;
        }
    }
    if let Some(end) = query.end_date {
        if receipt.service_date > end {
            return false;
        }
    }
    true
}

// =============================================================================
// Unit Tests
// =============================================================================
