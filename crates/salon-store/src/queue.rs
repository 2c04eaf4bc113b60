//! # Change Queue
//!
//! Ordered record of pending local mutations awaiting synchronization.
//!
//! ## Queue Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Change Queue Rules                            │
//! │                                                                     │
//! │  enqueue:  coalesces per entity. A second mutation to an entity     │
//! │            that is still pending REPLACES the queued payload in     │
//! │            place (last-write-wins locally, pre-sync) instead of     │
//! │            appending a duplicate. The record keeps its original     │
//! │            queue position and enqueue time, so ordering per         │
//! │            entity type stays FIFO.                                  │
//! │                                                                     │
//! │  drain:    returns a SNAPSHOT. Nothing is removed - entries only    │
//! │            leave the queue when the sync coordinator explicitly     │
//! │            acks them per entity, so a partial round loses nothing.  │
//! │                                                                     │
//! │  ack:      removes one entity's record after confirmed success.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A Create stays a Create through coalescing: the remote store has
//! never seen the entity, no matter how often it was edited locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salon_core::{EntityType, EntityVersion};

// =============================================================================
// Change Record
// =============================================================================

/// The kind of mutation a change record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// Entity is new to the remote store.
    Create,
    /// Entity already exists remotely.
    Update,
}

/// One pending local mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub operation: ChangeOp,
    /// Full entity state at the latest local mutation.
    pub payload: EntityVersion,
    /// When the entity was first enqueued (kept across coalescing).
    pub enqueued_at: DateTime<Utc>,
}

impl ChangeRecord {
    /// Builds a record for the given entity payload.
    pub fn new(operation: ChangeOp, payload: EntityVersion, enqueued_at: DateTime<Utc>) -> Self {
        ChangeRecord {
            entity_type: payload.entity_type(),
            entity_id: payload.entity_id().to_string(),
            operation,
            payload,
            enqueued_at,
        }
    }
}

// =============================================================================
// Change Queue
// =============================================================================

/// In-memory view of the persisted change queue.
///
/// The entity store keeps this mirror in sync with the local store:
/// every enqueue and ack rides in the same atomic commit batch as the
/// entity write it belongs to.
#[derive(Debug, Clone, Default)]
pub struct ChangeQueue {
    records: Vec<ChangeRecord>,
}

impl ChangeQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        ChangeQueue::default()
    }

    /// Rebuilds the queue from persisted records (store startup).
    pub fn from_records(records: Vec<ChangeRecord>) -> Self {
        ChangeQueue { records }
    }

    /// Enqueues a mutation, coalescing with an existing record for the
    /// same entity. Returns the record as it now sits in the queue.
    pub fn enqueue(&mut self, record: ChangeRecord) -> ChangeRecord {
        if let Some(existing) = self
            .records
            .iter_mut()
            .find(|r| r.entity_type == record.entity_type && r.entity_id == record.entity_id)
        {
            // A never-synced Create must stay a Create.
            existing.payload = record.payload;
            existing.clone()
        } else {
            self.records.push(record.clone());
            record
        }
    }

    /// The record `enqueue` would store for this mutation, without
    /// mutating the queue.
    ///
    /// The entity store persists exactly this record in the same commit
    /// batch as the entity write, then feeds it back through `enqueue`,
    /// keeping the durable queue and this mirror byte-identical.
    pub fn coalesce(&self, record: ChangeRecord) -> ChangeRecord {
        match self
            .records
            .iter()
            .find(|r| r.entity_type == record.entity_type && r.entity_id == record.entity_id)
        {
            Some(existing) => ChangeRecord {
                payload: record.payload,
                ..existing.clone()
            },
            None => record,
        }
    }

    /// Snapshot of the queue for a sync round. Entries remain queued
    /// until acked individually.
    pub fn drain(&self) -> Vec<ChangeRecord> {
        self.records.clone()
    }

    /// Removes one entity's record after confirmed sync success.
    /// Returns whether a record was removed.
    pub fn ack(&mut self, entity_type: EntityType, entity_id: &str) -> bool {
        let before = self.records.len();
        self.records
            .retain(|r| !(r.entity_type == entity_type && r.entity_id == entity_id));
        self.records.len() != before
    }

    /// Whether the entity has a pending record.
    pub fn contains(&self, entity_type: EntityType, entity_id: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.entity_type == entity_type && r.entity_id == entity_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use salon_core::{Menu, MenuCategory};

    fn menu(id: &str, price: i64) -> Menu {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
        Menu {
            id: id.into(),
            name: "Gel Nail".into(),
            price,
            duration: 60,
            category: MenuCategory::Nail,
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    fn record(op: ChangeOp, menu: Menu) -> ChangeRecord {
        let at = menu.updated_at;
        ChangeRecord::new(op, EntityVersion::Menu(menu), at)
    }

    #[test]
    fn test_enqueue_coalesces_per_entity() {
        let mut queue = ChangeQueue::new();
        queue.enqueue(record(ChangeOp::Create, menu("m-1", 6000)));
        queue.enqueue(record(ChangeOp::Update, menu("m-2", 3000)));
        // Second mutation of m-1 before it synced.
        queue.enqueue(record(ChangeOp::Update, menu("m-1", 6500)));

        let snapshot = queue.drain();
        assert_eq!(snapshot.len(), 2);
        // m-1 keeps its original position and Create operation but
        // carries the latest payload.
        assert_eq!(snapshot[0].entity_id, "m-1");
        assert_eq!(snapshot[0].operation, ChangeOp::Create);
        match &snapshot[0].payload {
            EntityVersion::Menu(m) => assert_eq!(m.price, 6500),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_drain_does_not_remove() {
        let mut queue = ChangeQueue::new();
        queue.enqueue(record(ChangeOp::Create, menu("m-1", 6000)));

        assert_eq!(queue.drain().len(), 1);
        assert_eq!(queue.drain().len(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_ack_removes_one_entity() {
        let mut queue = ChangeQueue::new();
        queue.enqueue(record(ChangeOp::Create, menu("m-1", 6000)));
        queue.enqueue(record(ChangeOp::Create, menu("m-2", 3000)));

        assert!(queue.ack(EntityType::Menu, "m-1"));
        assert!(!queue.ack(EntityType::Menu, "m-1")); // already gone
        assert!(!queue.contains(EntityType::Menu, "m-1"));
        assert!(queue.contains(EntityType::Menu, "m-2"));
    }
}
