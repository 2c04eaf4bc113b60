//! # Remote Spreadsheet Store
//!
//! The collaborator trait for the shared spreadsheet. The concrete
//! Google Sheets client (auth, ranges, row mapping) lives outside this
//! workspace; the coordinator only needs these three calls.
//!
//! Every method can fail independently and every failure is scoped to
//! the entity (or fetch) it belongs to; the coordinator never lets one
//! bad call abort a round.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use salon_core::{Menu, Receipt};

use crate::error::SyncResult;

/// Remote entities changed since a watermark.
#[derive(Debug, Clone, Default)]
pub struct RemoteChanges {
    pub menus: Vec<Menu>,
    pub receipts: Vec<Receipt>,
}

impl RemoteChanges {
    /// Total changed entities.
    pub fn len(&self) -> usize {
        self.menus.len() + self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty() && self.receipts.is_empty()
    }
}

/// Durable shared store backed by the spreadsheet.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Entities whose remote `updated_at` is after `since`; everything
    /// when `since` is `None` (first sync).
    async fn fetch_changed_since(&self, since: Option<DateTime<Utc>>) -> SyncResult<RemoteChanges>;

    /// Writes one menu row. Idempotent per menu id.
    async fn push_menu(&self, menu: &Menu) -> SyncResult<()>;

    /// Writes one receipt row. Idempotent per receipt id.
    async fn push_receipt(&self, receipt: &Receipt) -> SyncResult<()>;
}
