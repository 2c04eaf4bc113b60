//! # Daily Receipt Counters
//!
//! The stateful half of receipt numbering: one monotonically increasing
//! counter per calendar date, persisted alongside the metadata record.
//! The pure `YYYYMMDD-NNNN` formatting lives in salon-core.
//!
//! Allocation is two-phase so it composes with atomic commits: the
//! entity store peeks the next sequence, writes the bumped counter into
//! the same commit batch as the receipt that consumes it, and only
//! advances this in-memory state once the batch landed. A failed commit
//! therefore never burns a number.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use salon_core::{parse_receipt_number, MAX_DAILY_SEQUENCE};

use crate::error::{StoreError, StoreResult};

/// Per-date receipt sequence counters.
#[derive(Debug, Clone, Default)]
pub struct DailyCounters {
    /// Last issued sequence per date.
    issued: BTreeMap<NaiveDate, u32>,
}

impl DailyCounters {
    pub fn new() -> Self {
        DailyCounters::default()
    }

    /// Rebuilds counters from persisted entries (store startup).
    pub fn from_entries(entries: impl IntoIterator<Item = (NaiveDate, u32)>) -> Self {
        DailyCounters {
            issued: entries.into_iter().collect(),
        }
    }

    /// Raises a date's counter to cover an existing receipt number.
    ///
    /// Run over all stored receipts on startup; guards against a stale
    /// persisted counter handing out an already-used sequence.
    pub fn observe_receipt_number(&mut self, receipt_number: &str) {
        if let Some((date, seq)) = parse_receipt_number(receipt_number) {
            let entry = self.issued.entry(date).or_insert(0);
            if *entry < seq {
                *entry = seq;
            }
        }
    }

    /// The next unused sequence for `date`, without consuming it.
    ///
    /// Fails with `SequenceExhausted` once a date has issued 9999
    /// numbers; the caller decides the fallback, nothing is wrapped.
    pub fn peek_next(&self, date: NaiveDate) -> StoreResult<u32> {
        let last = self.issued.get(&date).copied().unwrap_or(0);
        if last >= MAX_DAILY_SEQUENCE {
            return Err(StoreError::SequenceExhausted { date });
        }
        Ok(last + 1)
    }

    /// Records that `seq` for `date` was durably committed.
    pub fn commit(&mut self, date: NaiveDate, seq: u32) {
        let entry = self.issued.entry(date).or_insert(0);
        if *entry < seq {
            *entry = seq;
        }
    }

    /// Last issued sequence for a date (0 when none).
    pub fn last_issued(&self, date: NaiveDate) -> u32 {
        self.issued.get(&date).copied().unwrap_or(0)
    }

    /// All counter entries, for persistence snapshots.
    pub fn entries(&self) -> impl Iterator<Item = (NaiveDate, u32)> + '_ {
        self.issued.iter().map(|(&date, &seq)| (date, seq))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
