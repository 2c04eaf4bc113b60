//! # Sync Coordinator
//!
//! Orchestrates one synchronization round between the local entity
//! store and the remote spreadsheet store.
//!
//! ## Round Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        One Sync Round                               │
//! │                                                                     │
//! │  trigger_sync()                                                     │
//! │       │  (single-flight: a concurrent trigger waits for THIS        │
//! │       │   round's report instead of starting another)               │
//! │       ▼                                                             │
//! │  state: idle ──► syncing                                            │
//! │       │                                                             │
//! │  1. FETCH   remote changes since lastSyncAt (bounded timeout)       │
//! │  2. DRAIN   the change queue snapshot                               │
//! │  3. MATCH   per entity id:                                          │
//! │       ├── pending only          ──► push (fast path)                │
//! │       ├── remote only           ──► apply locally (fast path)       │
//! │       └── both                  ──► conflict resolver               │
//! │  4. APPLY   winners locally; push local/merged winners remotely     │
//! │  5. SETTLE  per entity: synced + ack, or SyncError + keep queued    │
//! │  6. WATERMARK  lastSyncAt = round start, only if step 1 succeeded   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  state: idle (clean) / error (any entity failed)                    │
//! │  returns SyncReport { syncedAt, syncedReceipts, syncedMenus,        │
//! │                       conflicts, errors }                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure is entity-scoped: a timed-out push flags that entity
//! and the round keeps processing the rest. A round always terminates
//! in `idle` or `error`, never stays `syncing`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use salon_core::{
    resolve_menu, resolve_receipt, EntityType, EntityVersion, Menu, Receipt, Resolution,
    SyncReport,
};
use salon_store::EntityStore;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteChanges, RemoteStore};

// =============================================================================
// Sync State
// =============================================================================

/// Coordinator state machine: `idle → syncing → {idle, error}`.
///
/// `error` is recoverable; the next trigger moves back to `syncing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No round in progress; the previous round (if any) was clean.
    #[default]
    Idle,
    /// A round is executing right now.
    Syncing,
    /// The previous round finished with at least one failure.
    Error,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Idle => write!(f, "idle"),
            SyncState::Syncing => write!(f, "syncing"),
            SyncState::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Sync Coordinator
// =============================================================================

/// Drives sync rounds against the remote store.
pub struct SyncCoordinator {
    /// Local entity store (canonical local copies + change queue).
    store: Arc<EntityStore>,

    /// Remote spreadsheet collaborator.
    remote: Arc<dyn RemoteStore>,

    /// Bound applied to every individual remote call.
    remote_timeout: Duration,

    /// Current state, for UI badges.
    state: RwLock<SyncState>,

    /// Round guard: holding this lock IS being the in-flight round.
    round: Mutex<()>,

    /// Publishes each finished round's report to coalesced triggers.
    report_tx: watch::Sender<Option<SyncReport>>,
}

impl SyncCoordinator {
    /// Creates a coordinator over the given store and remote.
    pub fn new(store: Arc<EntityStore>, remote: Arc<dyn RemoteStore>, config: &SyncConfig) -> Self {
        let (report_tx, _) = watch::channel(None);
        SyncCoordinator {
            store,
            remote,
            remote_timeout: config.remote_timeout(),
            state: RwLock::new(SyncState::Idle),
            round: Mutex::new(()),
            report_tx,
        }
    }

    /// Current coordinator state.
    pub async fn state(&self) -> SyncState {
        *self.state.read().await
    }

    /// Report of the most recently finished round, if any.
    pub fn last_report(&self) -> Option<SyncReport> {
        self.report_tx.borrow().clone()
    }

    /// Runs a sync round, or joins the one already in flight.
    ///
    /// Single-flight discipline: at most one round executes per
    /// process. A trigger that arrives while a round is running does
    /// not start a second round; it waits for the in-flight round and
    /// returns that round's report.
    pub async fn trigger_sync(&self) -> SyncReport {
        // Subscribe before trying the lock so a round finishing between
        // the failed try_lock and the wait still wakes us.
        let mut report_rx = self.report_tx.subscribe();

        match self.round.try_lock() {
            Ok(_guard) => {
                let report = self.run_round().await;
                self.report_tx.send_replace(Some(report.clone()));
                report
            }
            Err(_) => {
                debug!("Sync already in flight; waiting for its report");
                loop {
                    if report_rx.changed().await.is_err() {
                        // Sender lives as long as self; unreachable in
                        // practice, but never hang a caller.
                        return SyncReport::new(Utc::now());
                    }
                    if let Some(report) = report_rx.borrow_and_update().clone() {
                        return report;
                    }
                }
            }
        }
    }

    // =========================================================================
    // Round Execution
    // =========================================================================

    async fn run_round(&self) -> SyncReport {
        let started_at = Utc::now();
        *self.state.write().await = SyncState::Syncing;
        info!("Sync round started");

        let mut report = SyncReport::new(started_at);
        let watermark = self.store.metadata().await.last_sync_at;

        // Step 1: pull remote changes since the watermark. A failed
        // fetch does not abort the round - local pending entities can
        // still push - but it taints it and freezes the watermark.
        let (remote_changes, fetch_ok) = match self
            .bounded(self.remote.fetch_changed_since(watermark))
            .await
        {
            Ok(changes) => (changes, true),
            Err(e) => {
                warn!(error = %e, "Remote fetch failed; pushing local changes only");
                (RemoteChanges::default(), false)
            }
        };

        let mut remote_menus: HashMap<String, Menu> = remote_changes
            .menus
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();
        let mut remote_receipts: HashMap<String, Receipt> = remote_changes
            .receipts
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        // Step 2: drain the pending local changes (snapshot; entries
        // are only removed per entity on confirmed success).
        let pending = self.store.pending_changes().await;
        debug!(
            pending = pending.len(),
            remote_menus = remote_menus.len(),
            remote_receipts = remote_receipts.len(),
            "Reconciling"
        );

        // Step 3: entities on both sides go through the resolver;
        // entities on one side take the fast path. Removing matched
        // ids leaves the pull-only remainder in the maps.
        for change in pending {
            match change.payload {
                EntityVersion::Menu(local) => {
                    let remote = remote_menus.remove(&local.id);
                    self.sync_menu(local, remote, &mut report).await;
                }
                EntityVersion::Receipt(local) => {
                    let remote = remote_receipts.remove(&local.id);
                    self.sync_receipt(local, remote, &mut report).await;
                }
            }
        }

        for menu in remote_menus.into_values() {
            let id = menu.id.clone();
            match self.store.apply_remote_menu(menu, started_at).await {
                Ok(()) => report.synced_menus.push(id),
                Err(e) => {
                    let err = SyncError::from(e);
                    error!(id = %id, error = %err, "Failed to apply remote menu");
                    report.errors.push(err.to_failure(EntityType::Menu, &id));
                }
            }
        }
        for receipt in remote_receipts.into_values() {
            let id = receipt.id.clone();
            match self.store.apply_remote_receipt(receipt, started_at).await {
                Ok(()) => report.synced_receipts.push(id),
                Err(e) => {
                    let err = SyncError::from(e);
                    error!(id = %id, error = %err, "Failed to apply remote receipt");
                    report.errors.push(err.to_failure(EntityType::Receipt, &id));
                }
            }
        }

        // Step 4: advance the watermark only when the fetch succeeded;
        // a frozen watermark re-fetches the missed window next round.
        let mut watermark_ok = true;
        if fetch_ok {
            if let Err(e) = self.store.set_last_sync_at(started_at).await {
                error!(error = %e, "Failed to advance sync watermark");
                watermark_ok = false;
            }
        }

        // Step 5: terminal state. Never stays `syncing`.
        let clean = report.is_clean() && fetch_ok && watermark_ok;
        *self.state.write().await = if clean {
            SyncState::Idle
        } else {
            SyncState::Error
        };

        info!(
            synced_menus = report.synced_menus.len(),
            synced_receipts = report.synced_receipts.len(),
            conflicts = report.conflicts.len(),
            errors = report.errors.len(),
            clean,
            "Sync round finished"
        );
        report
    }

    // =========================================================================
    // Per-Entity Handling
    // =========================================================================

    async fn sync_menu(&self, local: Menu, remote: Option<Menu>, report: &mut SyncReport) {
        let id = local.id.clone();

        let winner = match remote {
            // Push-only fast path: remote has no version of this menu.
            None => local,
            Some(remote) => {
                let last_synced_at = self
                    .store
                    .menu_record(&id)
                    .await
                    .and_then(|r| r.synced_at);
                let resolved = resolve_menu(&local, Some(&remote), last_synced_at);
                if let Some(conflict) = &resolved.conflict {
                    info!(id = %id, resolution = ?conflict.resolution, "Menu conflict");
                    report.conflicts.push(conflict.clone());
                }

                match resolved.resolution {
                    Resolution::Remote => {
                        match self.store.apply_remote_menu(resolved.winner, report.synced_at).await
                        {
                            Ok(()) => report.synced_menus.push(id),
                            Err(e) => {
                                self.flag_failure(EntityType::Menu, &id, SyncError::from(e), report)
                                    .await
                            }
                        }
                        return;
                    }
                    // Menus never merge; Local falls through to push.
                    Resolution::Local | Resolution::Merged => resolved.winner,
                }
            }
        };

        match self.bounded(self.remote.push_menu(&winner)).await {
            Ok(()) => match self.store.confirm_menu_synced(&id, report.synced_at).await {
                Ok(()) => report.synced_menus.push(id),
                Err(e) => {
                    self.flag_failure(EntityType::Menu, &id, SyncError::from(e), report)
                        .await
                }
            },
            Err(e) => self.flag_failure(EntityType::Menu, &id, e, report).await,
        }
    }

    async fn sync_receipt(&self, local: Receipt, remote: Option<Receipt>, report: &mut SyncReport) {
        let id = local.id.clone();

        let winner = match remote {
            // Push-only fast path: remote has no version of this receipt.
            None => local,
            Some(remote) => {
                let last_synced_at = local.synced_at;
                let resolved = resolve_receipt(&local, Some(&remote), last_synced_at);
                if let Some(conflict) = &resolved.conflict {
                    info!(id = %id, resolution = ?conflict.resolution, "Receipt conflict");
                    report.conflicts.push(conflict.clone());
                }

                match resolved.resolution {
                    Resolution::Remote => {
                        match self
                            .store
                            .apply_remote_receipt(resolved.winner, report.synced_at)
                            .await
                        {
                            Ok(()) => report.synced_receipts.push(id),
                            Err(e) => {
                                self.flag_failure(
                                    EntityType::Receipt,
                                    &id,
                                    SyncError::from(e),
                                    report,
                                )
                                .await
                            }
                        }
                        return;
                    }
                    Resolution::Local => resolved.winner,
                    Resolution::Merged => {
                        // The merge is a new local state: store it (and
                        // its queued payload) before pushing, so a
                        // failed push retries the MERGED receipt.
                        match self.store.upsert_receipt(resolved.winner).await {
                            Ok(stored) => stored,
                            Err(e) => {
                                self.flag_failure(
                                    EntityType::Receipt,
                                    &id,
                                    SyncError::from(e),
                                    report,
                                )
                                .await;
                                return;
                            }
                        }
                    }
                }
            }
        };

        match self.bounded(self.remote.push_receipt(&winner)).await {
            Ok(()) => match self
                .store
                .confirm_receipt_synced(&id, report.synced_at)
                .await
            {
                Ok(()) => report.synced_receipts.push(id),
                Err(e) => {
                    self.flag_failure(EntityType::Receipt, &id, SyncError::from(e), report)
                        .await
                }
            },
            Err(e) => self.flag_failure(EntityType::Receipt, &id, e, report).await,
        }
    }

    // =========================================================================
    // Periodic Trigger
    // =========================================================================

    /// Spawns a background task that triggers a round every `interval`
    /// (use [`SyncConfig::sync_interval`] for the configured cadence).
    ///
    /// Single-flight still holds: if a manual trigger is mid-round when
    /// the tick fires, the tick joins that round instead of stacking.
    ///
    /// [`SyncConfig::sync_interval`]: crate::config::SyncConfig::sync_interval
    pub fn start_periodic(self: &Arc<Self>, interval: Duration) -> PeriodicSyncHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let coordinator = Arc::clone(self);

        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Periodic sync started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so the
            // first round fires one full interval after startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = coordinator.trigger_sync().await;
                        debug!(
                            errors = report.errors.len(),
                            "Periodic sync round done"
                        );
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Periodic sync stopping");
                        break;
                    }
                }
            }
        });

        PeriodicSyncHandle { shutdown_tx }
    }

    /// Records a per-entity failure: entity flagged `error`, change
    /// record left queued for the next round, failure added to the
    /// report. The round keeps going.
    async fn flag_failure(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        err: SyncError,
        report: &mut SyncReport,
    ) {
        warn!(
            entity_type = %entity_type,
            entity_id = %entity_id,
            error = %err,
            retryable = err.is_retryable(),
            "Entity failed to sync"
        );
        report.errors.push(err.to_failure(entity_type, entity_id));

        if let Err(e) = self.store.mark_sync_error(entity_type, entity_id).await {
            // A pull-only apply failure has no local entity to flag.
            debug!(entity_id = %entity_id, error = %e, "Could not flag entity locally");
        }
    }

    /// Applies the configured bound to one remote call.
    async fn bounded<T>(&self, call: impl Future<Output = SyncResult<T>>) -> SyncResult<T> {
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(self.remote_timeout.as_secs())),
        }
    }
}

// =============================================================================
// Periodic Sync Handle
// =============================================================================

/// Controls a periodic sync loop started with
/// [`SyncCoordinator::start_periodic`].
pub struct PeriodicSyncHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl PeriodicSyncHandle {
    /// Stops the periodic loop. A round already in flight finishes.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::Channel("periodic sync loop already stopped".into()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_state_display() {
        assert_eq!(SyncState::Idle.to_string(), "idle");
        assert_eq!(SyncState::Syncing.to_string(), "syncing");
        assert_eq!(SyncState::Error.to_string(), "error");
    }

    #[test]
    fn test_initial_state_is_idle() {
        assert_eq!(SyncState::default(), SyncState::Idle);
    }
}
