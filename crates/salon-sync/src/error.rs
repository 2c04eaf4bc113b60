//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Sync Error Handling                            │
//! │                                                                     │
//! │  Remote failures (unavailable, timeout, rejected)                   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SyncError (this module)                                            │
//! │       │                                                             │
//! │       ▼ to_failure(entity_type, entity_id)                          │
//! │  SyncFailure wire record, collected into the round's report.        │
//! │  The entity stays queued and retries next round; the round keeps    │
//! │  processing everything else. Nothing here ever aborts a round.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use salon_core::{EntityType, SyncFailure};
use salon_store::StoreError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering remote, local and configuration failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// Could not reach the remote spreadsheet store.
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// A remote call exceeded the configured bound.
    #[error("remote call timed out after {0} seconds")]
    Timeout(u64),

    /// The remote store refused the entity (remote-side validation,
    /// auth, quota).
    #[error("remote store rejected the entity: {0}")]
    RemoteRejected(String),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// The local store failed while recording a round outcome.
    #[error(transparent)]
    Store(#[from] StoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load the config file.
    #[error("failed to load sync config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save the config file.
    #[error("failed to save sync config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// A control channel closed unexpectedly.
    #[error("channel error: {0}")]
    Channel(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Categorization
// =============================================================================

impl SyncError {
    /// Machine-readable code carried in per-entity failure records.
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::RemoteUnavailable(_) => "remote_unavailable",
            SyncError::Timeout(_) => "timeout",
            SyncError::RemoteRejected(_) => "remote_rejected",
            SyncError::Store(_) => "local_store",
            SyncError::InvalidConfig(_) => "invalid_config",
            SyncError::ConfigLoadFailed(_) => "config_load",
            SyncError::ConfigSaveFailed(_) => "config_save",
            SyncError::Channel(_) => "channel",
        }
    }

    /// True when the next round may simply retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteUnavailable(_) | SyncError::Timeout(_) | SyncError::Store(_)
        )
    }

    /// Converts into the per-entity wire record for the round report.
    pub fn to_failure(&self, entity_type: EntityType, entity_id: &str) -> SyncFailure {
        SyncFailure {
            entity_type,
            entity_id: entity_id.to_string(),
            error_code: self.code().to_string(),
            error_message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SyncError::RemoteUnavailable("offline".into()).is_retryable());
        assert!(SyncError::Timeout(10).is_retryable());
        assert!(!SyncError::RemoteRejected("bad row".into()).is_retryable());
        assert!(!SyncError::InvalidConfig("no spreadsheet id".into()).is_retryable());
    }

    #[test]
    fn test_to_failure_carries_code_and_entity() {
        let failure =
            SyncError::Timeout(10).to_failure(EntityType::Receipt, "r-1");
        assert_eq!(failure.entity_type, EntityType::Receipt);
        assert_eq!(failure.entity_id, "r-1");
        assert_eq!(failure.error_code, "timeout");
        assert!(failure.error_message.contains("10 seconds"));
    }
}
