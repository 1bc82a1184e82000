//! Snapshot persistence under a single fixed key.

use std::sync::Arc;

use smartcal_core::{StorageError, WritePolicy};

use crate::kv::KeyValueStore;
use crate::mapper::StoredSnapshot;

/// Reads and writes the serialized calendar under one key.
#[derive(Clone)]
pub struct SnapshotStorage {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    policy: WritePolicy,
}

impl SnapshotStorage {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>, policy: WritePolicy) -> Self {
        Self {
            backend,
            key: key.into(),
            policy,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    fn backup_key(&self) -> String {
        format!("{}.corrupt", self.key)
    }

    /// Write the snapshot.
    ///
    /// # Errors
    /// With `WritePolicy::Strict`, serialization and backend failures are
    /// returned. With `WritePolicy::BestEffort` they are logged and `Ok(())`
    /// is returned.
    pub fn save(&self, snapshot: &StoredSnapshot) -> Result<(), StorageError> {
        let result = serde_json::to_string(snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))
            .and_then(|json| self.backend.set(&self.key, &json));

        match (result, self.policy) {
            (Ok(()), _) => {
                tracing::debug!(
                    "Saved calendar snapshot ({} reminders)",
                    snapshot.reminders.len()
                );
                Ok(())
            }
            (Err(e), WritePolicy::BestEffort) => {
                tracing::warn!("Error saving calendar snapshot (ignored): {}", e);
                Ok(())
            }
            (Err(e), WritePolicy::Strict) => {
                tracing::error!("Error saving calendar snapshot: {}", e);
                Err(e)
            }
        }
    }

    /// Read the snapshot.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    ///
    /// # Errors
    /// Returns `StorageError::Decode` for content that is not a snapshot, and
    /// backend errors as-is.
    pub fn load(&self) -> Result<Option<StoredSnapshot>, StorageError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(None);
        };

        let snapshot = serde_json::from_str(&raw)?;
        Ok(Some(snapshot))
    }

    /// Remove the stored snapshot.
    ///
    /// # Errors
    /// Returns backend errors.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove(&self.key)
    }

    /// Whether a snapshot is stored. Backend failures count as "no".
    pub fn exists(&self) -> bool {
        match self.backend.contains(&self.key) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Error checking for stored calendar: {}", e);
                false
            }
        }
    }

    /// Copy the raw stored value to `<key>.corrupt`.
    ///
    /// Returns the backup key when something was copied.
    ///
    /// # Errors
    /// Returns backend errors.
    pub fn backup_corrupt(&self) -> Result<Option<String>, StorageError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(None);
        };
        let backup_key = self.backup_key();
        self.backend.set(&backup_key, &raw)?;
        tracing::warn!("Backed up unreadable calendar data to {}", backup_key);
        Ok(Some(backup_key))
    }
}

impl std::fmt::Debug for SnapshotStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStorage")
            .field("key", &self.key)
            .field("policy", &self.policy)
            .finish()
    }
}
