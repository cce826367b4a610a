//! `NotificationLog`: the notification reducer running in a store.

use super::reducer::{
    NotificationAction, NotificationEnvironment, NotificationReducer, NotificationState,
};
use super::view;
use crate::error::Result;
use crate::types::NotificationRecord;
use communitree_core::local_storage::KeyValueStore;
use communitree_runtime::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

type NotificationStore =
    Store<NotificationState, NotificationAction, NotificationEnvironment, NotificationReducer>;

/// Device-local, persisted notification log
///
/// Each operation waits until the list has been written (or the write has
/// failed) before returning. Operations are applied one at a time, so writes
/// reach storage in the order the mutations were made.
///
/// Storage failures never surface as errors: they are logged, the in-memory
/// list keeps the mutation, and [`Self::last_error`] reports the failure.
#[derive(Clone)]
pub struct NotificationLog {
    store: NotificationStore,
    serial: Arc<Mutex<()>>,
}

impl NotificationLog {
    /// Create an empty log persisting under `key`
    ///
    /// Call [`Self::load`] to read the persisted list.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store: Store::new(
                NotificationState::default(),
                NotificationReducer,
                NotificationEnvironment::new(storage, key),
            ),
            serial: Arc::new(Mutex::new(())),
        }
    }

    async fn apply(&self, action: NotificationAction) -> Result<()> {
        let _serial = self.serial.lock().await;
        let mut handle = self.store.send(action).await?;
        handle.wait().await;
        Ok(())
    }

    /// Replace the in-memory list with the persisted one
    ///
    /// A missing key yields an empty list. An unreadable or undecodable value
    /// leaves the current list in place.
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if the log has been shut down.
    pub async fn load(&self) -> Result<()> {
        self.apply(NotificationAction::Load).await
    }

    /// Add a record and persist
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if the log has been shut down.
    pub async fn append(&self, record: NotificationRecord) -> Result<()> {
        self.apply(NotificationAction::Append { record }).await
    }

    /// Flip the unread flag of record `id` and persist
    ///
    /// Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if the log has been shut down.
    pub async fn toggle_read(&self, id: &str) -> Result<()> {
        self.apply(NotificationAction::ToggleRead { id: id.to_string() })
            .await
    }

    /// Remove record `id` and persist
    ///
    /// Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if the log has been shut down.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.apply(NotificationAction::Delete { id: id.to_string() })
            .await
    }

    /// All records, newest first
    pub async fn list(&self) -> Vec<NotificationRecord> {
        self.store.state(|s| s.records.clone()).await
    }

    /// Records whose type or resource contains `query` (case-insensitive)
    pub async fn search(&self, query: &str) -> Vec<NotificationRecord> {
        self.store
            .state(|s| view::search(&s.records, query))
            .await
    }

    /// Unread records, newest first
    pub async fn unread(&self) -> Vec<NotificationRecord> {
        self.store.state(|s| view::unread(&s.records)).await
    }

    /// The last storage failure, if the most recent storage call failed
    pub async fn last_error(&self) -> Option<String> {
        self.store.state(|s| s.last_error.clone()).await
    }

    /// Stop accepting operations and wait for pending writes
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if pending writes don't finish within `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.store.shutdown(timeout).await?;
        Ok(())
    }
}
