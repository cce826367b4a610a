//! Service interruption alerts published by administrators.

use super::{decode_all, to_fields};
use crate::error::{CommunityError, Result};
use chrono::{DateTime, Utc};
use communitree_core::document_store::{Document, DocumentStore, Query};
use communitree_core::environment::IdGenerator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Number of alerts returned by [`AlertBoard::latest`] by default
pub const DEFAULT_LATEST_ALERTS: usize = 4;

#[derive(Serialize, Deserialize)]
struct AlertFields {
    #[serde(rename = "id")]
    reference: String,
    #[serde(rename = "alertdescription")]
    description: String,
}

/// A published alert
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InterruptionAlert {
    /// Document id
    pub id: String,
    /// Administrator-chosen reference (e.g. the affected utility or block)
    pub reference: String,
    /// What is interrupted and until when
    pub description: String,
    /// When it was published
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Document> for InterruptionAlert {
    type Error = CommunityError;

    fn try_from(document: &Document) -> Result<Self> {
        let fields: AlertFields = serde_json::from_value(Value::Object(document.fields.clone()))
            .map_err(|e| CommunityError::MalformedRecord {
                id: document.id.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            id: document.id.clone(),
            reference: fields.reference,
            description: fields.description,
            created_at: document.created_at,
        })
    }
}

/// Alert publishing and listing
#[derive(Clone)]
pub struct AlertBoard {
    store: Arc<dyn DocumentStore>,
    collection: String,
    ids: Arc<dyn IdGenerator>,
}

impl AlertBoard {
    /// Create a board over `collection`
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            ids,
        }
    }

    /// Publish an alert
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the write fails.
    pub async fn publish(&self, reference: &str, description: &str) -> Result<InterruptionAlert> {
        let fields = to_fields(&AlertFields {
            reference: reference.to_string(),
            description: description.to_string(),
        })?;
        let document = self
            .store
            .create(&self.collection, &self.ids.next_id(), fields)
            .await?;
        tracing::info!(id = %document.id, reference, "Interruption alert published");
        InterruptionAlert::try_from(&document)
    }

    /// The latest alerts, newest first
    ///
    /// `limit` defaults to [`DEFAULT_LATEST_ALERTS`]. Malformed records are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store call fails.
    pub async fn latest(&self, limit: Option<usize>) -> Result<Vec<InterruptionAlert>> {
        let query = Query::all()
            .newest_first()
            .limit(limit.unwrap_or(DEFAULT_LATEST_ALERTS));
        let documents = self.store.list(&self.collection, &query).await?;
        Ok(decode_all(&documents))
    }
}
