//! Resident complaints.

use super::decode_all;
use crate::error::{CommunityError, Result};
use chrono::{DateTime, Utc};
use communitree_core::document_store::{Document, DocumentStore, Query};
use communitree_core::environment::IdGenerator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Number of complaints returned by [`ComplaintBoard::recent`] by default
pub const DEFAULT_RECENT_COMPLAINTS: usize = 10;

/// A complaint as filed by a resident
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComplaint {
    /// First name
    #[serde(rename = "firstname")]
    pub first_name: String,
    /// Last name
    #[serde(rename = "lastname")]
    pub last_name: String,
    /// Phone number
    pub phone: String,
    /// Email address
    pub email: String,
    /// Short summary
    #[serde(rename = "issuetitle")]
    pub issue_title: String,
    /// Full description
    pub description: String,
    /// Where the issue is
    pub location: String,
    /// Preferred way to be contacted
    pub contact: String,
}

/// A stored complaint
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Complaint {
    /// Document id
    pub id: String,
    /// When it was filed
    pub created_at: DateTime<Utc>,
    /// What was filed
    #[serde(flatten)]
    pub details: NewComplaint,
}

impl TryFrom<&Document> for Complaint {
    type Error = CommunityError;

    fn try_from(document: &Document) -> Result<Self> {
        let details = serde_json::from_value(Value::Object(document.fields.clone())).map_err(
            |e| CommunityError::MalformedRecord {
                id: document.id.clone(),
                reason: e.to_string(),
            },
        )?;
        Ok(Self {
            id: document.id.clone(),
            created_at: document.created_at,
            details,
        })
    }
}

/// Complaint submission and listing
#[derive(Clone)]
pub struct ComplaintBoard {
    store: Arc<dyn DocumentStore>,
    collection: String,
    ids: Arc<dyn IdGenerator>,
}

impl ComplaintBoard {
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

    /// File a complaint
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the write fails.
    pub async fn submit(&self, complaint: NewComplaint) -> Result<Complaint> {
        let fields = super::to_fields(&complaint)?;
        let document = self
            .store
            .create(&self.collection, &self.ids.next_id(), fields)
            .await?;
        tracing::info!(id = %document.id, title = %complaint.issue_title, "Complaint submitted");
        Complaint::try_from(&document)
    }

    /// The most recent complaints, newest first
    ///
    /// `limit` defaults to [`DEFAULT_RECENT_COMPLAINTS`]. Malformed records are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store call fails.
    pub async fn recent(&self, limit: Option<usize>) -> Result<Vec<Complaint>> {
        let query = Query::all()
            .newest_first()
            .limit(limit.unwrap_or(DEFAULT_RECENT_COMPLAINTS));
        let documents = self.store.list(&self.collection, &query).await?;
        Ok(decode_all(&documents))
    }
}
