//! Community events and RSVP counters.

use super::{decode_all, to_fields};
use crate::error::{CommunityError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use communitree_core::document_store::{Document, DocumentStore, Fields, Query};
use communitree_core::environment::IdGenerator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const FIELD_ACCEPT_COUNT: &str = "acceptCount";
const FIELD_DECLINE_COUNT: &str = "declineCount";

/// An event as entered by an organiser
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommunityEvent {
    /// Event title
    pub title: String,
    /// Where it takes place
    pub venue: String,
    /// Organiser contact
    pub contact_information: String,
    /// Day of the event
    pub date: NaiveDate,
    /// Start time
    pub from_time: NaiveTime,
    /// End time
    pub to_time: NaiveTime,
    /// Details
    pub description: String,
}

/// A stored event with its RSVP tallies
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityEvent {
    /// Document id
    #[serde(skip)]
    pub id: String,
    /// What was entered
    #[serde(flatten)]
    pub details: NewCommunityEvent,
    /// Residents attending
    #[serde(default)]
    pub accept_count: u32,
    /// Residents not attending
    #[serde(default)]
    pub decline_count: u32,
    /// When it was created
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Document> for CommunityEvent {
    type Error = CommunityError;

    fn try_from(document: &Document) -> Result<Self> {
        let mut event: Self = serde_json::from_value(Value::Object(document.fields.clone()))
            .map_err(|e| CommunityError::MalformedRecord {
                id: document.id.clone(),
                reason: e.to_string(),
            })?;
        event.id.clone_from(&document.id);
        event.created_at = document.created_at;
        Ok(event)
    }
}

/// A resident's answer to an event invitation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rsvp {
    /// Attending
    Accept,
    /// Not attending
    Decline,
}

/// Event creation, lookup and RSVP
#[derive(Clone)]
pub struct EventBoard {
    store: Arc<dyn DocumentStore>,
    collection: String,
    ids: Arc<dyn IdGenerator>,
}

impl EventBoard {
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

    /// Create an event with zeroed RSVP counters
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the write fails.
    pub async fn create(&self, event: NewCommunityEvent) -> Result<CommunityEvent> {
        let mut fields = to_fields(&event)?;
        fields.insert(FIELD_ACCEPT_COUNT.to_string(), Value::from(0));
        fields.insert(FIELD_DECLINE_COUNT.to_string(), Value::from(0));

        let document = self
            .store
            .create(&self.collection, &self.ids.next_id(), fields)
            .await?;
        tracing::info!(id = %document.id, title = %event.title, "Community event created");
        CommunityEvent::try_from(&document)
    }

    /// Fetch one event
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `MalformedRecord`: the stored event can't be decoded
    /// - `StoreUnavailable`: the store call failed
    pub async fn get(&self, id: &str) -> Result<CommunityEvent> {
        let document = self.store.get(&self.collection, id).await?;
        CommunityEvent::try_from(&document)
    }

    /// All events, ordered by event date then start time
    ///
    /// Malformed records are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store call fails.
    pub async fn list(&self) -> Result<Vec<CommunityEvent>> {
        let documents = self.store.list(&self.collection, &Query::all()).await?;
        let mut events: Vec<CommunityEvent> = decode_all(&documents);
        events.sort_by_key(|e| (e.details.date, e.details.from_time));
        Ok(events)
    }

    /// Record an RSVP by incrementing the matching counter
    ///
    /// The counter is read then written back. Concurrent RSVPs to the same
    /// event can lose an increment.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `StoreUnavailable`: a store call failed
    pub async fn rsvp(&self, id: &str, answer: Rsvp) -> Result<CommunityEvent> {
        let current = self.get(id).await?;
        let (field, value) = match answer {
            Rsvp::Accept => (FIELD_ACCEPT_COUNT, current.accept_count.saturating_add(1)),
            Rsvp::Decline => (FIELD_DECLINE_COUNT, current.decline_count.saturating_add(1)),
        };

        let mut patch = Fields::new();
        patch.insert(field.to_string(), Value::from(value));
        let document = self.store.update(&self.collection, id, patch).await?;
        tracing::debug!(%id, ?answer, "RSVP recorded");
        CommunityEvent::try_from(&document)
    }
}
