//! Community board: complaints, interruption alerts and events.
//!
//! Thin document-store CRUD. Each board owns one collection.

pub mod alerts;
pub mod complaints;
pub mod events;

pub use alerts::{AlertBoard, InterruptionAlert};
pub use complaints::{Complaint, ComplaintBoard, NewComplaint};
pub use events::{CommunityEvent, EventBoard, NewCommunityEvent, Rsvp};

use crate::error::{CommunityError, Result};
use communitree_core::document_store::{Document, Fields};
use serde::Serialize;
use serde_json::Value;

fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(CommunityError::MalformedRecord {
            id: String::new(),
            reason: "record did not encode to an object".to_string(),
        }),
        Err(e) => Err(CommunityError::MalformedRecord {
            id: String::new(),
            reason: e.to_string(),
        }),
    }
}

/// Decode every document, skipping (and logging) the ones that don't fit
fn decode_all<T>(documents: &[Document]) -> Vec<T>
where
    T: for<'a> TryFrom<&'a Document, Error = CommunityError>,
{
    documents
        .iter()
        .filter_map(|document| match T::try_from(document) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(id = %document.id, %error, "Skipping malformed record");
                None
            },
        })
        .collect()
}
