//! Error type for CommuniTree services.

use crate::types::{ReservationDay, ResourceType, TimeSlot};
use communitree_core::document_store::DocumentStoreError;
use communitree_core::local_storage::LocalStorageError;
use communitree_runtime::StoreError;
use thiserror::Error;

/// Errors returned by the CommuniTree services
///
/// Every failure is returned as a value; nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommunityError {
    /// The slot's capacity is already used up.
    ///
    /// Recoverable: re-query availability and pick another slot.
    #[error("{resource_type} on day {date} at {time_slot} is fully booked (capacity {capacity})")]
    SlotUnavailable {
        /// Requested amenity
        resource_type: ResourceType,
        /// Requested day
        date: ReservationDay,
        /// Requested slot
        time_slot: TimeSlot,
        /// Configured capacity of the slot
        capacity: u32,
    },

    /// The resource type is not known or has no configured capacity.
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    /// The document store or local storage call failed.
    ///
    /// Recoverable by calling again.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored record lacks expected fields.
    #[error("Malformed record {id}: {reason}")]
    MalformedRecord {
        /// Document id (empty if unknown)
        id: String,
        /// What was wrong
        reason: String,
    },

    /// The day is not a valid day of month.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The time slot is malformed or not offered.
    #[error("Invalid time slot: {0}")]
    InvalidTimeSlot(String),

    /// A board record does not exist.
    #[error("Not found: {collection}/{id}")]
    NotFound {
        /// Collection searched
        collection: String,
        /// Requested id
        id: String,
    },

    /// The notification log runtime refused the action (shut down).
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<DocumentStoreError> for CommunityError {
    fn from(error: DocumentStoreError) -> Self {
        match error {
            DocumentStoreError::NotFound { collection, id } => Self::NotFound { collection, id },
            DocumentStoreError::Serialization(reason) => Self::MalformedRecord {
                id: String::new(),
                reason,
            },
            other @ (DocumentStoreError::Unavailable(_)
            | DocumentStoreError::AlreadyExists { .. }) => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<LocalStorageError> for CommunityError {
    fn from(error: LocalStorageError) -> Self {
        Self::StoreUnavailable(error.to_string())
    }
}

impl From<StoreError> for CommunityError {
    fn from(error: StoreError) -> Self {
        Self::Runtime(error.to_string())
    }
}

/// Result alias for CommuniTree services
pub type Result<T> = std::result::Result<T, CommunityError>;
