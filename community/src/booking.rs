//! Reservation writer: capacity re-check plus atomic guarded append.
//!
//! Booking runs in two steps:
//!
//! 1. The availability query is re-run for the requested day. If the slot is
//!    already full the request fails without attempting a write.
//! 2. The record is written with a guarded create: the store sums the
//!    `reservationCount` of every record sharing the slot and inserts only if
//!    the new total stays within capacity, in one atomic step.
//!
//! Step 2 is what holds the capacity invariant under concurrent bookings. Step 1
//! only avoids a pointless write for the common case.

use crate::availability::AvailabilityQuery;
use crate::error::{CommunityError, Result};
use crate::types::{
    FIELD_RESERVATION_COUNT, ReservationId, ReservationRecord, ReservationRequest,
};
use communitree_core::document_store::{CapacityGuard, DocumentStore, GuardedCreate};
use communitree_core::environment::{Clock, IdGenerator};
use std::sync::Arc;

/// Appends reservation records without ever exceeding slot capacity
#[derive(Clone)]
pub struct ReservationWriter {
    availability: AvailabilityQuery,
    store: Arc<dyn DocumentStore>,
    collection: String,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl ReservationWriter {
    /// Create a writer appending to `collection`
    #[must_use]
    pub fn new(
        availability: AvailabilityQuery,
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            availability,
            store,
            collection: collection.into(),
            clock,
            ids,
        }
    }

    /// Book one place in a slot
    ///
    /// # Errors
    ///
    /// - `InvalidTimeSlot`: the slot is not in the catalog
    /// - `UnknownResourceType`: no capacity configured for the resource
    /// - `SlotUnavailable`: the slot is full (nothing is written)
    /// - `StoreUnavailable`: a store call failed
    #[tracing::instrument(
        skip(self, request),
        fields(
            resource = %request.resource_type,
            date = %request.date,
            slot = %request.time_slot,
        )
    )]
    pub async fn book_slot(&self, request: ReservationRequest) -> Result<ReservationRecord> {
        if !self.availability.catalog().contains(request.time_slot) {
            return Err(CommunityError::InvalidTimeSlot(request.time_slot.to_string()));
        }
        let capacity = self.availability.capacities().capacity(request.resource_type)?;

        let slots = self
            .availability
            .get_availability(request.date, request.resource_type)
            .await?;
        if slots
            .iter()
            .any(|slot| slot.time_slot == request.time_slot && slot.fully_booked)
        {
            tracing::info!(capacity, "Slot already fully booked");
            return Err(Self::unavailable(&request, capacity));
        }

        let guard = CapacityGuard::new(
            ReservationRecord::slot_filter(request.resource_type, request.date, request.time_slot),
            FIELD_RESERVATION_COUNT,
            u64::from(capacity),
        );
        let unavailable = Self::unavailable(&request, capacity);
        let record = ReservationRecord::new(
            ReservationId::new(self.ids.next_id()),
            request,
            self.clock.now(),
        );
        let fields = record.to_fields()?;

        match self
            .store
            .create_guarded(&self.collection, record.id.as_str(), fields, &guard)
            .await?
        {
            GuardedCreate::Created(document) => {
                tracing::info!(id = %record.id, "Reservation created");
                ReservationRecord::from_document(&document)
            },
            GuardedCreate::Rejected { current, limit } => {
                tracing::info!(current, limit, "Slot filled before the write");
                Err(unavailable)
            },
        }
    }

    fn unavailable(request: &ReservationRequest, capacity: u32) -> CommunityError {
        CommunityError::SlotUnavailable {
            resource_type: request.resource_type,
            date: request.date,
            time_slot: request.time_slot,
            capacity,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::capacity::CapacityTable;
    use crate::types::{ReservationDay, Requester, ResourceType, SlotCatalog};
    use communitree_testing::{InMemoryDocumentStore, SequentialIdGenerator, test_clock};

    fn writer(store: &InMemoryDocumentStore) -> ReservationWriter {
        let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let availability = AvailabilityQuery::new(
            Arc::clone(&shared),
            "reservations",
            Arc::new(CapacityTable::standard()),
            Arc::new(SlotCatalog::standard()),
        );
        ReservationWriter::new(
            availability,
            shared,
            "reservations",
            Arc::new(test_clock()),
            Arc::new(SequentialIdGenerator::new("rsv-")),
        )
    }

    fn request(slot: &str) -> ReservationRequest {
        ReservationRequest {
            resource_type: ResourceType::Badminton,
            date: ReservationDay::new(12).unwrap(),
            time_slot: slot.parse().unwrap(),
            requester: Requester::default(),
        }
    }

    #[tokio::test]
    async fn booking_assigns_id_and_single_count() {
        let store = InMemoryDocumentStore::new();
        let record = writer(&store).book_slot(request("09:00-10:00")).await.unwrap();

        assert_eq!(record.id.as_str(), "rsv-1");
        assert_eq!(record.reservation_count, 1);
        assert_eq!(record.created_at, test_clock().now());

        let stored = store.get("reservations", "rsv-1").await.unwrap();
        assert_eq!(ReservationRecord::from_document(&stored).unwrap(), record);
    }

    #[tokio::test]
    async fn slot_outside_catalog_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let result = writer(&store).book_slot(request("06:00-07:00")).await;

        assert!(matches!(result, Err(CommunityError::InvalidTimeSlot(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn store_failure_is_not_retried() {
        let store = InMemoryDocumentStore::new();
        store.set_unavailable(true);
        let result = writer(&store).book_slot(request("09:00-10:00")).await;

        assert!(matches!(result, Err(CommunityError::StoreUnavailable(_))));
        store.set_unavailable(false);
        assert!(store.is_empty("reservations"));
    }
}
