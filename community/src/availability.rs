//! Availability query: per-slot booking counts for one resource on one day.

use crate::capacity::CapacityTable;
use crate::error::Result;
use crate::types::{
    ReservationDay, ReservationRecord, ResourceType, SlotAvailability, SlotCatalog, TimeSlot,
};
use communitree_core::document_store::{Document, DocumentStore, Query};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The part of a reservation document the aggregation reads
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotShare {
    time_slot: TimeSlot,
    reservation_count: u32,
}

impl SlotShare {
    fn decode(document: &Document) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(document.fields.clone()))
    }
}

/// Read-only view over the reservation collection
#[derive(Clone)]
pub struct AvailabilityQuery {
    store: Arc<dyn DocumentStore>,
    collection: String,
    capacities: Arc<CapacityTable>,
    catalog: Arc<SlotCatalog>,
}

impl AvailabilityQuery {
    /// Create a query over `collection`
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        capacities: Arc<CapacityTable>,
        catalog: Arc<SlotCatalog>,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            capacities,
            catalog,
        }
    }

    /// The capacity table in use
    #[must_use]
    pub fn capacities(&self) -> &CapacityTable {
        &self.capacities
    }

    /// The slot catalog in use
    #[must_use]
    pub fn catalog(&self) -> &SlotCatalog {
        &self.catalog
    }

    /// Booking state of every catalog slot, in catalog order
    ///
    /// Records that can't be decoded are skipped with a warning.
    ///
    /// # Errors
    ///
    /// - `UnknownResourceType`: no capacity configured for `resource_type`
    /// - `StoreUnavailable`: the store call failed
    pub async fn get_availability(
        &self,
        date: ReservationDay,
        resource_type: ResourceType,
    ) -> Result<Vec<SlotAvailability>> {
        let capacity = self.capacities.capacity(resource_type)?;

        let query = Query::filtered(ReservationRecord::day_filter(resource_type, date));
        let documents = self.store.list(&self.collection, &query).await?;

        let mut counts: HashMap<TimeSlot, u32> = HashMap::new();
        for document in &documents {
            match SlotShare::decode(document) {
                Ok(share) => {
                    let count = counts.entry(share.time_slot).or_default();
                    *count = count.saturating_add(share.reservation_count);
                },
                Err(error) => {
                    tracing::warn!(
                        id = %document.id,
                        %error,
                        "Skipping malformed reservation record"
                    );
                },
            }
        }

        tracing::debug!(
            resource = %resource_type,
            %date,
            records = documents.len(),
            "Aggregated reservations"
        );

        Ok(self
            .catalog
            .slots()
            .iter()
            .map(|&time_slot| {
                let count = counts.get(&time_slot).copied().unwrap_or(0);
                SlotAvailability {
                    time_slot,
                    count,
                    fully_booked: count >= capacity,
                }
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::error::CommunityError;
    use communitree_core::document_store::Fields;
    use communitree_testing::InMemoryDocumentStore;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    fn query(store: &InMemoryDocumentStore) -> AvailabilityQuery {
        AvailabilityQuery::new(
            Arc::new(store.clone()),
            "reservations",
            Arc::new(CapacityTable::standard()),
            Arc::new(SlotCatalog::standard()),
        )
    }

    #[tokio::test]
    async fn empty_collection_reports_every_slot_free() {
        let store = InMemoryDocumentStore::new();
        let slots = query(&store)
            .get_availability(ReservationDay::new(12).unwrap(), ResourceType::Gym)
            .await
            .unwrap();

        assert_eq!(slots.len(), 12);
        assert!(slots.iter().all(|s| s.count == 0 && !s.fully_booked));
    }

    #[tokio::test]
    async fn malformed_records_are_skipped() {
        let store = InMemoryDocumentStore::new();
        let day = json!({"resourceType": "Badminton", "date": 12});
        let mut good = fields(day.clone());
        good.extend(fields(json!({"timeSlot": "09:00-10:00", "reservationCount": 1})));
        let mut bad_slot = fields(day.clone());
        bad_slot.extend(fields(json!({"timeSlot": "morning", "reservationCount": 1})));
        let mut no_count = fields(day);
        no_count.extend(fields(json!({"timeSlot": "09:00-10:00"})));

        store.insert_raw("reservations", "good", good);
        store.insert_raw("reservations", "bad-slot", bad_slot);
        store.insert_raw("reservations", "no-count", no_count);

        let slots = query(&store)
            .get_availability(ReservationDay::new(12).unwrap(), ResourceType::Badminton)
            .await
            .unwrap();

        let nine = slots
            .iter()
            .find(|s| s.time_slot.to_string() == "09:00-10:00")
            .unwrap();
        assert_eq!(nine.count, 1);
        assert!(!nine.fully_booked);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_unavailable() {
        let store = InMemoryDocumentStore::new();
        store.set_unavailable(true);

        let result = query(&store)
            .get_availability(ReservationDay::new(1).unwrap(), ResourceType::Swimming)
            .await;
        assert!(matches!(result, Err(CommunityError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn resource_without_capacity_is_rejected_before_querying() {
        let store = InMemoryDocumentStore::new();
        store.set_unavailable(true);
        let query = AvailabilityQuery::new(
            Arc::new(store.clone()),
            "reservations",
            Arc::new(CapacityTable::from_entries([(ResourceType::Gym, 20)])),
            Arc::new(SlotCatalog::standard()),
        );

        let result = query
            .get_availability(ReservationDay::new(1).unwrap(), ResourceType::TableTennis)
            .await;
        assert_eq!(
            result,
            Err(CommunityError::UnknownResourceType("Table Tennis".to_string()))
        );
    }
}
