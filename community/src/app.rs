//! Application facade - wires every service from one [`Config`].

use crate::availability::AvailabilityQuery;
use crate::board::{
    AlertBoard, Complaint, ComplaintBoard, CommunityEvent, EventBoard, InterruptionAlert,
    NewCommunityEvent, NewComplaint, Rsvp,
};
use crate::booking::ReservationWriter;
use crate::capacity::CapacityTable;
use crate::config::Config;
use crate::error::Result;
use crate::notifications::NotificationLog;
use crate::storage::FileKeyValueStore;
use crate::types::{
    NotificationRecord, Requester, ReservationDay, ReservationRecord, ReservationRequest,
    ResourceType, SlotAvailability, SlotCatalog, TimeSlot,
};
use communitree_core::document_store::DocumentStore;
use communitree_core::environment::{Clock, IdGenerator, SystemClock, UuidGenerator};
use communitree_core::local_storage::KeyValueStore;
use communitree_postgres::PostgresDocumentStore;
use communitree_testing::InMemoryDocumentStore;
use std::sync::Arc;
use std::time::Duration;

/// The CommuniTree application
///
/// Reservation and board operations go to the shared document store.
/// Notifications stay on the device in the key-value store.
#[derive(Clone)]
pub struct CommuniTreeApp {
    availability: AvailabilityQuery,
    writer: ReservationWriter,
    notifications: NotificationLog,
    complaints: ComplaintBoard,
    alerts: AlertBoard,
    events: EventBoard,
    clock: Arc<dyn Clock>,
}

impl CommuniTreeApp {
    /// Assemble the application over explicit backends
    ///
    /// The notification log starts empty; call [`Self::load_notifications`]
    /// to read the persisted list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimeSlot` if the configured opening hours don't form a
    /// valid slot catalog.
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        local_storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let capacities = Arc::new(CapacityTable::from(&config.capacity));
        let catalog = Arc::new(SlotCatalog::hourly(
            config.slots.opening_hour,
            config.slots.closing_hour,
        )?);
        let collections = &config.collections;

        let availability = AvailabilityQuery::new(
            Arc::clone(&store),
            collections.reservations.clone(),
            capacities,
            catalog,
        );
        let writer = ReservationWriter::new(
            availability.clone(),
            Arc::clone(&store),
            collections.reservations.clone(),
            Arc::clone(&clock),
            Arc::clone(&ids),
        );

        Ok(Self {
            availability,
            writer,
            notifications: NotificationLog::new(
                local_storage,
                config.storage.notifications_key.clone(),
            ),
            complaints: ComplaintBoard::new(
                Arc::clone(&store),
                collections.complaints.clone(),
                Arc::clone(&ids),
            ),
            alerts: AlertBoard::new(Arc::clone(&store), collections.alerts.clone(), Arc::clone(&ids)),
            events: EventBoard::new(store, collections.events.clone(), ids),
            clock,
        })
    }

    /// Assemble the application from configuration
    ///
    /// Uses `PostgreSQL` when `config.postgres.url` is set (running the schema
    /// migration). Otherwise falls back to an in-process document store, which
    /// is not durable, and logs a warning saying so. Notifications
    /// are kept under `config.storage.local_storage_dir` and loaded before
    /// returning.
    ///
    /// # Errors
    ///
    /// - `StoreUnavailable`: the database or the storage directory can't be opened
    /// - `InvalidTimeSlot`: the configured opening hours are invalid
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match &config.postgres.url {
            Some(url) => {
                tracing::info!("Connecting to PostgreSQL document store");
                let store =
                    PostgresDocumentStore::connect(url, config.postgres.max_connections).await?;
                store.migrate().await?;
                Arc::new(store)
            },
            None => {
                tracing::warn!(
                    "No DATABASE_URL set, reservations and board posts are kept in memory and lost on exit"
                );
                Arc::new(InMemoryDocumentStore::new())
            },
        };

        let local_storage = FileKeyValueStore::open(&config.storage.local_storage_dir).await?;
        tracing::debug!(dir = %local_storage.base_dir().display(), "Local storage opened");

        let app = Self::new(
            config,
            store,
            Arc::new(local_storage),
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
        )?;
        app.load_notifications().await?;
        Ok(app)
    }

    // ------------------------------------------------------------------------
    // Reservations
    // ------------------------------------------------------------------------

    /// Booking state of every slot of a day
    ///
    /// `date` is a day of month, either `"12"` or `"12 - Sat"`.
    ///
    /// # Errors
    ///
    /// - `UnknownResourceType`: unrecognised resource
    /// - `InvalidDate`: `date` is not a day of month
    /// - `StoreUnavailable`: the store call failed
    pub async fn get_availability(
        &self,
        date: &str,
        resource_type: &str,
    ) -> Result<Vec<SlotAvailability>> {
        let resource_type: ResourceType = resource_type.parse()?;
        let date: ReservationDay = date.parse()?;
        self.availability.get_availability(date, resource_type).await
    }

    /// Book one place and record a confirmation notification
    ///
    /// A notification that can't be recorded is logged and does not undo the
    /// booking.
    ///
    /// # Errors
    ///
    /// - `UnknownResourceType`, `InvalidDate`, `InvalidTimeSlot`: bad input
    /// - `SlotUnavailable`: the slot is full (nothing is written)
    /// - `StoreUnavailable`: a store call failed
    pub async fn book_slot(
        &self,
        date: &str,
        resource_type: &str,
        time_slot: &str,
        requester: Requester,
    ) -> Result<ReservationRecord> {
        let request = ReservationRequest {
            resource_type: resource_type.parse()?,
            date: date.parse()?,
            time_slot: time_slot.parse::<TimeSlot>()?,
            requester,
        };

        let record = self.writer.book_slot(request).await?;

        let notification = NotificationRecord::reservation_confirmed(&record, self.clock.now());
        if let Err(error) = self.notifications.append(notification).await {
            tracing::warn!(reservation = %record.id, %error, "Confirmation notification not recorded");
        }
        Ok(record)
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    /// Read the persisted notification list
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if the log has been shut down.
    pub async fn load_notifications(&self) -> Result<()> {
        self.notifications.load().await
    }

    /// All notifications, newest first
    pub async fn list_notifications(&self) -> Vec<NotificationRecord> {
        self.notifications.list().await
    }

    /// Notifications matching `query` on type or resource
    pub async fn search_notifications(&self, query: &str) -> Vec<NotificationRecord> {
        self.notifications.search(query).await
    }

    /// Unread notifications, newest first
    pub async fn unread_notifications(&self) -> Vec<NotificationRecord> {
        self.notifications.unread().await
    }

    /// Flip the unread flag of a notification
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if the log has been shut down.
    pub async fn mark_notification_read(&self, id: &str) -> Result<()> {
        self.notifications.toggle_read(id).await
    }

    /// Remove a notification
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if the log has been shut down.
    pub async fn delete_notification(&self, id: &str) -> Result<()> {
        self.notifications.delete(id).await
    }

    /// The notification log
    #[must_use]
    pub const fn notifications(&self) -> &NotificationLog {
        &self.notifications
    }

    // ------------------------------------------------------------------------
    // Community board
    // ------------------------------------------------------------------------

    /// File a complaint
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the write fails.
    pub async fn submit_complaint(&self, complaint: NewComplaint) -> Result<Complaint> {
        self.complaints.submit(complaint).await
    }

    /// Most recent complaints, newest first
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store call fails.
    pub async fn recent_complaints(&self, limit: Option<usize>) -> Result<Vec<Complaint>> {
        self.complaints.recent(limit).await
    }

    /// Publish an interruption alert
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the write fails.
    pub async fn publish_alert(
        &self,
        reference: &str,
        description: &str,
    ) -> Result<InterruptionAlert> {
        self.alerts.publish(reference, description).await
    }

    /// Latest interruption alerts, newest first
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store call fails.
    pub async fn latest_alerts(&self, limit: Option<usize>) -> Result<Vec<InterruptionAlert>> {
        self.alerts.latest(limit).await
    }

    /// Create a community event
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the write fails.
    pub async fn create_event(&self, event: NewCommunityEvent) -> Result<CommunityEvent> {
        self.events.create(event).await
    }

    /// Fetch one community event
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, `StoreUnavailable` if the store
    /// call fails.
    pub async fn event(&self, id: &str) -> Result<CommunityEvent> {
        self.events.get(id).await
    }

    /// All community events in date order
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store call fails.
    pub async fn list_events(&self) -> Result<Vec<CommunityEvent>> {
        self.events.list().await
    }

    /// Answer an event invitation
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, `StoreUnavailable` if a store
    /// call fails.
    pub async fn rsvp(&self, id: &str, answer: Rsvp) -> Result<CommunityEvent> {
        self.events.rsvp(id, answer).await
    }

    /// Wait for pending notification writes and stop the log
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if pending writes don't finish within `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        tracing::info!("Shutting down");
        self.notifications.shutdown(timeout).await
    }
}
