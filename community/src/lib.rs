//! CommuniTree - residential community services
//!
//! Amenity reservations with per-slot capacity enforcement, a device-local
//! notification log, and a community board (complaints, interruption alerts,
//! events).
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────────┐
//!                      │  CommuniTreeApp  │
//!                      └──────────────────┘
//!           ┌──────────────────┼──────────────────┐
//!           ▼                  ▼                  ▼
//! ┌──────────────────┐ ┌────────────────┐ ┌────────────────┐
//! │ AvailabilityQuery│ │ NotificationLog│ │ Community board│
//! │ ReservationWriter│ │ (reducer+Store)│ │                │
//! └──────────────────┘ └────────────────┘ └────────────────┘
//!           │                  │                  │
//!           ▼                  ▼                  ▼
//!    DocumentStore       KeyValueStore       DocumentStore
//! ```
//!
//! # Capacity
//!
//! A slot holds at most `capacity(resourceType)` places. Bookings are written
//! with a guarded create, so the check and the insert happen as one step on
//! the store:
//!
//! ```text
//! sum(reservationCount where resourceType, date, timeSlot match) + 1 <= capacity
//! ```
//!
//! When two residents race for the last place, one booking is stored and the
//! other fails with `SlotUnavailable`.
//!
//! # Example
//!
//! ```no_run
//! use communitree::{CommuniTreeApp, Config, Requester};
//!
//! # async fn example() -> communitree::Result<()> {
//! let app = CommuniTreeApp::from_config(&Config::from_env()).await?;
//! let slots = app.get_availability("12", "Badminton").await?;
//! println!("{} slots", slots.len());
//!
//! let record = app
//!     .book_slot("12", "Badminton", "09:00-10:00", Requester::default())
//!     .await?;
//! println!("booked {}", record.id);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod availability;
pub mod board;
pub mod booking;
pub mod capacity;
pub mod config;
pub mod error;
pub mod notifications;
pub mod storage;
pub mod types;

pub use app::CommuniTreeApp;
pub use availability::AvailabilityQuery;
pub use booking::ReservationWriter;
pub use capacity::CapacityTable;
pub use config::Config;
pub use error::{CommunityError, Result};
pub use notifications::NotificationLog;
pub use storage::FileKeyValueStore;
pub use types::{
    NotificationDetails, NotificationRecord, Requester, ReservationDay, ReservationId,
    ReservationRecord, ReservationRequest, ResourceType, SlotAvailability, SlotCatalog, TimeSlot,
};
