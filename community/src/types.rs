//! Domain types for CommuniTree.
//!
//! Value objects for reservations (resource types, days, time slots,
//! requesters), the reservation record itself and the local notification
//! record.

use crate::error::CommunityError;
use chrono::{DateTime, SecondsFormat, Utc};
use communitree_core::document_store::{Document, Fields, Filter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Document field names
// ============================================================================

/// Field holding the resource type of a reservation
pub const FIELD_RESOURCE_TYPE: &str = "resourceType";
/// Field holding the reserved day
pub const FIELD_DATE: &str = "date";
/// Field holding the reserved time slot
pub const FIELD_TIME_SLOT: &str = "timeSlot";
/// Field holding the capacity share of a reservation
pub const FIELD_RESERVATION_COUNT: &str = "reservationCount";

// ============================================================================
// Resource types
// ============================================================================

/// A reservable shared amenity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    /// Fitness room
    Gym,
    /// Swimming pool
    Swimming,
    /// Badminton court
    Badminton,
    /// Table tennis table
    #[serde(rename = "Table Tennis", alias = "TableTennis")]
    TableTennis,
}

impl ResourceType {
    /// Every resource type, in catalog order
    pub const ALL: [Self; 4] = [Self::Gym, Self::Swimming, Self::Badminton, Self::TableTennis];

    /// Display name, also used as the stored value
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gym => "Gym",
            Self::Swimming => "Swimming",
            Self::Badminton => "Badminton",
            Self::TableTennis => "Table Tennis",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = CommunityError;

    /// Parses display names case-insensitively, with or without the space
    /// in "Table Tennis".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        match compact.as_str() {
            "gym" => Ok(Self::Gym),
            "swimming" => Ok(Self::Swimming),
            "badminton" => Ok(Self::Badminton),
            "tabletennis" => Ok(Self::TableTennis),
            _ => Err(CommunityError::UnknownResourceType(s.trim().to_string())),
        }
    }
}

// ============================================================================
// Reservation day
// ============================================================================

/// Day of month a reservation is for (1..=31)
///
/// Only the day number is carried. Month and year are not part of a
/// reservation; see DESIGN.md.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ReservationDay(u8);

impl ReservationDay {
    /// Create a day, validating the range
    ///
    /// # Errors
    ///
    /// Returns [`CommunityError::InvalidDate`] outside 1..=31.
    pub fn new(day: u8) -> Result<Self, CommunityError> {
        if (1..=31).contains(&day) {
            Ok(Self(day))
        } else {
            Err(CommunityError::InvalidDate(day.to_string()))
        }
    }

    /// The day number
    #[must_use]
    pub const fn day(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ReservationDay {
    type Error = CommunityError;

    fn try_from(day: u8) -> Result<Self, Self::Error> {
        Self::new(day)
    }
}

impl From<ReservationDay> for u8 {
    fn from(day: ReservationDay) -> Self {
        day.0
    }
}

impl FromStr for ReservationDay {
    type Err = CommunityError;

    /// Accepts a bare day (`"12"`) or the display form (`"12 - Sat"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let day = s.split_once('-').map_or(s, |(day, _weekday)| day).trim();
        day.parse::<u8>()
            .map_err(|_| CommunityError::InvalidDate(s.to_string()))
            .and_then(|day| {
                Self::new(day).map_err(|_| CommunityError::InvalidDate(s.to_string()))
            })
    }
}

impl fmt::Display for ReservationDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Time slots
// ============================================================================

/// A whole-hour interval such as `08:00-09:00`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot {
    start_hour: u8,
    end_hour: u8,
}

impl TimeSlot {
    /// Create the slot `[start_hour:00, end_hour:00)`
    ///
    /// # Errors
    ///
    /// Returns [`CommunityError::InvalidTimeSlot`] unless `start_hour < end_hour <= 24`.
    pub fn new(start_hour: u8, end_hour: u8) -> Result<Self, CommunityError> {
        if start_hour < end_hour && end_hour <= 24 {
            Ok(Self {
                start_hour,
                end_hour,
            })
        } else {
            Err(CommunityError::InvalidTimeSlot(format!(
                "{start_hour:02}:00-{end_hour:02}:00"
            )))
        }
    }

    /// First hour of the slot
    #[must_use]
    pub const fn start_hour(self) -> u8 {
        self.start_hour
    }

    /// Hour the slot ends
    #[must_use]
    pub const fn end_hour(self) -> u8 {
        self.end_hour
    }
}

fn parse_whole_hour(s: &str) -> Option<u8> {
    let (hour, minute) = s.trim().split_once(':')?;
    if minute != "00" {
        return None;
    }
    hour.parse().ok()
}

impl FromStr for TimeSlot {
    type Err = CommunityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CommunityError::InvalidTimeSlot(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start = parse_whole_hour(start).ok_or_else(invalid)?;
        let end = parse_whole_hour(end).ok_or_else(invalid)?;
        Self::new(start, end).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = CommunityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start_hour, self.end_hour)
    }
}

/// Ordered set of bookable slots
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotCatalog {
    slots: Vec<TimeSlot>,
}

impl SlotCatalog {
    /// Hourly slots from `opening_hour` to `closing_hour`
    ///
    /// # Errors
    ///
    /// Returns [`CommunityError::InvalidTimeSlot`] if the hours don't form at
    /// least one slot within the day.
    pub fn hourly(opening_hour: u8, closing_hour: u8) -> Result<Self, CommunityError> {
        if opening_hour >= closing_hour || closing_hour > 24 {
            return Err(CommunityError::InvalidTimeSlot(format!(
                "opening {opening_hour}:00 / closing {closing_hour}:00"
            )));
        }
        let slots = (opening_hour..closing_hour)
            .map(|hour| TimeSlot::new(hour, hour + 1))
            .collect::<Result<_, _>>()?;
        Ok(Self { slots })
    }

    /// The twelve slots from `08:00-09:00` to `19:00-20:00`
    #[must_use]
    pub fn standard() -> Self {
        Self {
            slots: (8..20)
                .map(|hour| TimeSlot {
                    start_hour: hour,
                    end_hour: hour + 1,
                })
                .collect(),
        }
    }

    /// Slots in order
    #[must_use]
    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    /// Whether a slot can be booked
    #[must_use]
    pub fn contains(&self, slot: TimeSlot) -> bool {
        self.slots.contains(&slot)
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Reservations
// ============================================================================

/// Who is booking, as entered on the reservation form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Full name
    #[serde(rename = "userName")]
    pub name: String,
    /// Residence (unit) number
    #[serde(rename = "residenceNumber")]
    pub residence_id: String,
    /// Phone number
    #[serde(rename = "contactNumber")]
    pub contact_number: String,
    /// Email address
    pub email: String,
    /// Free-form notes
    #[serde(rename = "additionalDetails")]
    pub notes: String,
}

/// Opaque reservation identifier
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(String);

impl ReservationId {
    /// Wrap an identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed booking request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservationRequest {
    /// Amenity to book
    pub resource_type: ResourceType,
    /// Day of month
    pub date: ReservationDay,
    /// Slot within the day
    pub time_slot: TimeSlot,
    /// Who is booking
    pub requester: Requester,
}

/// A stored reservation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRecord {
    /// Identity assigned at creation
    #[serde(skip)]
    pub id: ReservationId,
    /// Booked amenity
    pub resource_type: ResourceType,
    /// Booked day
    pub date: ReservationDay,
    /// Booked slot
    pub time_slot: TimeSlot,
    /// Who booked
    #[serde(rename = "userDetails")]
    pub requester: Requester,
    /// Capacity share, always 1
    pub reservation_count: u32,
    /// When the booking was made; the Unix epoch for records written without one
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl ReservationRecord {
    /// A new single-place reservation
    #[must_use]
    pub fn new(id: ReservationId, request: ReservationRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            resource_type: request.resource_type,
            date: request.date,
            time_slot: request.time_slot,
            requester: request.requester,
            reservation_count: 1,
            created_at,
        }
    }

    /// Document fields for this record
    ///
    /// # Errors
    ///
    /// Returns [`CommunityError::MalformedRecord`] if encoding fails.
    pub fn to_fields(&self) -> Result<Fields, CommunityError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(CommunityError::MalformedRecord {
                id: self.id.to_string(),
                reason: "reservation did not encode to an object".to_string(),
            }),
            Err(e) => Err(CommunityError::MalformedRecord {
                id: self.id.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Decode a stored document
    ///
    /// # Errors
    ///
    /// Returns [`CommunityError::MalformedRecord`] if a field is missing or invalid.
    pub fn from_document(document: &Document) -> Result<Self, CommunityError> {
        let mut record: Self = serde_json::from_value(Value::Object(document.fields.clone()))
            .map_err(|e| CommunityError::MalformedRecord {
                id: document.id.clone(),
                reason: e.to_string(),
            })?;
        record.id = ReservationId::new(document.id.clone());
        Ok(record)
    }

    /// Filter selecting every reservation of a resource on a day
    #[must_use]
    pub fn day_filter(resource_type: ResourceType, date: ReservationDay) -> Filter {
        Filter::new()
            .eq(FIELD_RESOURCE_TYPE, resource_type.as_str())
            .eq(FIELD_DATE, date.day())
    }

    /// Filter selecting the reservations sharing one slot's capacity
    #[must_use]
    pub fn slot_filter(
        resource_type: ResourceType,
        date: ReservationDay,
        time_slot: TimeSlot,
    ) -> Filter {
        Self::day_filter(resource_type, date).eq(FIELD_TIME_SLOT, time_slot.to_string())
    }
}

/// Booking state of one slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    /// The slot
    pub time_slot: TimeSlot,
    /// Places already booked
    pub count: u32,
    /// Whether `count` has reached the capacity
    pub fully_booked: bool,
}

// ============================================================================
// Notifications
// ============================================================================

/// What a notification is about
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDetails {
    /// Resource display name
    #[serde(default)]
    pub resource: String,
    /// Day, as shown to the resident
    #[serde(default)]
    pub date: String,
    /// Time slot, as shown to the resident
    #[serde(default)]
    pub time: String,
}

/// A device-local notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// Creation time in epoch milliseconds, as a string; also the sort key.
    /// Bumped past the newest id when appended to a log that already has it.
    pub id: String,
    /// Free-text label, e.g. "Reservation Confirmed"
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional subject of the notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<NotificationDetails>,
    /// ISO-8601 receive time
    pub received_time: String,
    /// Unread flag
    pub is_new: bool,
    /// Short display tag
    #[serde(default)]
    pub user: String,
}

/// Label of the notification appended after a successful booking
pub const RESERVATION_CONFIRMED: &str = "Reservation Confirmed";

impl NotificationRecord {
    /// An unread notification created at `now`
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        details: Option<NotificationDetails>,
        user: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: now.timestamp_millis().to_string(),
            kind: kind.into(),
            details,
            received_time: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            is_new: true,
            user: user.into(),
        }
    }

    /// Confirmation for a stored reservation
    #[must_use]
    pub fn reservation_confirmed(record: &ReservationRecord, now: DateTime<Utc>) -> Self {
        Self::new(
            RESERVATION_CONFIRMED,
            Some(NotificationDetails {
                resource: record.resource_type.to_string(),
                date: record.date.to_string(),
                time: record.time_slot.to_string(),
            }),
            record.requester.name.clone(),
            now,
        )
    }

    /// Numeric value of the id, if it is one
    #[must_use]
    pub fn sort_key(&self) -> Option<i64> {
        self.id.trim().parse().ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn resource_type_parses_display_names() {
        assert_eq!("Gym".parse::<ResourceType>().ok(), Some(ResourceType::Gym));
        assert_eq!(
            "table tennis".parse::<ResourceType>().ok(),
            Some(ResourceType::TableTennis)
        );
        assert_eq!(
            "TableTennis".parse::<ResourceType>().ok(),
            Some(ResourceType::TableTennis)
        );
        assert_eq!(
            "Sauna".parse::<ResourceType>(),
            Err(CommunityError::UnknownResourceType("Sauna".to_string()))
        );
    }

    #[test]
    fn reservation_day_accepts_both_forms() {
        assert_eq!("12".parse::<ReservationDay>().map(ReservationDay::day), Ok(12));
        assert_eq!("12 - Sat".parse::<ReservationDay>().map(ReservationDay::day), Ok(12));
        assert!(matches!(
            "0".parse::<ReservationDay>(),
            Err(CommunityError::InvalidDate(_))
        ));
        assert!("32".parse::<ReservationDay>().is_err());
        assert!("Sat".parse::<ReservationDay>().is_err());
    }

    #[test]
    fn time_slot_round_trips_through_display() {
        let slot: TimeSlot = "09:00-10:00".parse().unwrap();
        assert_eq!(slot.start_hour(), 9);
        assert_eq!(slot.to_string(), "09:00-10:00");
        assert!("09:30-10:00".parse::<TimeSlot>().is_err());
        assert!("10:00-09:00".parse::<TimeSlot>().is_err());
        assert!("ten to eleven".parse::<TimeSlot>().is_err());
    }

    #[test]
    fn standard_catalog_has_twelve_hourly_slots() {
        let catalog = SlotCatalog::standard();
        assert_eq!(catalog.slots().len(), 12);
        assert_eq!(catalog.slots()[0].to_string(), "08:00-09:00");
        assert_eq!(catalog.slots()[11].to_string(), "19:00-20:00");
        assert_eq!(SlotCatalog::hourly(8, 20).unwrap(), catalog);
        assert!(SlotCatalog::hourly(20, 8).is_err());
    }

    #[test]
    fn reservation_record_uses_stored_field_names() {
        let request = ReservationRequest {
            resource_type: ResourceType::TableTennis,
            date: ReservationDay::new(3).unwrap(),
            time_slot: "18:00-19:00".parse().unwrap(),
            requester: Requester {
                name: "Ana".to_string(),
                ..Requester::default()
            },
        };
        let record = ReservationRecord::new(ReservationId::new("r1"), request, Utc::now());
        let fields = record.to_fields().unwrap();

        assert_eq!(fields[FIELD_RESOURCE_TYPE], "Table Tennis");
        assert_eq!(fields[FIELD_DATE], 3);
        assert_eq!(fields[FIELD_TIME_SLOT], "18:00-19:00");
        assert_eq!(fields[FIELD_RESERVATION_COUNT], 1);
        assert_eq!(fields["userDetails"]["userName"], "Ana");
        assert!(!fields.contains_key("id"));
    }

    #[test]
    fn reservation_without_created_at_decodes() {
        let fields = serde_json::json!({
            "resourceType": "Gym",
            "date": 12,
            "timeSlot": "09:00-10:00",
            "reservationCount": 1,
            "userDetails": {
                "userName": "Ana",
                "residenceNumber": "A-101",
                "contactNumber": "",
                "email": "",
                "additionalDetails": "",
            },
        });
        let Value::Object(fields) = fields else {
            panic!("json! object literal");
        };
        let now = Utc::now();
        let document = Document {
            id: "legacy-1".to_string(),
            created_at: now,
            updated_at: now,
            fields,
        };

        let record = ReservationRecord::from_document(&document).unwrap();
        assert_eq!(record.id.as_str(), "legacy-1");
        assert_eq!(record.resource_type, ResourceType::Gym);
        assert_eq!(record.requester.name, "Ana");
        assert_eq!(record.created_at, DateTime::<Utc>::default());
    }

    #[test]
    fn notification_serializes_camel_case() {
        let now = DateTime::parse_from_rfc3339("2025-01-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = NotificationRecord::new("Reservation Confirmed", None, "Ana", now);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], "1735725600000");
        assert_eq!(json["type"], "Reservation Confirmed");
        assert_eq!(json["receivedTime"], "2025-01-01T10:00:00.000Z");
        assert_eq!(json["isNew"], true);
        assert_eq!(record.sort_key(), Some(1_735_725_600_000));
    }
}
