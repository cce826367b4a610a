//! Read-side helpers: search, unread filter and relative receive time.

use crate::types::NotificationRecord;
use chrono::{DateTime, Utc};

/// Records whose type or resource contains `query`, ignoring case
///
/// An empty query matches everything.
#[must_use]
pub fn search(records: &[NotificationRecord], query: &str) -> Vec<NotificationRecord> {
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| {
            record.kind.to_lowercase().contains(&needle)
                || record
                    .details
                    .as_ref()
                    .is_some_and(|d| d.resource.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// Records still flagged unread
#[must_use]
pub fn unread(records: &[NotificationRecord]) -> Vec<NotificationRecord> {
    records.iter().filter(|r| r.is_new).cloned().collect()
}

/// How long ago a record was received, relative to `now`
///
/// Returns `None` if `receivedTime` is not an RFC 3339 timestamp. Times in
/// the future read as "just now".
#[must_use]
pub fn time_ago(record: &NotificationRecord, now: DateTime<Utc>) -> Option<String> {
    let received = DateTime::parse_from_rfc3339(&record.received_time).ok()?;
    let seconds = (now - received.with_timezone(&Utc)).num_seconds();

    let text = match seconds {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{} min ago", s / 60),
        s if s < 86_400 => format!("{} hr ago", s / 3_600),
        s if s / 86_400 == 1 => "yesterday".to_string(),
        s => format!("{} days ago", s / 86_400),
    };
    Some(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::types::NotificationDetails;
    use chrono::Duration;

    fn record(kind: &str, resource: Option<&str>, is_new: bool) -> NotificationRecord {
        NotificationRecord {
            id: "1".to_string(),
            kind: kind.to_string(),
            details: resource.map(|r| NotificationDetails {
                resource: r.to_string(),
                ..NotificationDetails::default()
            }),
            received_time: "2025-01-01T12:00:00.000Z".to_string(),
            is_new,
            user: String::new(),
        }
    }

    #[test]
    fn search_matches_type_or_resource() {
        let records = [
            record("Reservation Confirmed", Some("Gym"), true),
            record("Event Reminder", None, true),
            record("Reservation Cancelled", Some("Table Tennis"), false),
        ];

        assert_eq!(search(&records, "reservation").len(), 2);
        assert_eq!(search(&records, "TENNIS").len(), 1);
        assert_eq!(search(&records, "").len(), 3);
        assert!(search(&records, "sauna").is_empty());
    }

    #[test]
    fn unread_filters_on_flag() {
        let records = [
            record("a", None, true),
            record("b", None, false),
        ];
        let unread = unread(&records);
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].kind, "a");
    }

    #[test]
    fn time_ago_buckets() {
        let r = record("a", None, true);
        let received: DateTime<Utc> = "2025-01-01T12:00:00Z".parse().unwrap();
        let at = |d: Duration| time_ago(&r, received + d).unwrap();

        assert_eq!(at(Duration::seconds(59)), "just now");
        assert_eq!(at(Duration::seconds(-30)), "just now");
        assert_eq!(at(Duration::minutes(5)), "5 min ago");
        assert_eq!(at(Duration::hours(3)), "3 hr ago");
        assert_eq!(at(Duration::hours(30)), "yesterday");
        assert_eq!(at(Duration::days(4)), "4 days ago");
    }

    #[test]
    fn time_ago_rejects_garbage() {
        let mut r = record("a", None, true);
        r.received_time = "yesterday-ish".to_string();
        assert_eq!(time_ago(&r, Utc::now()), None);
    }
}
