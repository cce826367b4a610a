//! Notification log reducer.
//!
//! State is the sorted list of notification records. Every mutation persists
//! the whole list through an effect; the outcome comes back as an action.

use crate::types::NotificationRecord;
use communitree_core::local_storage::KeyValueStore;
use communitree_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use std::cmp::Ordering;
use std::sync::Arc;

// ============================================================================
// State
// ============================================================================

/// In-memory notification log
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationState {
    /// Records, newest (highest numeric id) first
    pub records: Vec<NotificationRecord>,
    /// Last storage failure, cleared by the next successful write
    pub last_error: Option<String>,
}

// ============================================================================
// Actions
// ============================================================================

/// Commands and storage outcomes for the notification log
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationAction {
    // Commands
    /// Read the persisted list
    Load,
    /// Add a record
    Append {
        /// The new record
        record: NotificationRecord,
    },
    /// Flip the unread flag of a record
    ToggleRead {
        /// Record id
        id: String,
    },
    /// Remove a record
    Delete {
        /// Record id
        id: String,
    },

    // Storage outcomes
    /// The persisted list was read
    Loaded {
        /// Records as stored
        records: Vec<NotificationRecord>,
    },
    /// Reading or decoding the persisted list failed
    LoadFailed {
        /// Failure description
        error: String,
    },
    /// The list was written
    Persisted,
    /// Writing the list failed
    PersistFailed {
        /// Failure description
        error: String,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the notification reducer
#[derive(Clone)]
pub struct NotificationEnvironment {
    /// Device-local storage
    pub storage: Arc<dyn KeyValueStore>,
    /// Key the list is stored under
    pub key: String,
}

impl NotificationEnvironment {
    /// Create an environment
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Newest first by numeric id; non-numeric ids after all numeric ones
fn newest_first(a: &NotificationRecord, b: &NotificationRecord) -> Ordering {
    match (a.sort_key(), b.sort_key()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort records for display (stable, so equal ids keep insertion order)
pub fn sort_records(records: &mut [NotificationRecord]) {
    records.sort_by(newest_first);
}

/// Id for a new record: its own, or one past the newest numeric id if taken
fn unique_id(records: &[NotificationRecord], record: &NotificationRecord) -> String {
    if !records.iter().any(|r| r.id == record.id) {
        return record.id.clone();
    }
    let next = records
        .iter()
        .filter_map(NotificationRecord::sort_key)
        .chain(record.sort_key())
        .max()
        .map_or(0, |newest| newest.saturating_add(1));
    next.to_string()
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the notification log
#[derive(Clone, Copy, Debug, Default)]
pub struct NotificationReducer;

impl NotificationReducer {
    fn persist(
        state: &NotificationState,
        env: &NotificationEnvironment,
    ) -> Effect<NotificationAction> {
        let storage = Arc::clone(&env.storage);
        let key = env.key.clone();
        let encoded = serde_json::to_string(&state.records);

        Effect::future(async move {
            let json = match encoded {
                Ok(json) => json,
                Err(e) => {
                    return Some(NotificationAction::PersistFailed {
                        error: e.to_string(),
                    });
                },
            };
            match storage.write(&key, json).await {
                Ok(()) => Some(NotificationAction::Persisted),
                Err(e) => Some(NotificationAction::PersistFailed {
                    error: e.to_string(),
                }),
            }
        })
    }

    fn load(env: &NotificationEnvironment) -> Effect<NotificationAction> {
        let storage = Arc::clone(&env.storage);
        let key = env.key.clone();

        Effect::future(async move {
            match storage.read(&key).await {
                Ok(None) => Some(NotificationAction::Loaded {
                    records: Vec::new(),
                }),
                Ok(Some(json)) => match serde_json::from_str(&json) {
                    Ok(records) => Some(NotificationAction::Loaded { records }),
                    Err(e) => Some(NotificationAction::LoadFailed {
                        error: format!("stored notifications are not valid: {e}"),
                    }),
                },
                Err(e) => Some(NotificationAction::LoadFailed {
                    error: e.to_string(),
                }),
            }
        })
    }
}

impl Reducer for NotificationReducer {
    type State = NotificationState;
    type Action = NotificationAction;
    type Environment = NotificationEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            NotificationAction::Load => smallvec![Self::load(env)],

            NotificationAction::Loaded { mut records } => {
                sort_records(&mut records);
                state.records = records;
                state.last_error = None;
                smallvec![Effect::None]
            },

            NotificationAction::LoadFailed { error } => {
                tracing::warn!(%error, "Failed to load notifications, keeping current list");
                state.last_error = Some(error);
                smallvec![Effect::None]
            },

            NotificationAction::Append { mut record } => {
                let id = unique_id(&state.records, &record);
                if id != record.id {
                    tracing::debug!(taken = %record.id, %id, "Notification id taken, reassigning");
                    record.id = id;
                }
                state.records.push(record);
                sort_records(&mut state.records);
                smallvec![Self::persist(state, env)]
            },

            NotificationAction::ToggleRead { id } => {
                let Some(record) = state.records.iter_mut().find(|r| r.id == id) else {
                    tracing::debug!(%id, "No notification to toggle");
                    return smallvec![Effect::None];
                };
                record.is_new = !record.is_new;
                smallvec![Self::persist(state, env)]
            },

            NotificationAction::Delete { id } => {
                let before = state.records.len();
                state.records.retain(|r| r.id != id);
                if state.records.len() == before {
                    tracing::debug!(%id, "No notification to delete");
                    return smallvec![Effect::None];
                }
                smallvec![Self::persist(state, env)]
            },

            NotificationAction::Persisted => {
                state.last_error = None;
                smallvec![Effect::None]
            },

            NotificationAction::PersistFailed { error } => {
                tracing::warn!(%error, "Failed to persist notifications");
                state.last_error = Some(error);
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use communitree_testing::{InMemoryKeyValueStore, ReducerTest, assertions};

    fn record(id: &str) -> NotificationRecord {
        NotificationRecord {
            id: id.to_string(),
            kind: "Reservation Confirmed".to_string(),
            details: None,
            received_time: "2025-01-01T00:00:00.000Z".to_string(),
            is_new: true,
            user: "Ana".to_string(),
        }
    }

    fn env() -> NotificationEnvironment {
        NotificationEnvironment::new(Arc::new(InMemoryKeyValueStore::new()), "notifications")
    }

    fn ids(state: &NotificationState) -> Vec<&str> {
        state.records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn append_keeps_newest_first_and_persists() {
        ReducerTest::new(NotificationReducer)
            .with_env(env())
            .given_state(NotificationState::default())
            .when_action(NotificationAction::Append { record: record("100") })
            .when_action(NotificationAction::Append { record: record("300") })
            .when_action(NotificationAction::Append { record: record("200") })
            .then_state(|state| {
                assert_eq!(ids(state), ["300", "200", "100"]);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn appending_a_taken_id_assigns_the_next_one() {
        ReducerTest::new(NotificationReducer)
            .with_env(env())
            .given_state(NotificationState::default())
            .when_action(NotificationAction::Append { record: record("100") })
            .when_action(NotificationAction::Append { record: record("300") })
            .when_action(NotificationAction::Append { record: record("100") })
            .when_action(NotificationAction::Append { record: record("legacy") })
            .when_action(NotificationAction::Append { record: record("legacy") })
            .then_state(|state| {
                assert_eq!(ids(state), ["302", "301", "300", "100", "legacy"]);
            })
            .run();
    }

    #[test]
    fn delete_after_a_collision_removes_one_record() {
        ReducerTest::new(NotificationReducer)
            .with_env(env())
            .given_state(NotificationState::default())
            .when_action(NotificationAction::Append { record: record("100") })
            .when_action(NotificationAction::Append { record: record("100") })
            .when_action(NotificationAction::Delete {
                id: "100".to_string(),
            })
            .then_state(|state| assert_eq!(ids(state), ["101"]))
            .run();
    }

    #[test]
    fn non_numeric_ids_sort_last() {
        let mut records = vec![record("abc"), record("5"), record("50"), record("xyz")];
        sort_records(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["50", "5", "abc", "xyz"]);
    }

    #[test]
    fn toggle_flips_only_the_matching_record() {
        ReducerTest::new(NotificationReducer)
            .with_env(env())
            .given_state(NotificationState {
                records: vec![record("300"), record("200")],
                last_error: None,
            })
            .when_action(NotificationAction::ToggleRead {
                id: "300".to_string(),
            })
            .then_state(|state| {
                assert!(!state.records[0].is_new);
                assert!(state.records[1].is_new);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn unknown_id_changes_nothing() {
        let initial = NotificationState {
            records: vec![record("300")],
            last_error: None,
        };
        let expected = initial.clone();

        ReducerTest::new(NotificationReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(NotificationAction::Delete {
                id: "999".to_string(),
            })
            .then_state(move |state| assert_eq!(*state, expected))
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn persist_failure_keeps_mutation_and_records_error() {
        ReducerTest::new(NotificationReducer)
            .with_env(env())
            .given_state(NotificationState {
                records: vec![record("300"), record("200")],
                last_error: None,
            })
            .when_action(NotificationAction::Delete {
                id: "200".to_string(),
            })
            .when_action(NotificationAction::PersistFailed {
                error: "disk full".to_string(),
            })
            .then_state(|state| {
                assert_eq!(ids(state), ["300"]);
                assert_eq!(state.last_error.as_deref(), Some("disk full"));
            })
            .run();
    }

    #[test]
    fn load_failure_keeps_current_list() {
        ReducerTest::new(NotificationReducer)
            .with_env(env())
            .given_state(NotificationState {
                records: vec![record("1")],
                last_error: None,
            })
            .when_action(NotificationAction::LoadFailed {
                error: "unreadable".to_string(),
            })
            .then_state(|state| {
                assert_eq!(ids(state), ["1"]);
                assert!(state.last_error.is_some());
            })
            .run();
    }

    #[test]
    fn loaded_records_are_sorted() {
        ReducerTest::new(NotificationReducer)
            .with_env(env())
            .given_state(NotificationState::default())
            .when_action(NotificationAction::Loaded {
                records: vec![record("100"), record("300"), record("200")],
            })
            .then_state(|state| assert_eq!(ids(state), ["300", "200", "100"]))
            .run();
    }
}
