//! # CommuniTree Testing
//!
//! Testing utilities and helpers for CommuniTree.
//!
//! This crate provides:
//! - Deterministic implementations of Environment traits (`FixedClock`, `SequentialIdGenerator`)
//! - In-memory document and key-value stores with failure injection
//! - A Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use communitree_testing::{InMemoryDocumentStore, test_clock};
//!
//! #[tokio::test]
//! async fn books_a_slot() {
//!     let store = Arc::new(InMemoryDocumentStore::new());
//!     let writer = ReservationWriter::new(store.clone(), /* ... */);
//!     writer.book_slot(request).await.unwrap();
//!     assert_eq!(store.len("reservations"), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use communitree_core::environment::{Clock, IdGenerator};

/// Ergonomic testing utilities for reducers
pub mod reducer_test;

/// In-memory backends
pub mod stores;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until advanced explicitly.
    ///
    /// # Example
    ///
    /// ```
    /// use communitree_testing::mocks::FixedClock;
    /// use communitree_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2);
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(1_735_689_600))
    }

    /// Predictable ids: `{prefix}1`, `{prefix}2`, ...
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        prefix: String,
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Create a generator with the given prefix
        #[must_use]
        pub fn new(prefix: impl Into<String>) -> Self {
            Self {
                prefix: prefix.into(),
                next: AtomicU64::new(1),
            }
        }
    }

    impl Default for SequentialIdGenerator {
        fn default() -> Self {
            Self::new("id-")
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            format!("{}{n}", self.prefix)
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SequentialIdGenerator, test_clock};
pub use reducer_test::{ReducerTest, assertions};
pub use stores::{InMemoryDocumentStore, InMemoryKeyValueStore};
