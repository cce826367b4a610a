//! Document store trait and related types.
//!
//! The document store is the hosted backend that owns reservation records and
//! community board records. It is the only shared mutable resource in the system.
//!
//! # Design
//!
//! The trait exposes exactly the operations the application consumes:
//!
//! - `list` documents of a collection matching an equality filter
//! - `get` a single document by id
//! - `create` a document under a caller-chosen id
//! - `update` (patch) the fields of an existing document
//! - `create_guarded`: sum a numeric field over the documents matching a filter
//!   and create the new document only if the sum stays within a limit, as one
//!   atomic step on the store side
//!
//! The guarded create is what keeps per-slot capacity intact when two residents
//! book the last place at the same time: the check and the insert cannot be
//! interleaved by another writer.
//!
//! # Implementations
//!
//! - `PostgresDocumentStore` (in `communitree-postgres`): transaction plus advisory lock
//! - `InMemoryDocumentStore` (in `communitree-testing`): single mutex
//!
//! # Example
//!
//! ```no_run
//! use communitree_core::document_store::{DocumentStore, DocumentStoreError, Filter, Query};
//!
//! async fn example<S: DocumentStore>(store: &S) -> Result<(), DocumentStoreError> {
//!     let query = Query::filtered(Filter::new().eq("resourceType", "Gym").eq("date", 12));
//!     let docs = store.list("reservations", &query).await?;
//!     println!("{} reservations", docs.len());
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Field map of a document (top-level JSON object).
pub type Fields = serde_json::Map<String, Value>;

/// Boxed future returned by the dyn-compatible store traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, DocumentStoreError>;

/// Errors that can occur during document store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    /// The backend could not be reached or rejected the call (network, timeout, auth).
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// No document with this id exists in the collection.
    #[error("Document not found: {collection}/{id}")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// Requested document id.
        id: String,
    },

    /// A document with this id already exists in the collection.
    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists {
        /// Collection written to.
        collection: String,
        /// Conflicting document id.
        id: String,
    },

    /// Stored data could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A stored document: backend metadata plus free-form fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id, unique within its collection.
    pub id: String,
    /// When the document was created (assigned by the store).
    pub created_at: DateTime<Utc>,
    /// When the document was last written.
    pub updated_at: DateTime<Utc>,
    /// Document fields.
    pub fields: Fields,
}

impl Document {
    /// Raw value of a field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String value of a field, if present and a string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Non-negative integer value of a field, if present and an integer.
    #[must_use]
    pub fn u64_field(&self, name: &str) -> Option<u64> {
        self.fields.get(name).and_then(Value::as_u64)
    }
}

/// Conjunction of field equality conditions.
///
/// Conditions compare top-level fields against scalar JSON values. An empty
/// filter matches every document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Create an empty filter (matches everything)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Add an equality condition
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// The equality conditions, in insertion order
    #[must_use]
    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    /// Whether a field map satisfies every condition
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| fields.get(field) == Some(expected))
    }

    /// The filter as a JSON object, suitable for containment queries
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.conditions.iter().cloned().collect())
    }
}

/// Ordering of listed documents by creation time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first
    #[default]
    OldestFirst,
    /// Newest first
    NewestFirst,
}

/// List query: filter, ordering and optional limit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    /// Equality filter
    pub filter: Filter,
    /// Ordering by creation time
    pub order: SortOrder,
    /// Maximum number of documents to return
    pub limit: Option<usize>,
}

impl Query {
    /// Query returning every document of a collection
    #[must_use]
    pub const fn all() -> Self {
        Self {
            filter: Filter::new(),
            order: SortOrder::OldestFirst,
            limit: None,
        }
    }

    /// Query returning the documents matching a filter
    #[must_use]
    pub const fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            order: SortOrder::OldestFirst,
            limit: None,
        }
    }

    /// Order newest first
    #[must_use]
    pub const fn newest_first(mut self) -> Self {
        self.order = SortOrder::NewestFirst;
        self
    }

    /// Cap the number of returned documents
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Condition for an atomic guarded create.
///
/// The store sums `count_field` over every document matching `filter`, adds the
/// `count_field` value of the document being created, and creates it only if the
/// total does not exceed `limit`. Missing or non-integer counts contribute zero
/// to the sum; a new document without a count contributes one.
#[derive(Clone, Debug, PartialEq)]
pub struct CapacityGuard {
    /// Documents that share the guarded capacity
    pub filter: Filter,
    /// Integer field holding each document's share of the capacity
    pub count_field: String,
    /// Maximum total allowed after the create
    pub limit: u64,
}

impl CapacityGuard {
    /// Create a guard
    #[must_use]
    pub fn new(filter: Filter, count_field: impl Into<String>, limit: u64) -> Self {
        Self {
            filter,
            count_field: count_field.into(),
            limit,
        }
    }

    /// Share of the capacity claimed by a new document
    #[must_use]
    pub fn increment_of(&self, fields: &Fields) -> u64 {
        fields
            .get(&self.count_field)
            .and_then(Value::as_u64)
            .unwrap_or(1)
    }

    /// Sum of the guarded field over the matching documents
    #[must_use]
    pub fn current_total<'a>(&self, documents: impl IntoIterator<Item = &'a Document>) -> u64 {
        documents
            .into_iter()
            .filter(|doc| self.filter.matches(&doc.fields))
            .filter_map(|doc| doc.u64_field(&self.count_field))
            .sum()
    }

    /// Whether `increment` more fits on top of `current`
    #[must_use]
    pub const fn admits(&self, current: u64, increment: u64) -> bool {
        current.saturating_add(increment) <= self.limit
    }
}

/// Outcome of [`DocumentStore::create_guarded`].
#[derive(Clone, Debug, PartialEq)]
pub enum GuardedCreate {
    /// The guard admitted the document and it was created.
    Created(Document),
    /// The guard rejected the document; nothing was written.
    Rejected {
        /// Total of the guarded field at the time of the check.
        current: u64,
        /// The guard's limit.
        limit: u64,
    },
}

/// Document store abstraction.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to be shared across async tasks.
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the
/// store can be held as `Arc<dyn DocumentStore>` by services and effects.
pub trait DocumentStore: Send + Sync {
    /// List documents of a collection.
    ///
    /// An unknown collection is empty, not an error.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend call failed
    /// - `Serialization`: stored data could not be decoded
    fn list<'a>(&'a self, collection: &'a str, query: &'a Query)
    -> BoxFuture<'a, Result<Vec<Document>>>;

    /// Fetch one document by id.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such document
    /// - `Unavailable`: backend call failed
    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, Result<Document>>;

    /// Create a document.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists`: the id is taken
    /// - `Unavailable`: backend call failed
    fn create<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Fields,
    ) -> BoxFuture<'a, Result<Document>>;

    /// Merge `fields` into an existing document and return the result.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such document
    /// - `Unavailable`: backend call failed
    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Fields,
    ) -> BoxFuture<'a, Result<Document>>;

    /// Atomically check a [`CapacityGuard`] and create the document if admitted.
    ///
    /// No other write to the collection may interleave between the sum and the
    /// insert.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists`: the id is taken
    /// - `Unavailable`: backend call failed
    fn create_guarded<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Fields,
        guard: &'a CapacityGuard,
    ) -> BoxFuture<'a, Result<GuardedCreate>>;
}
