//! In-memory backends for tests and the demo
//!
//! - [`InMemoryDocumentStore`]: collections of documents behind one mutex
//! - [`InMemoryKeyValueStore`]: `HashMap`-based device storage
//!
//! Both support failure injection so callers can exercise their error paths.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use communitree_core::document_store::{
    BoxFuture, CapacityGuard, Document, DocumentStore, DocumentStoreError, Fields, GuardedCreate,
    Query, Result, SortOrder,
};
use communitree_core::environment::{Clock, SystemClock};
use communitree_core::local_storage::{KeyValueStore, LocalStorageError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Stored {
    seq: u64,
    document: Document,
}

#[derive(Debug, Default)]
struct Collections {
    next_seq: u64,
    collections: HashMap<String, Vec<Stored>>,
}

impl Collections {
    fn documents(&self, collection: &str) -> impl Iterator<Item = &Document> {
        self.collections
            .get(collection)
            .into_iter()
            .flatten()
            .map(|stored| &stored.document)
    }

    fn contains(&self, collection: &str, id: &str) -> bool {
        self.documents(collection).any(|doc| doc.id == id)
    }

    fn push(&mut self, collection: &str, document: Document) {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(Stored { seq, document });
    }
}

/// In-memory document store for fast, deterministic testing.
///
/// Every operation runs under a single mutex, which makes
/// [`DocumentStore::create_guarded`] trivially atomic. Documents are listed by
/// creation time, ties broken by insertion order.
///
/// # Example
///
/// ```
/// use communitree_testing::InMemoryDocumentStore;
/// use communitree_core::document_store::{DocumentStore, Fields, Query};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryDocumentStore::new();
/// store.create("complaints", "c1", Fields::new()).await?;
///
/// let docs = store.list("complaints", &Query::all()).await?;
/// assert_eq!(docs.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    data: Arc<Mutex<Collections>>,
    clock: Arc<dyn Clock>,
    unavailable: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store using the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a new empty store stamping documents with the given clock
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            data: Arc::new(Mutex::new(Collections::default())),
            clock,
            unavailable: Arc::new(AtomicBool::new(false)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every subsequent call fail with `Unavailable` (or recover)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful writes (create, update, admitted guarded create)
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.data.lock().unwrap().documents(collection).count()
    }

    /// Whether a collection holds no documents
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Insert a document as-is, bypassing validation and write counting
    ///
    /// Useful for seeding fixtures, including records other clients wrote
    /// with unexpected shapes.
    pub fn insert_raw(&self, collection: &str, id: &str, fields: Fields) {
        let now = self.clock.now();
        self.data.lock().unwrap().push(
            collection,
            Document {
                id: id.to_string(),
                created_at: now,
                updated_at: now,
                fields,
            },
        );
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Unavailable(
                "in-memory store set unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn list_now(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        self.check_available()?;
        let data = self.data.lock().unwrap();

        let mut matching: Vec<&Stored> = data
            .collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|stored| query.filter.matches(&stored.document.fields))
            .collect();

        matching.sort_by_key(|stored| (stored.document.created_at, stored.seq));
        if query.order == SortOrder::NewestFirst {
            matching.reverse();
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|stored| stored.document.clone())
            .collect())
    }

    fn get_now(&self, collection: &str, id: &str) -> Result<Document> {
        self.check_available()?;
        self.data
            .lock()
            .unwrap()
            .documents(collection)
            .find(|doc| doc.id == id)
            .cloned()
            .ok_or_else(|| DocumentStoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    fn create_now(&self, collection: &str, id: &str, fields: Fields) -> Result<Document> {
        self.check_available()?;
        let mut data = self.data.lock().unwrap();
        self.insert_locked(&mut data, collection, id, fields)
    }

    fn insert_locked(
        &self,
        data: &mut Collections,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document> {
        if data.contains(collection, id) {
            return Err(DocumentStoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let now = self.clock.now();
        let document = Document {
            id: id.to_string(),
            created_at: now,
            updated_at: now,
            fields,
        };
        data.push(collection, document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(document)
    }

    fn update_now(&self, collection: &str, id: &str, fields: Fields) -> Result<Document> {
        self.check_available()?;
        let now = self.clock.now();
        let mut data = self.data.lock().unwrap();

        let stored = data
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|stored| stored.document.id == id))
            .ok_or_else(|| DocumentStoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        stored.document.fields.extend(fields);
        stored.document.updated_at = now;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored.document.clone())
    }

    fn create_guarded_now(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        guard: &CapacityGuard,
    ) -> Result<GuardedCreate> {
        self.check_available()?;
        let mut data = self.data.lock().unwrap();

        let current = guard.current_total(data.documents(collection));
        let increment = guard.increment_of(&fields);
        if !guard.admits(current, increment) {
            return Ok(GuardedCreate::Rejected {
                current,
                limit: guard.limit,
            });
        }

        self.insert_locked(&mut data, collection, id, fields)
            .map(GuardedCreate::Created)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("writes", &self.write_count())
            .field("unavailable", &self.unavailable.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn list<'a>(
        &'a self,
        collection: &'a str,
        query: &'a Query,
    ) -> BoxFuture<'a, Result<Vec<Document>>> {
        let result = self.list_now(collection, query);
        Box::pin(async move { result })
    }

    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, Result<Document>> {
        let result = self.get_now(collection, id);
        Box::pin(async move { result })
    }

    fn create<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Fields,
    ) -> BoxFuture<'a, Result<Document>> {
        let result = self.create_now(collection, id, fields);
        Box::pin(async move { result })
    }

    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Fields,
    ) -> BoxFuture<'a, Result<Document>> {
        let result = self.update_now(collection, id, fields);
        Box::pin(async move { result })
    }

    fn create_guarded<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Fields,
        guard: &'a CapacityGuard,
    ) -> BoxFuture<'a, Result<GuardedCreate>> {
        let result = self.create_guarded_now(collection, id, fields, guard);
        Box::pin(async move { result })
    }
}

/// In-memory key-value store standing in for device storage.
///
/// Reads and writes can be made to fail independently.
#[derive(Clone, Debug, Default)]
pub struct InMemoryKeyValueStore {
    data: Arc<Mutex<HashMap<String, String>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryKeyValueStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one value
    #[must_use]
    pub fn with_value(key: &str, value: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.into());
        store
    }

    /// Current raw value under `key`
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().get(key).cloned()
    }

    /// Make reads fail (or recover)
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make writes fail (or recover)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn read<'a>(
        &'a self,
        key: &'a str,
    ) -> BoxFuture<'a, std::result::Result<Option<String>, LocalStorageError>> {
        let result = if self.fail_reads.load(Ordering::SeqCst) {
            Err(LocalStorageError::Unavailable("reads disabled".to_string()))
        } else {
            Ok(self.value(key))
        };
        Box::pin(async move { result })
    }

    fn write<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> BoxFuture<'a, std::result::Result<(), LocalStorageError>> {
        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(LocalStorageError::Unavailable("writes disabled".to_string()))
        } else {
            self.data.lock().unwrap().insert(key.to_string(), value);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        Box::pin(async move { result })
    }
}
