//! `PostgreSQL` document store for CommuniTree.
//!
//! This crate provides a PostgreSQL-based implementation of the `DocumentStore`
//! trait from `communitree-core`. Every collection lives in one `documents`
//! table with a JSONB body. It supports:
//!
//! - Equality filtering through JSONB containment
//! - Creation-time ordering and limits
//! - Merge updates
//! - Guarded creates serialized by a transaction-scoped advisory lock
//!
//! # Example
//!
//! ```ignore
//! use communitree_postgres::PostgresDocumentStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresDocumentStore::connect("postgres://localhost/communitree", 5).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod document_store;

pub use document_store::PostgresDocumentStore;
