//! `PostgresDocumentStore`: the `DocumentStore` trait over one JSONB table.

use chrono::{DateTime, Utc};
use communitree_core::document_store::{
    BoxFuture, CapacityGuard, Document, DocumentStore, DocumentStoreError, Fields, GuardedCreate,
    Query, Result, SortOrder,
};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

type DocumentRow = (String, Value, DateTime<Utc>, DateTime<Utc>);

fn database_error(e: &sqlx::Error) -> DocumentStoreError {
    DocumentStoreError::Unavailable(e.to_string())
}

fn into_document(collection: &str, row: DocumentRow) -> Result<Document> {
    let (id, data, created_at, updated_at) = row;
    let Value::Object(fields) = data else {
        return Err(DocumentStoreError::Serialization(format!(
            "{collection}/{id}: body is not a JSON object"
        )));
    };
    Ok(Document {
        id,
        created_at,
        updated_at,
        fields,
    })
}

/// `PostgreSQL`-backed document store.
///
/// All collections share the `documents` table, keyed by `(collection, id)`.
/// Filters are evaluated with JSONB containment (`data @> filter`), so equality
/// on top-level fields is served by the GIN index created in [`Self::migrate`].
///
/// # Guarded creates
///
/// [`DocumentStore::create_guarded`] runs in a transaction that first takes a
/// transaction-scoped advisory lock derived from the collection and the guard
/// filter. Two guarded creates on the same slot therefore queue up, and the
/// second one sees the first one's row when it sums the counts.
#[derive(Clone, Debug)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Connect to a database.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Unavailable`] if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| database_error(&e))?;
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `documents` table and its indexes if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Unavailable`] if a statement fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS documents (
                seq BIGSERIAL NOT NULL,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, id)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| database_error(&e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(collection, created_at, seq)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| database_error(&e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_data ON documents USING GIN (data)")
            .execute(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;

        tracing::info!("documents schema ready");
        Ok(())
    }

    async fn list_documents(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let direction = match query.order {
            SortOrder::OldestFirst => "ASC",
            SortOrder::NewestFirst => "DESC",
        };
        let sql = format!(
            "SELECT id, data, created_at, updated_at FROM documents \
             WHERE collection = $1 AND data @> $2 \
             ORDER BY created_at {direction}, seq {direction} \
             LIMIT $3"
        );
        let limit = query
            .limit
            .map(|n| i64::try_from(n).unwrap_or(i64::MAX));

        let rows: Vec<DocumentRow> = sqlx::query_as(&sql)
            .bind(collection)
            .bind(query.filter.to_json())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;

        rows.into_iter()
            .map(|row| into_document(collection, row))
            .collect()
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, data, created_at, updated_at FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error(&e))?;

        let row = row.ok_or_else(|| DocumentStoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
        into_document(collection, row)
    }

    async fn insert<'c, X>(
        executor: X,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document>
    where
        X: sqlx::PgExecutor<'c>,
    {
        let row: Option<DocumentRow> = sqlx::query_as(
            r"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            RETURNING id, data, created_at, updated_at
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(fields))
        .fetch_optional(executor)
        .await
        .map_err(|e| database_error(&e))?;

        let row = row.ok_or_else(|| DocumentStoreError::AlreadyExists {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
        into_document(collection, row)
    }

    async fn update_document(&self, collection: &str, id: &str, fields: Fields) -> Result<Document> {
        let row: Option<DocumentRow> = sqlx::query_as(
            r"
            UPDATE documents
            SET data = data || $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            RETURNING id, data, created_at, updated_at
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(fields))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error(&e))?;

        let row = row.ok_or_else(|| DocumentStoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
        into_document(collection, row)
    }

    async fn guarded_insert(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        guard: &CapacityGuard,
    ) -> Result<GuardedCreate> {
        let filter = guard.filter.to_json();
        let lock_key = format!("{collection}:{filter}");

        let mut tx = self.pool.begin().await.map_err(|e| database_error(&e))?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&lock_key)
            .execute(&mut *tx)
            .await
            .map_err(|e| database_error(&e))?;

        let (total,): (i64,) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(
                CASE WHEN jsonb_typeof(data -> $3) = 'number' AND (data ->> $3) ~ '^[0-9]+$'
                     THEN (data ->> $3)::BIGINT
                     ELSE 0
                END
            ), 0)::BIGINT
            FROM documents
            WHERE collection = $1 AND data @> $2
            ",
        )
        .bind(collection)
        .bind(&filter)
        .bind(&guard.count_field)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| database_error(&e))?;

        let current = u64::try_from(total).unwrap_or(0);
        let increment = guard.increment_of(&fields);

        if !guard.admits(current, increment) {
            tx.rollback().await.map_err(|e| database_error(&e))?;
            tracing::debug!(collection, current, limit = guard.limit, "guarded create rejected");
            metrics::counter!("document_store.guarded_create", "outcome" => "rejected")
                .increment(1);
            return Ok(GuardedCreate::Rejected {
                current,
                limit: guard.limit,
            });
        }

        let document = Self::insert(&mut *tx, collection, id, fields).await?;
        tx.commit().await.map_err(|e| database_error(&e))?;

        metrics::counter!("document_store.guarded_create", "outcome" => "created").increment(1);
        Ok(GuardedCreate::Created(document))
    }
}

impl DocumentStore for PostgresDocumentStore {
    fn list<'a>(
        &'a self,
        collection: &'a str,
        query: &'a Query,
    ) -> BoxFuture<'a, Result<Vec<Document>>> {
        Box::pin(self.list_documents(collection, query))
    }

    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, Result<Document>> {
        Box::pin(self.get_document(collection, id))
    }

    fn create<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Fields,
    ) -> BoxFuture<'a, Result<Document>> {
        Box::pin(Self::insert(&self.pool, collection, id, fields))
    }

    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Fields,
    ) -> BoxFuture<'a, Result<Document>> {
        Box::pin(self.update_document(collection, id, fields))
    }

    fn create_guarded<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Fields,
        guard: &'a CapacityGuard,
    ) -> BoxFuture<'a, Result<GuardedCreate>> {
        Box::pin(self.guarded_insert(collection, id, fields, guard))
    }
}
