//! Postgres document store: one JSONB table shared by every collection.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, types::Json, PgPool, Postgres, Row};

use super::collection::Collection;
use super::record::Document;
use super::store::{document_id, DocumentStore, Write};
use super::DatabaseError;
use crate::filter::types::SqlParam;
use crate::filter::Filter;

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_with<'e, E>(executor: E, collection: Collection, doc: Document) -> Result<Document, DatabaseError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let id = document_id(&doc)?;
        let result = sqlx::query(
            "INSERT INTO \"documents\" (\"collection\", \"id\", \"doc\") VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(collection.name())
        .bind(&id)
        .bind(Json(&doc))
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Conflict(format!("{} {} already exists", collection, id)));
        }
        Ok(doc)
    }

    async fn update_with<'e, E>(executor: E, collection: Collection, id: &str, changes: Document) -> Result<Document, DatabaseError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        // jsonb || jsonb is a shallow merge, matching the in-memory store
        let row = sqlx::query(
            "UPDATE \"documents\" SET \"doc\" = \"doc\" || $3 WHERE \"collection\" = $1 AND \"id\" = $2 RETURNING \"doc\"",
        )
        .bind(collection.name())
        .bind(id)
        .bind(Json(&changes))
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", collection.label())))?;

        decode_doc(&row)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let sql_result = filter.to_sql(collection.name())?;
        tracing::debug!("find {}: {}", collection, sql_result.query);

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(decode_doc).collect()
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<i64, DatabaseError> {
        let sql_result = filter.to_count_sql(collection.name())?;

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, DatabaseError> {
        let row = sqlx::query("SELECT \"doc\" FROM \"documents\" WHERE \"collection\" = $1 AND \"id\" = $2")
            .bind(collection.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_doc).transpose()
    }

    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, DatabaseError> {
        Self::insert_with(&self.pool, collection, doc).await
    }

    async fn update(&self, collection: Collection, id: &str, changes: Document) -> Result<Document, DatabaseError> {
        Self::update_with(&self.pool, collection, id, changes).await
    }

    async fn apply_batch(&self, writes: Vec<Write>) -> Result<Vec<Document>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut results = Vec::with_capacity(writes.len());

        for write in writes {
            let doc = match write {
                Write::Insert { collection, doc } => Self::insert_with(&mut *tx, collection, doc).await?,
                Write::Update { collection, id, changes } => Self::update_with(&mut *tx, collection, &id, changes).await?,
            };
            results.push(doc);
        }

        // Dropping `tx` on an early return rolls the batch back
        tx.commit().await?;
        Ok(results)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn decode_doc(row: &sqlx::postgres::PgRow) -> Result<Document, DatabaseError> {
    let Json(value): Json<Value> = row.try_get("doc")?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::Corrupt(format!("expected object, found {}", other))),
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    p: &'q SqlParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match p {
        SqlParam::Json(v) => q.bind(Json(v)),
        SqlParam::Text(s) => q.bind(s.as_str()),
    }
}
