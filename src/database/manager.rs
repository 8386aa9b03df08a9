use std::sync::Arc;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use super::memory::MemoryDocumentStore;
use super::postgres::PgDocumentStore;
use super::store::DocumentStore;
use super::DatabaseError;
use crate::config::{AppConfig, StoreBackend};

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "documents" (
        "collection" TEXT NOT NULL,
        "id" TEXT NOT NULL,
        "doc" JSONB NOT NULL,
        PRIMARY KEY ("collection", "id")
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "documents_client_id_idx" ON "documents" ("collection", ("doc"->>'clientId'))"#,
    r#"CREATE INDEX IF NOT EXISTS "documents_unique_id_idx" ON "documents" (("doc"->>'uniqueId')) WHERE "doc" ? 'uniqueId'"#,
    r#"CREATE INDEX IF NOT EXISTS "documents_access_token_idx" ON "documents" (("doc"->>'accessToken')) WHERE "collection" = 'clients'"#,
];

/// Builds the configured document store
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, DatabaseError> {
        match config.database.backend {
            StoreBackend::Memory => {
                info!("Using in-memory document store");
                Ok(Arc::new(MemoryDocumentStore::new()))
            }
            StoreBackend::Postgres => {
                let pool = Self::pool(config).await?;
                Self::migrate(&pool).await?;
                Ok(Arc::new(PgDocumentStore::new(pool)))
            }
        }
    }

    pub async fn pool(config: &AppConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .database
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(config.database.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool (max {} connections)", config.database.max_connections);
        Ok(pool)
    }

    /// Create the documents table and its indexes if missing
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
        }
        info!("Database schema is up to date");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_needs_no_url() {
        let mut config = AppConfig::from_env();
        config.database.backend = StoreBackend::Memory;
        config.database.url = None;
        let store = DatabaseManager::connect(&config).await.unwrap();
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn postgres_backend_validates_url() {
        let mut config = AppConfig::from_env();
        config.database.backend = StoreBackend::Postgres;
        config.database.url = None;
        assert!(matches!(DatabaseManager::connect(&config).await, Err(DatabaseError::ConfigMissing(_))));

        config.database.url = Some("mysql://localhost/db".to_string());
        assert!(matches!(DatabaseManager::connect(&config).await, Err(DatabaseError::InvalidDatabaseUrl)));
    }
}
