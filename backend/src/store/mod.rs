use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, StorageBackend};
use crate::models::{NewTransaction, Summary, Transaction, TransactionFilter};

mod memory;
mod postgres;

pub use memory::InMemoryTransactionStore;
pub use postgres::PgTransactionStore;

/// Persistence for transactions. Every call is a fresh round-trip; nothing is cached.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Matching records, most recent `date` first.
    async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, sqlx::Error>;

    /// Stores a validated record. The store assigns `id`, `created_at` and `updated_at`.
    async fn insert(&self, data: NewTransaction) -> Result<Transaction, sqlx::Error>;

    async fn find(&self, id: Uuid) -> Result<Option<Transaction>, sqlx::Error>;

    /// Replaces the mutable fields of an existing record and refreshes
    /// `updated_at`. Returns `None` if the record no longer exists.
    async fn update(&self, transaction: Transaction) -> Result<Option<Transaction>, sqlx::Error>;

    /// Number of records removed (0 or 1).
    async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error>;

    async fn summarize(&self) -> Result<Summary, sqlx::Error>;
}

/// Builds the store selected by `config`. Fails if the database is unreachable.
pub async fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn TransactionStore>> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the postgres storage backend")?;

            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await
                .context("failed to connect to the database")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run database migrations")?;

            info!("✅ Database connected successfully");
            Ok(Arc::new(PgTransactionStore::new(pool)))
        }
        StorageBackend::Memory => {
            warn!("⚠️ Using in-memory storage, transactions are lost on restart");
            Ok(Arc::new(InMemoryTransactionStore::new()))
        }
    }
}
