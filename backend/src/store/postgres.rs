use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::transaction_queries;
use crate::models::{NewTransaction, Summary, Transaction, TransactionFilter};
use crate::store::TransactionStore;

#[derive(Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, sqlx::Error> {
        transaction_queries::fetch_filtered(&self.pool, filter).await
    }

    async fn insert(&self, data: NewTransaction) -> Result<Transaction, sqlx::Error> {
        transaction_queries::insert(&self.pool, data).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Transaction>, sqlx::Error> {
        transaction_queries::fetch_one(&self.pool, id).await
    }

    async fn update(&self, transaction: Transaction) -> Result<Option<Transaction>, sqlx::Error> {
        transaction_queries::update(&self.pool, &transaction).await
    }

    async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        transaction_queries::delete(&self.pool, id).await
    }

    async fn summarize(&self) -> Result<Summary, sqlx::Error> {
        transaction_queries::summarize(&self.pool).await
    }
}
