use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{NewTransaction, Summary, Transaction, TransactionFilter, TransactionType};
use crate::store::TransactionStore;

/// Process-local store backed by a concurrent map.
/// Same observable behaviour as the postgres store, minus durability.
#[derive(Clone, Default)]
pub struct InMemoryTransactionStore {
    records: Arc<DashMap<Uuid, Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, sqlx::Error> {
        let mut transactions: Vec<Transaction> = self
            .records
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(transactions)
    }

    async fn insert(&self, data: NewTransaction) -> Result<Transaction, sqlx::Error> {
        let transaction = Transaction::new(data);
        self.records.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Transaction>, sqlx::Error> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, transaction: Transaction) -> Result<Option<Transaction>, sqlx::Error> {
        let Some(mut entry) = self.records.get_mut(&transaction.id) else {
            return Ok(None);
        };

        let updated = Transaction {
            created_at: entry.created_at,
            updated_at: Utc::now(),
            ..transaction
        };
        *entry = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        Ok(self.records.remove(&id).map_or(0, |_| 1))
    }

    async fn summarize(&self) -> Result<Summary, sqlx::Error> {
        let (income, expense) = self.records.iter().fold((0.0, 0.0), |(income, expense), entry| {
            match entry.kind {
                TransactionType::Income => (income + entry.amount, expense),
                TransactionType::Expense => (income, expense + entry.amount),
            }
        });
        Ok(Summary::from_totals(income, expense))
    }
}
