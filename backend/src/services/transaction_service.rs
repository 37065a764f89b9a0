use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    apply_patch, validate_new, CreateTransaction, ListTransactionsQuery, Summary, Transaction,
    TransactionFilter, UpdateTransaction,
};
use crate::store::TransactionStore;

pub const EDIT_WINDOW_HOURS: i64 = 12;
pub const EDIT_LOCKED_MESSAGE: &str = "Editing is restricted after 12 hours";

/// Whether a record can still be changed. Derived from its age alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditWindow {
    Editable,
    Locked,
}

/// A record locks once strictly more than `EDIT_WINDOW_HOURS` have passed since creation.
pub fn edit_window(created_at: DateTime<Utc>, now: DateTime<Utc>) -> EditWindow {
    if now - created_at > Duration::hours(EDIT_WINDOW_HOURS) {
        EditWindow::Locked
    } else {
        EditWindow::Editable
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Transaction not found".to_string())
}

pub async fn list(
    store: &dyn TransactionStore,
    query: ListTransactionsQuery,
) -> Result<Vec<Transaction>, AppError> {
    let filter = TransactionFilter::from_query(query)?;
    let transactions = store.list(&filter).await?;
    Ok(transactions)
}

pub async fn create(
    store: &dyn TransactionStore,
    input: CreateTransaction,
    now: DateTime<Utc>,
) -> Result<Transaction, AppError> {
    let data = validate_new(input, now)?;
    let transaction = store.insert(data).await?;
    Ok(transaction)
}

/// The window is checked before the patch is validated, so a locked record
/// answers 403 whatever the payload.
pub async fn update(
    store: &dyn TransactionStore,
    id: Uuid,
    patch: UpdateTransaction,
    now: DateTime<Utc>,
) -> Result<Transaction, AppError> {
    let existing = store.find(id).await?.ok_or_else(not_found)?;

    if edit_window(existing.created_at, now) == EditWindow::Locked {
        return Err(AppError::Forbidden(EDIT_LOCKED_MESSAGE.to_string()));
    }

    let merged = apply_patch(&existing, patch)?;
    let updated = store.update(merged).await?.ok_or_else(not_found)?;
    Ok(updated)
}

/// Deleting a missing record is not an error.
pub async fn delete(store: &dyn TransactionStore, id: Uuid) -> Result<(), AppError> {
    let removed = store.delete(id).await?;
    if removed == 0 {
        debug!("Transaction {} did not exist, nothing deleted", id);
    }
    Ok(())
}

pub async fn summary(store: &dyn TransactionStore) -> Result<Summary, AppError> {
    let summary = store.summarize().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use crate::store::InMemoryTransactionStore;
    use chrono::TimeZone;

    fn create_input(kind: &str, amount: f64) -> CreateTransaction {
        CreateTransaction {
            kind: Some(kind.to_string()),
            amount: Some(amount.into()),
            category: Some("General".to_string()),
            ..Default::default()
        }
    }

    fn patch(json: &str) -> UpdateTransaction {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_edit_window_boundary() {
        let created = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let twelve = Duration::hours(12);

        assert_eq!(edit_window(created, created), EditWindow::Editable);
        assert_eq!(edit_window(created, created + twelve - Duration::seconds(1)), EditWindow::Editable);
        assert_eq!(edit_window(created, created + twelve), EditWindow::Editable);
        assert_eq!(edit_window(created, created + twelve + Duration::milliseconds(1)), EditWindow::Locked);
        assert_eq!(edit_window(created, created + twelve + Duration::seconds(1)), EditWindow::Locked);
        assert_eq!(edit_window(created, created - Duration::minutes(5)), EditWindow::Editable);
    }

    #[tokio::test]
    async fn test_update_inside_window_succeeds() {
        let store = InMemoryTransactionStore::new();
        let tx = create(&store, create_input("expense", 20.0), Utc::now()).await.unwrap();

        let at = tx.created_at + Duration::hours(12) - Duration::seconds(1);
        let updated = update(&store, tx.id, patch(r#"{"amount": 25, "division": "Office"}"#), at)
            .await
            .unwrap();

        assert_eq!(updated.id, tx.id);
        assert_eq!(updated.amount, 25.0);
        assert_eq!(updated.division.as_deref(), Some("Office"));
        assert_eq!(updated.category.as_deref(), Some("General"));
        assert_eq!(updated.created_at, tx.created_at);
    }

    #[tokio::test]
    async fn test_update_after_window_is_forbidden_and_leaves_record() {
        let store = InMemoryTransactionStore::new();
        let tx = create(&store, create_input("expense", 20.0), Utc::now()).await.unwrap();

        let at = tx.created_at + Duration::hours(12) + Duration::seconds(1);
        let err = update(&store, tx.id, patch(r#"{"amount": 99}"#), at).await.unwrap_err();

        assert!(matches!(&err, AppError::Forbidden(msg) if msg == EDIT_LOCKED_MESSAGE));
        assert_eq!(store.find(tx.id).await.unwrap(), Some(tx));
    }

    #[tokio::test]
    async fn test_update_locked_wins_over_invalid_patch() {
        let store = InMemoryTransactionStore::new();
        let tx = create(&store, create_input("income", 1.0), Utc::now()).await.unwrap();

        let at = tx.created_at + Duration::days(2);
        let err = update(&store, tx.id, patch(r#"{"type": "bogus"}"#), at).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_type() {
        let store = InMemoryTransactionStore::new();
        let tx = create(&store, create_input("income", 1.0), Utc::now()).await.unwrap();

        let err = update(&store, tx.id, patch(r#"{"type": "bogus"}"#), tx.created_at)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.find(tx.id).await.unwrap(), Some(tx));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let store = InMemoryTransactionStore::new();
        let err = update(&store, Uuid::new_v4(), patch("{}"), Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryTransactionStore::new();
        let tx = create(&store, create_input("income", 1.0), Utc::now()).await.unwrap();

        delete(&store, tx.id).await.unwrap();
        delete(&store, tx.id).await.unwrap();
        delete(&store, Uuid::new_v4()).await.unwrap();
        assert!(store.find(tx.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_without_date_uses_now() {
        let store = InMemoryTransactionStore::new();
        let now = Utc::now();
        let tx = create(&store, create_input("income", 10.0), now).await.unwrap();
        assert_eq!(tx.date, now);
        assert_eq!(tx.kind, TransactionType::Income);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_type() {
        let store = InMemoryTransactionStore::new();
        let err = create(&store, create_input("loan", 10.0), Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_summary_scenarios() {
        let store = InMemoryTransactionStore::new();
        assert_eq!(summary(&store).await.unwrap(), Summary::from_totals(0.0, 0.0));

        create(&store, create_input("income", 1000.0), Utc::now()).await.unwrap();
        create(&store, create_input("expense", 400.0), Utc::now()).await.unwrap();

        let totals = summary(&store).await.unwrap();
        assert_eq!(totals.total_income, 1000.0);
        assert_eq!(totals.total_expense, 400.0);
        assert_eq!(totals.balance, 600.0);
    }

    #[tokio::test]
    async fn test_list_applies_filters() {
        let store = InMemoryTransactionStore::new();
        for (kind, day) in [("income", 1), ("expense", 10), ("expense", 20), ("expense", 31)] {
            let input = CreateTransaction {
                date: Some(format!("2025-01-{:02}", day).as_str().into()),
                ..create_input(kind, 5.0)
            };
            create(&store, input, Utc::now()).await.unwrap();
        }

        let listed = list(
            &store,
            ListTransactionsQuery {
                start_date: Some("2025-01-10".to_string()),
                end_date: Some("2025-01-31".to_string()),
                kind: Some("expense".to_string()),
                division: None,
            },
        )
        .await
        .unwrap();

        let days: Vec<String> = listed.iter().map(|t| t.date.format("%d").to_string()).collect();
        assert_eq!(days, vec!["31", "20", "10"]);
    }
}
