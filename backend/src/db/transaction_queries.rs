use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{NewTransaction, Summary, Transaction, TransactionFilter};

pub async fn fetch_filtered(
    pool: &PgPool,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, kind, amount, category, division, description, date, created_at, updated_at
         FROM transactions
         WHERE TRUE",
    );

    if let Some(range) = &filter.date_range {
        query_builder.push(" AND date >= ");
        query_builder.push_bind(*range.start());
        query_builder.push(" AND date <= ");
        query_builder.push_bind(*range.end());
    }

    if let Some(kind) = filter.kind {
        query_builder.push(" AND kind = ");
        query_builder.push_bind(kind.as_str());
    }

    if let Some(division) = &filter.division {
        query_builder.push(" AND division = ");
        query_builder.push_bind(division.clone());
    }

    query_builder.push(" ORDER BY date DESC");

    query_builder
        .build_query_as::<Transaction>()
        .fetch_all(pool)
        .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT id, kind, amount, category, division, description, date, created_at, updated_at
         FROM transactions
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert(pool: &PgPool, data: NewTransaction) -> Result<Transaction, sqlx::Error> {
    let transaction = Transaction::new(data);

    sqlx::query_as::<_, Transaction>(
        "INSERT INTO transactions
         (id, kind, amount, category, division, description, date, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING id, kind, amount, category, division, description, date, created_at, updated_at",
    )
    .bind(transaction.id)
    .bind(transaction.kind.as_str())
    .bind(transaction.amount)
    .bind(&transaction.category)
    .bind(&transaction.division)
    .bind(&transaction.description)
    .bind(transaction.date)
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .fetch_one(pool)
    .await
}

/// Writes every mutable column of `transaction` and refreshes `updated_at`.
/// `created_at` is never written. Returns `None` when the row is gone.
pub async fn update(
    pool: &PgPool,
    transaction: &Transaction,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "UPDATE transactions
         SET kind = $2, amount = $3, category = $4, division = $5,
             description = $6, date = $7, updated_at = $8
         WHERE id = $1
         RETURNING id, kind, amount, category, division, description, date, created_at, updated_at",
    )
    .bind(transaction.id)
    .bind(transaction.kind.as_str())
    .bind(transaction.amount)
    .bind(&transaction.category)
    .bind(&transaction.division)
    .bind(&transaction.description)
    .bind(transaction.date)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn summarize(pool: &PgPool) -> Result<Summary, sqlx::Error> {
    let (total_income, total_expense) = sqlx::query_as::<_, (f64, f64)>(
        "SELECT
             COALESCE(SUM(amount) FILTER (WHERE kind = 'income'), 0)::DOUBLE PRECISION,
             COALESCE(SUM(amount) FILTER (WHERE kind = 'expense'), 0)::DOUBLE PRECISION
         FROM transactions",
    )
    .fetch_one(pool)
    .await?;

    Ok(Summary::from_totals(total_income, total_expense))
}
