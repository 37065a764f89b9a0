use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use http::StatusCode;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    CreateTransaction, ListTransactionsQuery, Summary, Transaction, UpdateTransaction,
};
use crate::services::transaction_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .route("/summary", get(get_summary))
        .route("/:id", put(update_transaction).delete(delete_transaction))
}

/// Bodies sent without a JSON content type are read as `{}`.
fn json_or_default<T: Default>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

pub async fn list_transactions(
    State(state): State<AppState>,
    query: Result<Query<ListTransactionsQuery>, QueryRejection>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    info!("GET /api/transactions - Listing transactions");
    let Query(query) = query?;

    let transactions = transaction_service::list(state.store.as_ref(), query)
        .await
        .map_err(|e| {
            error!("Failed to fetch transactions: {}", e);
            e
        })?;

    Ok(Json(transactions))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<CreateTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    info!("POST /api/transactions - Creating transaction");
    let data = json_or_default(payload)?;

    let transaction = transaction_service::create(state.store.as_ref(), data, Utc::now())
        .await
        .map_err(|e| {
            error!("Failed to add transaction: {}", e);
            e
        })?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateTransaction>, JsonRejection>,
) -> Result<Json<Transaction>, AppError> {
    let Path(id) = id?;
    info!("PUT /api/transactions/{} - Updating transaction", id);
    let patch = json_or_default(payload)?;

    let transaction = transaction_service::update(state.store.as_ref(), id, patch, Utc::now())
        .await
        .map_err(|e| {
            error!("Failed to update transaction {}: {}", id, e);
            e
        })?;

    Ok(Json(transaction))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id?;
    info!("DELETE /api/transactions/{} - Deleting transaction", id);

    transaction_service::delete(state.store.as_ref(), id)
        .await
        .map_err(|e| {
            error!("Failed to delete transaction {}: {}", id, e);
            e
        })?;

    Ok(Json(json!({ "message": "Transaction deleted" })))
}

pub async fn get_summary(State(state): State<AppState>) -> Result<Json<Summary>, AppError> {
    info!("GET /api/transactions/summary - Computing totals");

    let summary = transaction_service::summary(state.store.as_ref())
        .await
        .map_err(|e| {
            error!("Failed to compute summary: {}", e);
            e
        })?;

    Ok(Json(summary))
}
