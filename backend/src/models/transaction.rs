use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(format!(
                "`{}` is not a valid value, expected `income` or `expense`",
                other
            )),
        }
    }
}

// A single income or expense entry. `created_at` drives the edit window and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: f64,
    pub category: Option<String>,
    pub division: Option<String>,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub(crate) fn new(data: NewTransaction) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind: data.kind,
            amount: data.amount,
            category: data.category,
            division: data.division,
            description: data.description,
            date: data.date,
            created_at: now,
            updated_at: now,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Transaction {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("kind")?;
        let kind = kind
            .parse::<TransactionType>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "kind".to_string(),
                source: e.into(),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            kind,
            amount: row.try_get("amount")?,
            category: row.try_get("category")?,
            division: row.try_get("division")?,
            description: row.try_get("description")?,
            date: row.try_get("date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Body of `POST /api/transactions`, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTransaction {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub amount: Option<AmountInput>,
    pub category: Option<String>,
    pub division: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateInput>,
}

/// `amount` as sent by a client: a JSON number or a numeric string, as form
/// inputs produce. Anything else is kept so validation can report it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<f64> for AmountInput {
    fn from(value: f64) -> Self {
        AmountInput::Number(value)
    }
}

/// `date` as sent by a client: epoch milliseconds or a date string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Millis(i64),
    Text(String),
    Other(serde_json::Value),
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        DateInput::Text(value.to_string())
    }
}

impl DateInput {
    fn is_blank(&self) -> bool {
        matches!(self, DateInput::Text(text) if text.trim().is_empty())
    }
}

/// A create payload that passed validation, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionType,
    pub amount: f64,
    pub category: Option<String>,
    pub division: Option<String>,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
}

/// Sparse patch for `PUT /api/transactions/:id`.
///
/// The outer `Option` tells whether the field was sent at all, the inner one
/// whether it was `null`. Unknown keys (`id`, `createdAt`, ...) are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTransaction {
    #[serde(rename = "type", default, deserialize_with = "present")]
    pub kind: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub amount: Option<Option<AmountInput>>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub division: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub date: Option<Option<DateInput>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

/// Every field-level problem found in one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, reason: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(test)]
    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(|e| e.field).collect()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction validation failed: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", error.field, error.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Parses an RFC 3339 timestamp, a zone-less `YYYY-MM-DDTHH:MM:SS`, or a bare
/// `YYYY-MM-DD` date. Zone-less values are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_kind(value: &str, errors: &mut ValidationErrors) -> Option<TransactionType> {
    match value.parse() {
        Ok(kind) => Some(kind),
        Err(reason) => {
            errors.push("type", reason);
            None
        }
    }
}

fn parse_amount(value: &AmountInput, errors: &mut ValidationErrors) -> Option<f64> {
    let parsed = match value {
        AmountInput::Number(number) => Some(*number),
        AmountInput::Text(text) if text.trim().is_empty() => {
            errors.push("amount", "is required");
            return None;
        }
        AmountInput::Text(text) => text.trim().parse::<f64>().ok(),
        AmountInput::Other(_) => None,
    };

    match parsed {
        Some(amount) if amount.is_finite() => Some(amount),
        _ => {
            let shown = match value {
                AmountInput::Number(number) => number.to_string(),
                AmountInput::Text(text) => text.clone(),
                AmountInput::Other(other) => other.to_string(),
            };
            errors.push("amount", format!("`{}` is not a valid number", shown));
            None
        }
    }
}

fn parse_date(value: &DateInput, errors: &mut ValidationErrors) -> Option<DateTime<Utc>> {
    let parsed = match value {
        DateInput::Millis(millis) => Utc.timestamp_millis_opt(*millis).single(),
        DateInput::Text(text) => parse_timestamp(text),
        DateInput::Other(_) => None,
    };
    if parsed.is_none() {
        let shown = match value {
            DateInput::Millis(millis) => millis.to_string(),
            DateInput::Text(text) => text.clone(),
            DateInput::Other(other) => other.to_string(),
        };
        errors.push("date", format!("`{}` is not a valid date", shown));
    }
    parsed
}

/// Checks a create payload. A missing or blank `date` becomes `now`.
pub fn validate_new(
    input: CreateTransaction,
    now: DateTime<Utc>,
) -> Result<NewTransaction, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let kind = match input.kind.as_deref() {
        Some(kind) => parse_kind(kind, &mut errors),
        None => {
            errors.push("type", "is required");
            None
        }
    };

    let amount = match &input.amount {
        Some(amount) => parse_amount(amount, &mut errors),
        None => {
            errors.push("amount", "is required");
            None
        }
    };

    let date = match &input.date {
        Some(date) if !date.is_blank() => parse_date(date, &mut errors),
        _ => Some(now),
    };

    match (kind, amount, date) {
        (Some(kind), Some(amount), Some(date)) if errors.is_empty() => Ok(NewTransaction {
            kind,
            amount,
            category: input.category,
            division: input.division,
            description: input.description,
            date,
        }),
        _ => Err(errors),
    }
}

/// Shallow merge: every field present in `patch` replaces the one in
/// `existing`, absent fields are kept. `existing` itself is left untouched.
pub fn apply_patch(
    existing: &Transaction,
    patch: UpdateTransaction,
) -> Result<Transaction, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut merged = existing.clone();

    match patch.kind {
        Some(Some(kind)) => {
            if let Some(kind) = parse_kind(&kind, &mut errors) {
                merged.kind = kind;
            }
        }
        Some(None) => errors.push("type", "is required"),
        None => {}
    }

    match patch.amount {
        Some(Some(amount)) => {
            if let Some(amount) = parse_amount(&amount, &mut errors) {
                merged.amount = amount;
            }
        }
        Some(None) => errors.push("amount", "is required"),
        None => {}
    }

    match patch.date {
        Some(Some(date)) => {
            if let Some(date) = parse_date(&date, &mut errors) {
                merged.date = date;
            }
        }
        Some(None) => errors.push("date", "cannot be null"),
        None => {}
    }

    if let Some(category) = patch.category {
        merged.category = category;
    }
    if let Some(division) = patch.division {
        merged.division = division;
    }
    if let Some(description) = patch.description {
        merged.description = description;
    }

    errors.into_result(|| merged)
}

/// Query string of `GET /api/transactions`. Empty values count as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub division: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Inclusive on both ends.
    pub date_range: Option<RangeInclusive<DateTime<Utc>>>,
    pub kind: Option<TransactionType>,
    pub division: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TransactionFilter {
    /// The date range only applies when both bounds are given.
    pub fn from_query(query: ListTransactionsQuery) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let date_range = match (non_empty(query.start_date), non_empty(query.end_date)) {
            (Some(start), Some(end)) => {
                let start_ts = parse_timestamp(&start);
                let end_ts = parse_timestamp(&end);
                if start_ts.is_none() {
                    errors.push("startDate", format!("`{}` is not a valid date", start));
                }
                if end_ts.is_none() {
                    errors.push("endDate", format!("`{}` is not a valid date", end));
                }
                start_ts.zip(end_ts).map(|(start, end)| start..=end)
            }
            _ => None,
        };

        let kind = non_empty(query.kind).and_then(|kind| parse_kind(&kind, &mut errors));
        let division = non_empty(query.division);

        errors.into_result(|| Self {
            date_range,
            kind,
            division,
        })
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(&transaction.date) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if transaction.kind != kind {
                return false;
            }
        }
        if let Some(division) = &self.division {
            if transaction.division.as_deref() != Some(division.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
}

impl Summary {
    pub fn from_totals(total_income: f64, total_expense: f64) -> Self {
        Self {
            total_income,
            total_expense,
            balance: total_income - total_expense,
        }
    }
}
