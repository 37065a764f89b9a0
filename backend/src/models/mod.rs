mod transaction;

pub use transaction::{
    apply_patch, validate_new, CreateTransaction, ListTransactionsQuery, NewTransaction, Summary,
    Transaction, TransactionFilter, TransactionType, UpdateTransaction, ValidationErrors,
};
