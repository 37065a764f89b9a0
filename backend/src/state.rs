use std::sync::Arc;

use crate::store::TransactionStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }
}
