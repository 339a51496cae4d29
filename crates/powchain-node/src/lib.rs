pub mod constants;
pub mod error;
pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use powchain_core::Ledger;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;

/// Shared node state.
///
/// Every ledger mutation goes through the write half of `ledger`, so a mined
/// block's transactions are exactly the pending set at the moment it is
/// sealed. `mining` admits one proof search at a time; the search itself runs
/// without holding the ledger lock.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub mining: Arc<Mutex<()>>,
    pub node_id: Arc<str>,
    /// Upper bound on proof candidates per mining request. `None` searches forever.
    pub max_attempts: Option<u64>,
}

impl AppState {
    pub fn new(node_id: impl Into<Arc<str>>, max_attempts: Option<u64>) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(Ledger::new())),
            mining: Arc::new(Mutex::new(())),
            node_id: node_id.into(),
            max_attempts,
        }
    }
}

/// Dash-less random identifier used as the mining reward address.
pub fn generate_node_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/mine", get(routes::mine))
        .route("/transactions/new", post(routes::new_transaction))
        .route("/chain", get(routes::full_chain))
        .route("/chain/validate", get(routes::validate_chain))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_dashless_hex() {
        let id = generate_node_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_node_id());
    }
}
