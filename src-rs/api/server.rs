use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::api::handlers::{
    handle_compare, handle_dividend_yield, handle_execute, handle_health, handle_price_return, handle_runs,
    handle_search, handle_total_return, AppState,
};

pub struct AgentServer {
    pub port: u16,
    pub state: AppState,
}

/// Calculation routes are always mounted; `/execute` and `/runs` need an
/// agent and `/search` a search provider.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/price-return", post(handle_price_return))
        .route("/dividend-yield", post(handle_dividend_yield))
        .route("/total-return", post(handle_total_return))
        .route("/compare", post(handle_compare))
        .route("/search", post(handle_search))
        .route("/runs", get(handle_runs))
        .route("/execute", post(handle_execute))
        .with_state(state)
}

impl AgentServer {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }

    pub async fn start(&self) -> Result<(), String> {
        let app = router(self.state.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!(
            %addr,
            agent = self.state.agent.is_some(),
            search = self.state.search.is_some(),
            "listening"
        );
        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .await
            .map_err(|err| err.to_string())
    }
}
