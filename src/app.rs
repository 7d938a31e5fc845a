use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::handlers::public;
use crate::middleware::jwt_auth_middleware;
use crate::srag::SragService;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: SragService,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(service: SragService, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self { service, jwt_secret: jwt_secret.into() }
    }
}

/// Routes without the global CORS/trace layers, which the server adds from config
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected
        .nest("/api/v1/srag", srag_routes(state.clone()))
        .fallback(public::not_found)
        .with_state(state)
}

fn srag_routes(state: AppState) -> Router<AppState> {
    use crate::handlers::protected::srag;

    Router::new()
        .route("/health", get(srag::health))
        .route("/metrics", get(srag::metrics))
        .route("/chart", get(srag::chart))
        .route("/list", get(srag::list))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}
