//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints of the quiz backend:
//! - Liveness and banner
//! - Auth endpoints (code exchange, current user, logout)
//! - Quiz session endpoints
//! - Admin endpoints (categories and questions)

pub mod admin;
pub mod auth;
pub mod middleware;
pub mod sessions;


use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/sessions", sessions::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(cors_origin, "invalid CORS origin, cross-origin requests disabled");
            cors
        }
    };

    Router::new()
        .route("/", get(banner))
        .route("/health", any(health))
        .nest("/api", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /
async fn banner() -> &'static str {
    concat!("quiz-backend ", env!("CARGO_PKG_VERSION"))
}

/// ANY /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
