//! 路由配置

use axum::{
    Router,
    http::Method,
    middleware::from_fn,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};

use order_shared::observability::middleware as obs_middleware;

use super::handlers;
use super::state::AppState;

/// 构建完整的 HTTP 路由
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/order/{id}", get(handlers::get_order))
        .route("/customer/{id}/orders", get(handlers::customer_orders))
        .fallback(handlers::route_not_found)
        .layer(cors)
        .layer(from_fn(obs_middleware::http_tracing))
        .layer(from_fn(obs_middleware::request_id))
        .with_state(state)
}
