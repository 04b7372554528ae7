use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{get_codes, get_invite_codes, get_unused_invite_code, health_check};
use crate::state::AppState;

/// 构建应用路由
///
/// CORS全放开,与原有前端部署形态保持一致
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/codes", get(get_codes))
        .route("/invite_codes", get(get_invite_codes))
        .route("/get_invite_code", get(get_unused_invite_code));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(state)
}
