pub mod message;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::AppState;
use crate::middleware::log_errors;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let origin = match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!(
                "Invalid ALLOWED_ORIGIN {:?}, cross-origin requests disabled",
                allowed_origin
            );
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// 创建完整的应用路由
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origin);

    Router::new()
        .route("/PutMessage", post(message::put_message))
        .route("/msgs", get(message::get_messages))
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(log_errors))
        .layer(cors)
        .with_state(state)
}
