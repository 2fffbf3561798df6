use crate::service::{ChatService, ServiceError};
use axum::{
    extract::{Extension, Query},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const STATUS_TEXT: &str = "Chat memory relay server running";

pub fn build_router(service: Arc<ChatService>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/chat", get(chat))
        .route("/setname", get(set_name))
        .route("/forget", get(forget))
        .route("/forgetall", get(forget_all))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(service))
}

async fn status() -> &'static str {
    STATUS_TEXT
}

#[derive(Debug, Deserialize)]
struct ChatParams {
    user: Option<String>,
    query: Option<String>,
}

async fn chat(
    Extension(service): Extension<Arc<ChatService>>,
    Query(params): Query<ChatParams>,
) -> Result<String, ServiceError> {
    service
        .chat(
            params.user.as_deref().unwrap_or_default(),
            params.query.as_deref().unwrap_or_default(),
        )
        .await
}

#[derive(Debug, Deserialize)]
struct SetNameParams {
    user: Option<String>,
    name: Option<String>,
}

async fn set_name(
    Extension(service): Extension<Arc<ChatService>>,
    Query(params): Query<SetNameParams>,
) -> Result<String, ServiceError> {
    service
        .set_name(
            params.user.as_deref().unwrap_or_default(),
            params.name.as_deref().unwrap_or_default(),
        )
        .await
}

#[derive(Debug, Deserialize)]
struct ForgetParams {
    user: Option<String>,
}

async fn forget(
    Extension(service): Extension<Arc<ChatService>>,
    Query(params): Query<ForgetParams>,
) -> Result<String, ServiceError> {
    service
        .forget(params.user.as_deref().unwrap_or_default())
        .await
}

async fn forget_all(
    Extension(service): Extension<Arc<ChatService>>,
) -> Result<String, ServiceError> {
    service.forget_all().await
}
