use crate::service::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Every outcome is a plain-text 200; chat clients display the body as-is
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.to_string()).into_response()
    }
}
