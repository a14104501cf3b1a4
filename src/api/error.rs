use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::dto::MessageResponse;

/// API-layer error type. Details are logged where the error is raised;
/// clients only ever see the fixed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// 500 - the composite document could not be built
    #[error("Error reading or processing data files on the server.")]
    DataUnavailable,

    /// 500 - the template could not be saved
    #[error("Error writing data file.")]
    WriteFailed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = MessageResponse::new(self.to_string());
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
