use axum::http::StatusCode;
use axum::Json;
use library::BatchError;

use crate::state::ErrorResponse;

pub fn json_error(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn batch_error(err: BatchError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        BatchError::InvalidDirectory(_) | BatchError::NoInputRoot => StatusCode::BAD_REQUEST,
        BatchError::AlreadyRunning => StatusCode::CONFLICT,
        BatchError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.to_string())
}
