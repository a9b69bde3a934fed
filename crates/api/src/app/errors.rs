use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use opsgate_accounts::{AccountError, RepositoryError};

pub fn account_error_to_response(err: AccountError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        AccountError::DuplicateUsername(_) => {
            json_error(StatusCode::CONFLICT, "duplicate_username", message)
        }
        AccountError::UnknownRole(_) => json_error(StatusCode::BAD_REQUEST, "unknown_role", message),
        AccountError::InvalidPermission(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_permission", message)
        }
        AccountError::EmptyUpdate => json_error(StatusCode::BAD_REQUEST, "empty_update", message),
        AccountError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", message),
        AccountError::ProtectedAccount => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "protected_account", message)
        }
        AccountError::LastAdminViolation => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "last_admin_violation", message)
        }
        AccountError::Repository(RepositoryError::Conflict(_)) => {
            json_error(StatusCode::CONFLICT, "conflict", message)
        }
        AccountError::Repository(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message)
        }
        AccountError::Credential(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "credential_error", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
