use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use crate::validation::RuleFailure;

#[derive(Debug, Error, Diagnostic)]
pub enum LincError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(linc::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(linc::config))]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(linc::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    #[diagnostic(code(linc::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Authentication required")]
    #[diagnostic(code(linc::unauthorized))]
    Unauthorized,

    /// Rendered exactly like `NotFound`, so a record outside the caller's
    /// scope looks the same as a missing one.
    #[error("Access denied: {0}")]
    #[diagnostic(code(linc::authorization_denied))]
    AuthorizationDenied(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(linc::not_found))]
    NotFound(String),

    #[error("Validation failed: {}", rule_codes(.0))]
    #[diagnostic(
        code(linc::validation_failed),
        help("Every failing rule is listed; correct them all and resubmit")
    )]
    ValidationFailed(Vec<RuleFailure>),

    #[error("Bad request: {0}")]
    #[diagnostic(code(linc::bad_request))]
    BadRequest(String),

    #[error("Conflict: {0}")]
    #[diagnostic(code(linc::conflict))]
    Conflict(String),

    #[error("Country `{0}` is not enabled")]
    #[diagnostic(
        code(linc::unknown_country),
        help("Add the country under [countries] in the configuration file")
    )]
    UnknownCountry(String),

    #[error("{0}")]
    #[diagnostic(code(linc::other))]
    Other(String),
}

fn rule_codes(failures: &[RuleFailure]) -> String {
    failures
        .iter()
        .map(|f| f.rule_code)
        .collect::<Vec<_>>()
        .join(", ")
}

impl IntoResponse for LincError {
    fn into_response(self) -> Response {
        match self {
            LincError::AuthorizationDenied(_) | LincError::NotFound(_) => {
                tracing::debug!(error = %self, "request resolved to not_found");
                (StatusCode::NOT_FOUND, Json(json!({"error": "not_found"}))).into_response()
            }
            LincError::ValidationFailed(failures) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": "validation_failed", "failures": failures})),
            )
                .into_response(),
            LincError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "invalid_token"})),
            )
                .into_response(),
            LincError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "bad_request", "error_description": message})),
            )
                .into_response(),
            LincError::Conflict(message) => (
                StatusCode::CONFLICT,
                Json(json!({"error": "conflict", "error_description": message})),
            )
                .into_response(),
            LincError::UnknownCountry(code) => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "unknown_country", "country": code})),
            )
                .into_response(),
            other => {
                tracing::error!(error = %other, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal_error"})),
                )
                    .into_response()
            }
        }
    }
}

/// Maps unique-constraint violations to `Conflict`; everything else stays a
/// database error.
pub fn map_unique(err: sea_orm::DbErr, what: &str) -> LincError {
    match err.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
            LincError::Conflict(format!("{what} already exists"))
        }
        _ => LincError::Db(err),
    }
}
