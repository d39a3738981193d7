//! Unified error handling for the web layer.
//!
//! Handlers return [`AppResult`] and use `?` freely; [`AppError`] decides the
//! HTTP outcome. Validation and not-found errors become 4xx pages with a
//! message, auth errors send the user back through the consent flow, and
//! upstream/storage failures are logged and shown as a retryable failure page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use mailtask_types::TaskInputError;
use thiserror::Error;

use crate::repository::StorageError;
use crate::views;

/// Credential problems.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable credentials; the user has to go through consent.
    #[error("authorization required")]
    Required,

    /// Consent denied, state mismatch, or the token endpoint refused us.
    #[error("authorization failed: {0}")]
    Failed(String),
}

/// Failures talking to Google APIs.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} request timed out after {seconds}s")]
    Timeout { service: &'static str, seconds: u64 },

    #[error("{service} request failed: {reason}")]
    Request {
        service: &'static str,
        reason: String,
    },

    /// Google rejected the access token (revoked or scope removed).
    #[error("{service} rejected the access token")]
    Unauthorized { service: &'static str },

    #[error("{service} returned an unusable response: {reason}")]
    Malformed {
        service: &'static str,
        reason: String,
    },
}

impl UpstreamError {
    pub fn request(service: &'static str, err: impl std::fmt::Display) -> Self {
        UpstreamError::Request {
            service,
            reason: err.to_string(),
        }
    }

    pub fn malformed(service: &'static str, reason: impl Into<String>) -> Self {
        UpstreamError::Malformed {
            service,
            reason: reason.into(),
        }
    }
}

/// Unified error type for handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid form data
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Environment variable missing or unusable
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a not found error with a custom message
    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

impl From<TaskInputError> for AppError {
    fn from(err: TaskInputError) -> Self {
        AppError::Validation(err.to_string())
    }
}

const RETRY_MESSAGE: &str = "Something went wrong on our side. Please try again.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Auth(AuthError::Required) => Redirect::to("/authorize").into_response(),
            AppError::Auth(AuthError::Failed(reason)) => {
                tracing::warn!("Authorization failed: {}", reason);
                views::error_page(
                    StatusCode::UNAUTHORIZED,
                    "Authorization failed",
                    reason,
                    Some("/reauthorize"),
                )
            }
            AppError::NotFound(resource) => views::error_page(
                StatusCode::NOT_FOUND,
                "Not found",
                &format!("{} not found", resource),
                None,
            ),
            AppError::Validation(msg) => {
                views::error_page(StatusCode::BAD_REQUEST, "Invalid request", msg, None)
            }
            AppError::Upstream(UpstreamError::Unauthorized { service }) => {
                tracing::warn!("{} rejected the access token, asking for consent again", service);
                Redirect::to("/reauthorize").into_response()
            }
            AppError::Upstream(e) => {
                tracing::error!("Upstream error: {}", e);
                views::error_page(
                    StatusCode::BAD_GATEWAY,
                    "Google is not responding",
                    "A request to Google failed. Please try again.",
                    Some("/authorize"),
                )
            }
            AppError::Storage(StorageError::Pool(e)) => {
                tracing::error!("Connection pool error: {}", e);
                views::error_page(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database unavailable",
                    RETRY_MESSAGE,
                    None,
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Database error: {:?}", e);
                views::error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error",
                    RETRY_MESSAGE,
                    None,
                )
            }
            AppError::Template(e) => {
                tracing::error!("Template error: {:?}", e);
                views::error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error",
                    RETRY_MESSAGE,
                    None,
                )
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                views::error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error",
                    RETRY_MESSAGE,
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                views::error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error",
                    RETRY_MESSAGE,
                    None,
                )
            }
        }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
