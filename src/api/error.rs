use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;

use super::AppState;
use super::session::CurrentUser;
use crate::services::{AuthError, MessageError};
use crate::views::View;

/// Failures that end a request with an error page.
///
/// Validation, authentication and authorization outcomes are not errors at
/// this level; handlers render those as ordinary views.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Attached to every error response so the boundary can re-render it with diagnostics.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub message: &'static str,
    pub detail: String,
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::DatabaseError(_) | Self::SessionError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    pub fn session(err: impl std::fmt::Display) -> Self {
        Self::SessionError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::NotFound(_) => "Page not found",
            Self::RateLimited => "Too many requests, please try again in a minute",
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "Something went wrong"
            }
            Self::SessionError(msg) => {
                tracing::error!("Session error: {}", msg);
                "Something went wrong"
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Something went wrong"
            }
        };

        let mut response = View::Error {
            status,
            message: message.to_string(),
            detail: None,
        }
        .render_response(None);
        response.extensions_mut().insert(ErrorDetail {
            message,
            detail: self.to_string(),
        });
        response
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(format!("{err:#}"))
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::UserNotFound(id) => Self::NotFound(format!("User {id}")),
            other => Self::InternalError(other.to_string()),
        }
    }
}

impl From<MessageError> for AppError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::Database(msg) => Self::DatabaseError(msg),
            MessageError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::session(err)
    }
}

/// Re-renders error pages for the signed-in viewer, adding diagnostic detail
/// outside production.
pub async fn error_boundary(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let Some(ErrorDetail { message, detail }) = response.extensions().get::<ErrorDetail>().cloned()
    else {
        return response;
    };

    let show_detail = state.config().general.environment.shows_error_details();
    let viewer = response
        .extensions()
        .get::<CurrentUser>()
        .and_then(|current| current.user().cloned());
    if !show_detail && viewer.is_none() {
        return response;
    }

    let (parts, _) = response.into_parts();
    let page = View::Error {
        status: parts.status,
        message: message.to_string(),
        detail: show_detail.then_some(detail),
    }
    .render(viewer.as_ref());

    (parts, page).into_response()
}

/// Fallback for unknown routes.
pub async fn not_found(uri: axum::http::Uri) -> AppError {
    AppError::not_found(uri.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_failures_are_server_errors() {
        assert_eq!(
            AppError::DatabaseError("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::internal("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::not_found("/nope").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::RateLimited.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn auth_errors_map_by_kind() {
        let err: AppError = AuthError::Database("locked".into()).into();
        assert!(matches!(err, AppError::DatabaseError(_)));

        let err: AppError = AuthError::UserNotFound(crate::domain::UserId::new(3)).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn error_responses_carry_detail_for_the_boundary() {
        let response = AppError::internal("disk full").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.message, "Something went wrong");
        assert!(detail.detail.contains("disk full"));
    }

    #[test]
    fn error_conversions_work() {
        let db_err = sea_orm::DbErr::Custom("test".to_string());
        let auth_err: AuthError = db_err.into();
        let app_err: AppError = auth_err.into();
        assert!(matches!(app_err, AppError::DatabaseError(_)));
    }
}
