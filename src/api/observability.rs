use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{sync::Arc, time::Instant};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::AppState;
use super::session::CurrentUser;

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

/// Labels a request for metrics without letting path parameters explode cardinality.
fn route_label(matched_path: Option<&str>, uri: &str) -> String {
    match matched_path {
        Some(route) => route.to_string(),
        None if uri.starts_with("/static/") => "/static/{*path}".to_string(),
        None => "unmatched".to_string(),
    }
}

/// How a forum request ended, as seen from its status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Rendered,
    Redirected,
    Unauthorized,
    NotFound,
    RateLimited,
    Rejected,
    Failed,
}

impl Outcome {
    fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            s if s.is_server_error() => Self::Failed,
            s if s.is_client_error() => Self::Rejected,
            s if s.is_redirection() => Self::Redirected,
            _ => Self::Rendered,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Rendered => "rendered",
            Self::Redirected => "redirected",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Wraps each request in a span and records who was served and how it ended.
///
/// The role comes from the [`CurrentUser`] the session layer leaves on the
/// response; assets and unknown routes count as anonymous.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let route = route_label(
        req.extensions().get::<MatchedPath>().map(MatchedPath::as_str),
        &path,
    );

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %route,
        user_id = tracing::field::Empty,
        role = tracing::field::Empty,
    );

    async move {
        let response = next.run(req).await;

        let role = response
            .extensions()
            .get::<CurrentUser>()
            .map_or("anonymous", CurrentUser::role);
        let outcome = Outcome::from_status(response.status());
        let elapsed = start.elapsed();
        tracing::Span::current().record("role", role);

        let timing_labels = [("method", method.to_string()), ("route", route)];
        metrics::histogram!("http_request_duration_seconds", &timing_labels)
            .record(elapsed.as_secs_f64());

        let [method_pair, route_pair] = timing_labels;
        let labels = [
            method_pair,
            route_pair,
            ("outcome", outcome.as_str().to_string()),
            ("role", role.to_string()),
        ];
        metrics::counter!("http_requests_total", &labels).increment(1);

        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let status = response.status().as_u16();
        if outcome == Outcome::Failed {
            warn!(status, duration_ms, outcome = outcome.as_str(), "Request failed");
        } else {
            info!(status, duration_ms, outcome = outcome.as_str(), "Request finished");
        }

        response
    }
    .instrument(span)
    .await
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static(
            "default-src 'self'; img-src 'self' data:; style-src 'self'; form-action 'self'; frame-ancestors 'none'; base-uri 'self'",
        ),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_paths_share_one_label() {
        assert_eq!(route_label(None, "/wp-admin"), "unmatched");
        assert_eq!(route_label(None, "/static/style.css"), "/static/{*path}");
        assert_eq!(
            route_label(Some("/messages/{id}/delete"), "/messages/4/delete"),
            "/messages/{id}/delete"
        );
    }

    #[test]
    fn outcomes_follow_the_forum_flows() {
        assert_eq!(Outcome::from_status(StatusCode::OK), Outcome::Rendered);
        assert_eq!(
            Outcome::from_status(StatusCode::SEE_OTHER),
            Outcome::Redirected
        );
        assert_eq!(
            Outcome::from_status(StatusCode::UNAUTHORIZED),
            Outcome::Unauthorized
        );
        assert_eq!(
            Outcome::from_status(StatusCode::TOO_MANY_REQUESTS),
            Outcome::RateLimited
        );
        assert_eq!(
            Outcome::from_status(StatusCode::BAD_REQUEST),
            Outcome::Rejected
        );
        assert_eq!(
            Outcome::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            Outcome::Failed
        );
    }
}
