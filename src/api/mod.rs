use axum::{
    Router,
    handler::Handler,
    middleware,
    routing::{MethodFilter, MethodRouter, get, on},
};
use std::{sync::Arc, time::Duration};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{
    ExpiredDeletion, Expiry, MemoryStore, SessionManagerLayer, SessionStore, cookie::SameSite,
};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::{Config, ServerConfig, SessionStoreKind};
use crate::services::{AuthService, MessageService};
use crate::state::SharedState;

mod assets;
pub mod auth;
pub mod club;
mod error;
pub mod gates;
pub mod messages;
mod observability;
pub mod rate_limit;
pub mod session;
pub mod validation;

pub use error::{AppError, ErrorDetail};
pub use gates::Gate;
pub use rate_limit::RateLimiter;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub prometheus_handle: Option<PrometheusHandle>,

    /// Absent when `server.rate_limit_requests` is 0.
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn messages(&self) -> &Arc<dyn MessageService> {
        &self.shared.message_service
    }
}

pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let server = &shared.config.server;
    let rate_limiter = server.rate_limiting_enabled().then(|| {
        Arc::new(RateLimiter::new(
            server.rate_limit_requests,
            Duration::from_secs(server.rate_limit_window_secs),
        ))
    });

    Arc::new(AppState {
        shared,
        prometheus_handle,
        rate_limiter,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

// ============================================================================
// Route table
// ============================================================================

/// One row of the route table: method, path, the gates in run order, and the handler.
pub struct RouteEntry {
    pub method: MethodFilter,
    pub path: &'static str,
    pub gates: &'static [Gate],
    endpoint: MethodRouter<Arc<AppState>>,
}

impl RouteEntry {
    fn new<H, T>(
        method: MethodFilter,
        path: &'static str,
        gates: &'static [Gate],
        handler: H,
    ) -> Self
    where
        H: Handler<T, Arc<AppState>>,
        T: 'static,
    {
        Self {
            method,
            path,
            gates,
            endpoint: on(method, handler),
        }
    }

    fn into_method_router(self) -> MethodRouter<Arc<AppState>> {
        gates::gated(self.endpoint, self.gates)
    }
}

/// Every page route of the application.
#[must_use]
pub fn route_table() -> Vec<RouteEntry> {
    use Gate::{Admin, Authenticated};
    use MethodFilter as M;

    vec![
        RouteEntry::new(M::GET, "/", &[], messages::home),
        RouteEntry::new(M::GET, "/auth/register", &[], auth::register_form),
        RouteEntry::new(M::POST, "/auth/register", &[], auth::register),
        RouteEntry::new(M::GET, "/auth/login", &[], auth::login_form),
        RouteEntry::new(M::POST, "/auth/login", &[], auth::login),
        RouteEntry::new(M::POST, "/auth/logout", &[], auth::logout),
        RouteEntry::new(
            M::GET,
            "/create-message",
            &[Authenticated],
            messages::create_message_form,
        ),
        RouteEntry::new(
            M::POST,
            "/create-message",
            &[Authenticated],
            messages::create_message,
        ),
        RouteEntry::new(M::GET, "/join-club", &[Authenticated], club::join_club_form),
        RouteEntry::new(M::POST, "/join-club", &[Authenticated], club::join_club),
        RouteEntry::new(
            M::GET,
            "/admin-access",
            &[Authenticated],
            club::admin_access_form,
        ),
        RouteEntry::new(
            M::POST,
            "/admin-access",
            &[Authenticated],
            club::admin_access,
        ),
        RouteEntry::new(
            M::POST,
            "/messages/{id}/delete",
            &[Authenticated, Admin],
            messages::delete_message,
        ),
    ]
}

// ============================================================================
// Router
// ============================================================================

pub async fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let pages = route_table()
        .into_iter()
        .fold(Router::new(), |router, entry| {
            let path = entry.path;
            router.route(path, entry.into_method_router())
        })
        .fallback(error::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::resolve_principal,
        ));

    let server = &state.config().server;
    let pages = match server.session_store {
        SessionStoreKind::Memory => pages.layer(session_layer(MemoryStore::default(), server)),
        SessionStoreKind::Sqlite => {
            let store = SqliteStore::new(state.store().conn.get_sqlite_connection_pool().clone());
            store.migrate().await?;

            tokio::spawn(
                store
                    .clone()
                    .continuously_delete_expired(Duration::from_secs(60)),
            );

            pages.layer(session_layer(store, server))
        }
    };

    let mut app = Router::new()
        .merge(pages)
        .route("/static/{*path}", get(assets::serve_asset));

    if state.config().observability.metrics_enabled {
        app = app.route("/metrics", get(observability::get_metrics));
    }

    if let Some(limiter) = state.rate_limiter.clone() {
        let window = Duration::from_secs(state.config().server.rate_limit_window_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(window);
            loop {
                interval.tick().await;
                limiter.sweep();
            }
        });
    }

    Ok(app
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::error_boundary,
        ))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn session_layer<S: SessionStore>(store: S, server: &ServerConfig) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_secure(server.secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(i64::from(
            server.session_max_age_days,
        ))))
}
