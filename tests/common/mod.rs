#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use clubhouse::api::{self, AppState};
use clubhouse::config::{Config, SessionStoreKind};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

pub const MEMBER_PASSCODE: &str = "let-me-in";
pub const ADMIN_PASSCODE: &str = "keys-to-the-castle";
pub const PASSWORD: &str = "Abcd123!";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Builds an app from the test defaults after `configure` adjusts them.
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let db_path = std::env::temp_dir().join(format!("clubhouse-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.server.session_store = SessionStoreKind::Memory;
    config.server.secure_cookies = false;
    config.club.member_passcode = MEMBER_PASSCODE.to_string();
    config.club.admin_passcode = ADMIN_PASSCODE.to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.observability.metrics_enabled = false;
    // Every request from a oneshot shares one client key.
    config.server.rate_limit_requests = 0;
    configure(&mut config);

    let state = api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let router = api::router(state.clone())
        .await
        .expect("Failed to build router");

    TestApp { router, state }
}

impl TestApp {
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();

        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                mime::APPLICATION_WWW_FORM_URLENCODED.as_ref(),
            );
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    pub async fn register(&self, firstname: &str, email: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/auth/register",
            &[
                ("firstname", firstname),
                ("lastname", "Lee"),
                ("email", email),
                ("password", password),
                ("password_confirmation", password),
            ],
            None,
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/auth/login",
            &[("email", email), ("password", password)],
            None,
        )
        .await
    }

    /// Registers and logs in, returning the session cookie.
    pub async fn signed_in(&self, firstname: &str, email: &str) -> String {
        let response = self.register(firstname, email, PASSWORD).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = self.login(email, PASSWORD).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_cookie(&response).expect("login should set a session cookie")
    }

    pub async fn signed_in_admin(&self, firstname: &str, email: &str) -> String {
        let cookie = self.signed_in(firstname, email).await;
        let response = self
            .post_form(
                "/admin-access",
                &[("passcode", ADMIN_PASSCODE)],
                Some(&cookie),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        cookie
    }
}

/// The `name=value` part of the session cookie, if the response set one.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("id="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
