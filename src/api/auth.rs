use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::info;

use super::session::{self, CurrentUser};
use super::validation::{self, RawForm, Validated, messages::EMAIL_TAKEN};
use super::{AppError, AppState};
use crate::services::{AuthError, Registration};
use crate::views::{RegistrationPreview, View};

// ============================================================================
// Registration
// ============================================================================

/// GET /auth/register
pub async fn register_form(Extension(current): Extension<CurrentUser>) -> Response {
    View::Register {
        preview: RegistrationPreview::default(),
        errors: vec![],
    }
    .render_response(current.user())
}

/// POST /auth/register
///
/// The password is hashed only after every field validated. The redirect is
/// sent after the user row exists.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Form(raw): Form<RawForm>,
) -> Result<Response, AppError> {
    let mut outcome = validation::registration_form()
        .validate(&raw, state.store())
        .await?;

    if !outcome.is_valid() {
        return Ok(register_again(&current, outcome));
    }

    let registration = Registration {
        firstname: outcome.value("firstname").to_string(),
        lastname: outcome.value("lastname").to_string(),
        email: outcome.value("email").to_string(),
        password: outcome.value("password").to_string(),
    };

    match state.auth().register(registration).await {
        Ok(user) => {
            info!(user_id = %user.id, "User registered");
            metrics::counter!("clubhouse_registrations_total").increment(1);
            Ok(Redirect::to("/auth/login").into_response())
        }
        // Lost a race with a concurrent registration for the same email.
        Err(AuthError::EmailTaken) => {
            outcome.push_error("email", EMAIL_TAKEN);
            Ok(register_again(&current, outcome))
        }
        Err(e) => Err(e.into()),
    }
}

fn register_again(current: &CurrentUser, outcome: Validated) -> Response {
    let preview = RegistrationPreview {
        firstname: outcome.value("firstname").to_string(),
        lastname: outcome.value("lastname").to_string(),
        email: outcome.value("email").to_string(),
    };

    View::Register {
        preview,
        errors: outcome.into_errors(),
    }
    .render_response(current.user())
}

// ============================================================================
// Login / logout
// ============================================================================

/// GET /auth/login
pub async fn login_form(Extension(current): Extension<CurrentUser>) -> Response {
    View::Login {
        email: String::new(),
        errors: vec![],
    }
    .render_response(current.user())
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    session: Session,
    Form(raw): Form<RawForm>,
) -> Result<Response, AppError> {
    let mut outcome = validation::login_form()
        .validate(&raw, state.store())
        .await?;

    if !outcome.is_valid() {
        return Ok(login_again(&current, outcome));
    }

    let verified = state
        .auth()
        .verify_credentials(outcome.value("email"), outcome.value("password"))
        .await;

    match verified {
        Ok(user) => {
            session::establish(&session, &user).await?;
            info!(user_id = %user.id, "User logged in");
            metrics::counter!("clubhouse_logins_total", "outcome" => "success").increment(1);
            Ok(Redirect::to("/").into_response())
        }
        Err(e) if e.is_credential_failure() => {
            let field = if matches!(e, AuthError::NoSuchUser) {
                "email"
            } else {
                "password"
            };
            info!(reason = %e, "Login rejected");
            metrics::counter!("clubhouse_logins_total", "outcome" => "failure").increment(1);
            outcome.push_error(field, e.to_string());
            Ok(login_again(&current, outcome))
        }
        Err(e) => Err(e.into()),
    }
}

fn login_again(current: &CurrentUser, outcome: Validated) -> Response {
    View::Login {
        email: outcome.value("email").to_string(),
        errors: outcome.into_errors(),
    }
    .render_response(current.user())
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Redirect {
    session::tear_down(&session).await;
    Redirect::to("/")
}
