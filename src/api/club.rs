//! Membership and admin upgrades, both unlocked by a shared passcode.

use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::info;

use super::gates::Principal;
use super::validation::{self, RawForm};
use super::{AppError, AppState};
use crate::views::View;

/// GET /join-club
pub async fn join_club_form(Extension(Principal(user)): Extension<Principal>) -> Response {
    View::JoinClub { errors: vec![] }.render_response(Some(&user))
}

/// POST /join-club
pub async fn join_club(
    State(state): State<Arc<AppState>>,
    Extension(Principal(user)): Extension<Principal>,
    Form(raw): Form<RawForm>,
) -> Result<Response, AppError> {
    let outcome = validation::passcode_form(&state.config().club.member_passcode)
        .validate(&raw, state.store())
        .await?;

    if !outcome.is_valid() {
        return Ok(View::JoinClub {
            errors: outcome.into_errors(),
        }
        .render_response(Some(&user)));
    }

    let user = state.auth().grant_membership(user.id).await?;
    info!(user_id = %user.id, "Membership granted");
    Ok(Redirect::to("/").into_response())
}

/// GET /admin-access
pub async fn admin_access_form(Extension(Principal(user)): Extension<Principal>) -> Response {
    View::AdminAccess { errors: vec![] }.render_response(Some(&user))
}

/// POST /admin-access
pub async fn admin_access(
    State(state): State<Arc<AppState>>,
    Extension(Principal(user)): Extension<Principal>,
    Form(raw): Form<RawForm>,
) -> Result<Response, AppError> {
    let outcome = validation::passcode_form(&state.config().club.admin_passcode)
        .validate(&raw, state.store())
        .await?;

    if !outcome.is_valid() {
        return Ok(View::AdminAccess {
            errors: outcome.into_errors(),
        }
        .render_response(Some(&user)));
    }

    let user = state.auth().grant_admin(user.id).await?;
    info!(user_id = %user.id, "Admin rights granted");
    Ok(Redirect::to("/").into_response())
}
