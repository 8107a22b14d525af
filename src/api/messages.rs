use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::info;

use super::gates::Principal;
use super::session::CurrentUser;
use super::validation::{self, RawForm};
use super::{AppError, AppState};
use crate::domain::MessageId;
use crate::views::View;

/// GET /
pub async fn home(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    let messages = state.messages().list().await?;
    Ok(View::Home { messages }.render_response(current.user()))
}

/// GET /create-message
pub async fn create_message_form(Extension(Principal(user)): Extension<Principal>) -> Response {
    View::CreateMessage {
        title: String::new(),
        text: String::new(),
        errors: vec![],
    }
    .render_response(Some(&user))
}

/// POST /create-message
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    Extension(Principal(user)): Extension<Principal>,
    Form(raw): Form<RawForm>,
) -> Result<Response, AppError> {
    let outcome = validation::message_form()
        .validate(&raw, state.store())
        .await?;

    if !outcome.is_valid() {
        return Ok(View::CreateMessage {
            title: outcome.value("title").to_string(),
            text: outcome.value("text").to_string(),
            errors: outcome.into_errors(),
        }
        .render_response(Some(&user)));
    }

    let id = state
        .messages()
        .create(&user, outcome.value("title"), outcome.value("text"))
        .await?;

    info!(message_id = %id, user_id = %user.id, "Message created");
    metrics::counter!("clubhouse_messages_created_total").increment(1);
    Ok(Redirect::to("/").into_response())
}

/// POST /messages/{id}/delete
///
/// Deleting a message that does not exist is not an error. An id that is not
/// a number names no message either.
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Extension(Principal(user)): Extension<Principal>,
    Path(raw_id): Path<String>,
) -> Result<Redirect, AppError> {
    let Ok(id) = raw_id.parse::<i32>().map(MessageId::new) else {
        tracing::debug!(id = %raw_id, "Delete requested for a malformed message id");
        return Ok(Redirect::to("/"));
    };

    let removed = state.messages().delete(id).await?;

    if removed {
        info!(message_id = %id, user_id = %user.id, "Message deleted");
        metrics::counter!("clubhouse_messages_deleted_total").increment(1);
    } else {
        tracing::debug!(message_id = %id, "Delete requested for a missing message");
    }

    Ok(Redirect::to("/"))
}
