//! Session principal resolution.
//!
//! Only the user id is stored in the session. It is turned back into a full
//! [`User`] on every request so membership and admin changes show up on the
//! next page load.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{AppError, AppState};
use crate::db::User;
use crate::domain::UserId;
use crate::services::{AuthError, AuthService};

pub const PRINCIPAL_KEY: &str = "user_id";

/// The resolved principal for this request, if any.
///
/// Present on the request and on the response of every page route, so outer
/// layers can see who was served.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    /// Coarse label for logs and metrics.
    #[must_use]
    pub fn role(&self) -> &'static str {
        match &self.0 {
            None => "anonymous",
            Some(user) if user.admin => "admin",
            Some(user) if user.membership_status => "member",
            Some(_) => "user",
        }
    }
}

#[must_use]
pub const fn serialize(user: &User) -> UserId {
    user.id
}

/// `Ok(None)` when the stored id no longer matches a user.
pub async fn deserialize(auth: &dyn AuthService, id: UserId) -> Result<Option<User>, AuthError> {
    auth.find_principal(id).await
}

/// Binds `user` to the session, rotating the session id first.
pub async fn establish(session: &Session, user: &User) -> Result<(), AppError> {
    session.cycle_id().await?;
    session.insert(PRINCIPAL_KEY, serialize(user)).await?;
    Ok(())
}

/// Drops the session. Safe to call when nothing is established.
pub async fn tear_down(session: &Session) {
    if let Err(e) = session.flush().await {
        tracing::warn!(error = %e, "Failed to flush session");
    }
}

pub async fn resolve_principal(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = match session.get::<UserId>(PRINCIPAL_KEY).await? {
        Some(id) => {
            let user = deserialize(state.auth().as_ref(), id).await?;
            if user.is_some() {
                tracing::Span::current().record("user_id", id.value());
            } else {
                tracing::debug!(user_id = %id, "Session refers to a missing user, clearing it");
                session.remove::<UserId>(PRINCIPAL_KEY).await?;
            }
            user
        }
        None => None,
    };

    let current = CurrentUser(principal);
    request.extensions_mut().insert(current.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(current);
    Ok(response)
}
