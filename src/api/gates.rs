//! Per-route authorization gates.

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::MethodRouter,
};

use super::session::CurrentUser;
use crate::db::User;
use crate::views::View;

/// The principal of a request that passed [`Gate::Authenticated`].
#[derive(Debug, Clone)]
pub struct Principal(pub User);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Requires a session principal; renders the authorization error view otherwise.
    Authenticated,
    /// Requires the principal to be an admin; redirects home otherwise.
    /// Only meaningful after [`Gate::Authenticated`].
    Admin,
}

pub async fn require_authenticated(mut request: Request, next: Next) -> Response {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .and_then(|current| current.0.clone());

    match user {
        Some(user) => {
            request.extensions_mut().insert(Principal(user));
            next.run(request).await
        }
        None => View::AuthorizationError.render_response(None),
    }
}

pub async fn require_admin(request: Request, next: Next) -> Response {
    let is_admin = request
        .extensions()
        .get::<Principal>()
        .is_some_and(|principal| principal.0.admin);

    if is_admin {
        next.run(request).await
    } else {
        Redirect::to("/").into_response()
    }
}

/// Wraps `route` so `gates` run in the given order before the handler.
pub fn gated<S>(route: MethodRouter<S>, gates: &[Gate]) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    // route_layer wraps, so the last layer added runs first.
    gates.iter().rev().fold(route, |route, gate| match gate {
        Gate::Authenticated => route.route_layer(middleware::from_fn(require_authenticated)),
        Gate::Admin => route.route_layer(middleware::from_fn(require_admin)),
    })
}
