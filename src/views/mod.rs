//! Server-rendered pages.
//!
//! Every page is a [`View`] value. Handlers build one and hand it to
//! [`View::render_response`] together with the current principal, which the
//! layout uses for navigation.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::api::validation::FieldError;
use crate::db::{Message, User};

mod pages;

/// Values echoed back into the registration form after a failed submit.
///
/// The password fields are never echoed.
#[derive(Debug, Clone, Default)]
pub struct RegistrationPreview {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub enum View {
    Home {
        messages: Vec<Message>,
    },
    Register {
        preview: RegistrationPreview,
        errors: Vec<FieldError>,
    },
    Login {
        email: String,
        errors: Vec<FieldError>,
    },
    CreateMessage {
        title: String,
        text: String,
        errors: Vec<FieldError>,
    },
    JoinClub {
        errors: Vec<FieldError>,
    },
    AdminAccess {
        errors: Vec<FieldError>,
    },
    /// Shown when a gated route is hit without a session principal.
    AuthorizationError,
    Error {
        status: StatusCode,
        message: String,
        detail: Option<String>,
    },
}

impl View {
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Home { .. } => "Home",
            Self::Register { .. } => "Sign up",
            Self::Login { .. } => "Log in",
            Self::CreateMessage { .. } => "New message",
            Self::JoinClub { .. } => "Join the club",
            Self::AdminAccess { .. } => "Admin access",
            Self::AuthorizationError => "Not authorized",
            Self::Error { .. } => "Error",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::AuthorizationError => StatusCode::UNAUTHORIZED,
            Self::Error { status, .. } => *status,
            _ => StatusCode::OK,
        }
    }

    #[must_use]
    pub fn render(&self, viewer: Option<&User>) -> Html<String> {
        let body = match self {
            Self::Home { messages } => pages::home(messages, viewer),
            Self::Register { preview, errors } => pages::register(preview, errors),
            Self::Login { email, errors } => pages::login(email, errors),
            Self::CreateMessage {
                title,
                text,
                errors,
            } => pages::create_message(title, text, errors),
            Self::JoinClub { errors } => pages::passcode(
                "Join the club",
                "Enter the club password to see who wrote what.",
                "/join-club",
                errors,
            ),
            Self::AdminAccess { errors } => pages::passcode(
                "Admin access",
                "Enter the admin password to moderate messages.",
                "/admin-access",
                errors,
            ),
            Self::AuthorizationError => pages::authorization_error(),
            Self::Error {
                status,
                message,
                detail,
            } => pages::error(*status, message, detail.as_deref()),
        };

        Html(pages::layout(self.title(), viewer, &body))
    }

    /// Renders the page with its status code.
    #[must_use]
    pub fn render_response(&self, viewer: Option<&User>) -> Response {
        (self.status(), self.render(viewer)).into_response()
    }
}

/// HTML-encodes dynamic text.
///
/// Input is decoded first so values already escaped by form validation are
/// not encoded twice.
#[must_use]
pub fn text(value: &str) -> String {
    let decoded = html_escape::decode_html_entities(value);
    html_escape::encode_safe(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageId, UserId};

    fn user(membership_status: bool, admin: bool) -> User {
        User {
            id: UserId::new(1),
            firstname: "Ann".to_string(),
            lastname: "Lee".to_string(),
            email: "ann@example.com".to_string(),
            membership_status,
            admin,
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn message() -> Message {
        Message {
            id: MessageId::new(7),
            title: "Hello".to_string(),
            text: "First post".to_string(),
            timestamp: "2024-03-05T14:30:00+00:00".to_string(),
            author_id: UserId::new(1),
            author: Some(user(true, false)),
        }
    }

    fn body(view: &View, viewer: Option<&User>) -> String {
        view.render(viewer).0
    }

    #[test]
    fn text_does_not_double_encode() {
        assert_eq!(text("a &amp; b"), "a &amp; b");
        assert_eq!(text("<b>"), "&lt;b&gt;");
        assert_eq!(text("&lt;b&gt;"), "&lt;b&gt;");
    }

    #[test]
    fn anonymous_nav_offers_login_and_signup() {
        let html = body(&View::Home { messages: vec![] }, None);
        assert!(html.contains("href=\"/auth/login\""));
        assert!(html.contains("href=\"/auth/register\""));
        assert!(!html.contains("action=\"/auth/logout\""));
    }

    #[test]
    fn authenticated_nav_offers_compose_and_logout() {
        let viewer = user(false, false);
        let html = body(&View::Home { messages: vec![] }, Some(&viewer));
        assert!(html.contains("href=\"/create-message\""));
        assert!(html.contains("href=\"/join-club\""));
        assert!(html.contains("href=\"/admin-access\""));
        assert!(html.contains("action=\"/auth/logout\""));
        assert!(html.contains("Ann Lee"));
    }

    #[test]
    fn authors_are_hidden_from_non_members() {
        let view = View::Home {
            messages: vec![message()],
        };

        let anonymous = body(&view, None);
        assert!(anonymous.contains("Hello"));
        assert!(!anonymous.contains("Ann Lee"));

        let outsider = user(false, false);
        let html = body(&view, Some(&outsider));
        assert!(!html.contains("Mar 5, 2024"));

        let member = user(true, false);
        let html = body(&view, Some(&member));
        assert!(html.contains("Ann Lee"));
        assert!(html.contains("Mar 5, 2024"));
        assert!(!html.contains("/messages/7/delete"));
    }

    #[test]
    fn admins_see_delete_buttons() {
        let admin = user(true, true);
        let html = body(
            &View::Home {
                messages: vec![message()],
            },
            Some(&admin),
        );
        assert!(html.contains("action=\"/messages/7/delete\""));
    }

    #[test]
    fn form_errors_are_listed_in_order() {
        let view = View::Login {
            email: "ann@example.com".to_string(),
            errors: vec![
                FieldError {
                    field: "email",
                    message: "first".to_string(),
                },
                FieldError {
                    field: "password",
                    message: "second".to_string(),
                },
            ],
        };
        let html = body(&view, None);
        let first = html.find("first").unwrap();
        let second = html.find("second").unwrap();
        assert!(first < second);
        assert!(html.contains("value=\"ann@example.com\""));
    }

    #[test]
    fn echoed_values_are_encoded() {
        let view = View::CreateMessage {
            title: "<script>".to_string(),
            text: String::new(),
            errors: vec![],
        };
        let html = body(&view, None);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn statuses_follow_the_page() {
        assert_eq!(View::AuthorizationError.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(View::JoinClub { errors: vec![] }.status(), StatusCode::OK);
        let error = View::Error {
            status: StatusCode::NOT_FOUND,
            message: "Page not found".to_string(),
            detail: None,
        };
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn error_detail_is_rendered_only_when_present() {
        let with_detail = View::Error {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Something went wrong".to_string(),
            detail: Some("Database error: locked".to_string()),
        };
        assert!(body(&with_detail, None).contains("Database error: locked"));

        let without = View::Error {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Something went wrong".to_string(),
            detail: None,
        };
        assert!(!body(&without, None).contains("<pre"));
    }
}
