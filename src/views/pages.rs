use std::fmt::Write;

use axum::http::StatusCode;

use super::{RegistrationPreview, text};
use crate::api::validation::FieldError;
use crate::db::{Message, User};

pub(super) fn layout(title: &str, viewer: Option<&User>, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Clubhouse</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<header class="site-header">
<a class="brand" href="/">Clubhouse</a>
<nav>{nav}</nav>
</header>
<main>
{body}
</main>
</body>
</html>
"#,
        title = text(title),
        nav = nav(viewer),
    )
}

fn nav(viewer: Option<&User>) -> String {
    let Some(user) = viewer else {
        return r#"<a href="/auth/login">Log in</a> <a href="/auth/register">Sign up</a>"#
            .to_string();
    };

    let mut links = format!(
        r#"<span class="greeting">{}</span> <a href="/create-message">New message</a>"#,
        text(&user.fullname())
    );
    if !user.membership_status {
        links.push_str(r#" <a href="/join-club">Join the club</a>"#);
    }
    if !user.admin {
        links.push_str(r#" <a href="/admin-access">Admin access</a>"#);
    }
    links.push_str(
        r#" <form class="inline" method="post" action="/auth/logout"><button type="submit">Log out</button></form>"#,
    );
    links
}

fn error_list(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let mut html = String::from(r#"<ul class="errors">"#);
    for error in errors {
        let _ = write!(
            html,
            r#"<li data-field="{}">{}</li>"#,
            error.field,
            text(&error.message)
        );
    }
    html.push_str("</ul>");
    html
}

pub(super) fn home(messages: &[Message], viewer: Option<&User>) -> String {
    let is_member = viewer.is_some_and(|u| u.membership_status);
    let is_admin = viewer.is_some_and(|u| u.admin);

    let mut html = String::from("<h1>Messages</h1>\n");
    if messages.is_empty() {
        html.push_str(r#"<p class="empty">No messages yet.</p>"#);
        return html;
    }

    for message in messages {
        let _ = write!(
            html,
            r#"<article class="message"><h2>{}</h2><p>{}</p>"#,
            text(&message.title),
            text(&message.text)
        );

        if is_member {
            let author = message
                .author
                .as_ref()
                .map_or_else(|| "Former member".to_string(), User::fullname);
            let _ = write!(
                html,
                r#"<footer><span class="author">{}</span> <time datetime="{}">{}</time></footer>"#,
                text(&author),
                text(&message.timestamp),
                text(&message.timestamp_formatted())
            );
        }

        if is_admin {
            let _ = write!(
                html,
                r#"<form class="inline" method="post" action="/messages/{}/delete"><button type="submit">Delete</button></form>"#,
                message.id
            );
        }

        html.push_str("</article>\n");
    }

    html
}

pub(super) fn register(preview: &RegistrationPreview, errors: &[FieldError]) -> String {
    format!(
        r#"<h1>Sign up</h1>
{errors}
<form method="post" action="/auth/register">
<label>First name <input name="firstname" value="{firstname}"></label>
<label>Last name <input name="lastname" value="{lastname}"></label>
<label>Email <input name="email" type="email" value="{email}"></label>
<label>Password <input name="password" type="password"></label>
<label>Confirm password <input name="password_confirmation" type="password"></label>
<button type="submit">Sign up</button>
</form>"#,
        errors = error_list(errors),
        firstname = text(&preview.firstname),
        lastname = text(&preview.lastname),
        email = text(&preview.email),
    )
}

pub(super) fn login(email: &str, errors: &[FieldError]) -> String {
    format!(
        r#"<h1>Log in</h1>
{errors}
<form method="post" action="/auth/login">
<label>Email <input name="email" type="email" value="{email}"></label>
<label>Password <input name="password" type="password"></label>
<button type="submit">Log in</button>
</form>"#,
        errors = error_list(errors),
        email = text(email),
    )
}

pub(super) fn create_message(title: &str, body: &str, errors: &[FieldError]) -> String {
    format!(
        r#"<h1>New message</h1>
{errors}
<form method="post" action="/create-message">
<label>Title <input name="title" value="{title}"></label>
<label>Message <textarea name="text" rows="6">{body}</textarea></label>
<button type="submit">Post</button>
</form>"#,
        errors = error_list(errors),
        title = text(title),
        body = text(body),
    )
}

pub(super) fn passcode(heading: &str, blurb: &str, action: &str, errors: &[FieldError]) -> String {
    format!(
        r#"<h1>{heading}</h1>
<p>{blurb}</p>
{errors}
<form method="post" action="{action}">
<label>Password <input name="passcode" type="password"></label>
<button type="submit">Submit</button>
</form>"#,
        heading = text(heading),
        blurb = text(blurb),
        errors = error_list(errors),
    )
}

pub(super) fn authorization_error() -> String {
    r#"<h1>Not authorized</h1>
<p>You need to <a href="/auth/login">log in</a> to see this page.</p>"#
        .to_string()
}

pub(super) fn error(status: StatusCode, message: &str, detail: Option<&str>) -> String {
    let mut html = format!(
        "<h1>{}</h1>\n<p>{}</p>",
        status.as_u16(),
        text(message)
    );
    if let Some(detail) = detail {
        let _ = write!(html, "\n<pre class=\"detail\">{}</pre>", text(detail));
    }
    html
}
