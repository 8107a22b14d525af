mod common;

use axum::http::{StatusCode, header};
use clubhouse::config::Environment;
use common::{MEMBER_PASSCODE, body_text, location, spawn_app, spawn_app_with};

async fn post_message(app: &common::TestApp, cookie: &str, title: &str, text: &str) -> StatusCode {
    app.post_form(
        "/create-message",
        &[("title", title), ("text", text)],
        Some(cookie),
    )
    .await
    .status()
}

#[tokio::test]
async fn anonymous_posts_are_refused_and_not_stored() {
    let app = spawn_app().await;

    let response = app
        .post_form(
            "/create-message",
            &[("title", "Hi"), ("text", "there")],
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Not authorized"));
    assert!(app.state.store().list_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn members_can_post_messages() {
    let app = spawn_app().await;
    let cookie = app.signed_in("Ann", "ann@example.com").await;

    let response = app
        .post_form(
            "/create-message",
            &[("title", "  Hello  "), ("text", "First post")],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let messages = app.state.store().list_messages().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].title, "Hello");
    assert_eq!(messages[0].text, "First post");
    let author = messages[0].author.as_ref().unwrap();
    assert_eq!(author.email, "ann@example.com");
}

#[tokio::test]
async fn empty_fields_rerender_with_the_entered_text() {
    let app = spawn_app().await;
    let cookie = app.signed_in("Ann", "ann@example.com").await;

    let response = app
        .post_form(
            "/create-message",
            &[("title", ""), ("text", "Kept body")],
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Must provide a title."));
    assert!(body.contains("Kept body"));
    assert!(app.state.store().list_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn markup_in_messages_is_escaped_once() {
    let app = spawn_app().await;
    let cookie = app.signed_in("Ann", "ann@example.com").await;

    post_message(&app, &cookie, "<b>bold</b>", "Tom & Jerry").await;

    let body = body_text(app.get("/", None).await).await;
    assert!(body.contains("&lt;b&gt;bold&lt;&#x2F;b&gt;"));
    assert!(body.contains("Tom &amp; Jerry"));
    assert!(!body.contains("&amp;amp;"));
}

#[tokio::test]
async fn authors_are_visible_to_members_only() {
    let app = spawn_app().await;
    let author = app.signed_in("Ann", "ann@example.com").await;
    post_message(&app, &author, "Hello", "First post").await;

    let anonymous = body_text(app.get("/", None).await).await;
    assert!(anonymous.contains("First post"));
    assert!(!anonymous.contains("Ann Lee"));

    let outsider = app.signed_in("Bob", "bob@example.com").await;
    let page = body_text(app.get("/", Some(&outsider)).await).await;
    assert!(!page.contains("class=\"author\""));

    app.post_form("/join-club", &[("passcode", MEMBER_PASSCODE)], Some(&outsider))
        .await;
    let page = body_text(app.get("/", Some(&outsider)).await).await;
    assert!(page.contains("<span class=\"author\">Ann Lee</span>"));
    assert!(!page.contains("/delete"));
}

#[tokio::test]
async fn admins_can_delete_messages() {
    let app = spawn_app().await;
    let author = app.signed_in("Ann", "ann@example.com").await;
    post_message(&app, &author, "Hello", "First post").await;
    let id = app.state.store().list_messages().await.unwrap()[0].id;

    let admin = app.signed_in_admin("Root", "root@example.com").await;
    let home = body_text(app.get("/", Some(&admin)).await).await;
    assert!(home.contains(&format!("action=\"/messages/{id}/delete\"")));

    let response = app
        .post_form(&format!("/messages/{id}/delete"), &[], Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(app.state.store().get_message(id).await.unwrap().is_none());
}

#[tokio::test]
async fn non_admins_are_redirected_home_without_deleting() {
    let app = spawn_app().await;
    let author = app.signed_in("Ann", "ann@example.com").await;
    post_message(&app, &author, "Hello", "First post").await;
    let id = app.state.store().list_messages().await.unwrap()[0].id;

    let response = app
        .post_form(&format!("/messages/{id}/delete"), &[], Some(&author))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(app.state.store().get_message(id).await.unwrap().is_some());

    let response = app
        .post_form(&format!("/messages/{id}/delete"), &[], None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.state.store().get_message(id).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_a_missing_message_is_a_no_op() {
    let app = spawn_app().await;
    let admin = app.signed_in_admin("Root", "root@example.com").await;

    let response = app
        .post_form("/messages/9999/delete", &[], Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn malformed_message_ids_are_treated_as_missing() {
    let app = spawn_app().await;
    let admin = app.signed_in_admin("Root", "root@example.com").await;

    for uri in ["/messages/abc/delete", "/messages/99999999999/delete"] {
        let response = app.post_form(uri, &[], Some(&admin)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/");
    }
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = spawn_app().await;

    let response = app.get("/does-not-exist", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_text(response).await;
    assert!(body.contains("Page not found"));
    // Development mode shows the diagnostic line.
    assert!(body.contains("Not found: &#x2F;does-not-exist"));
}

#[tokio::test]
async fn production_hides_error_detail() {
    let app = spawn_app_with(|config| {
        config.general.environment = Environment::Production;
    })
    .await;

    let response = app.get("/does-not-exist", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_text(response).await;
    assert!(body.contains("Page not found"));
    assert!(!body.contains("Not found: "));
    assert!(!body.contains("does-not-exist"));
}

#[tokio::test]
async fn error_pages_keep_the_signed_in_navigation() {
    for environment in [Environment::Development, Environment::Production] {
        let app = spawn_app_with(|config| config.general.environment = environment).await;
        let cookie = app.signed_in("Ann", "ann@example.com").await;

        let response = app.get("/does-not-exist", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_text(response).await;
        assert!(body.contains("Page not found"));
        assert!(body.contains("Ann Lee"), "{environment:?}");
        assert!(body.contains("action=\"/auth/logout\""));
        assert!(!body.contains("href=\"/auth/login\""));
        assert_eq!(
            body.contains("Not found: "),
            environment == Environment::Development
        );
    }
}

#[tokio::test]
async fn requests_beyond_the_window_limit_are_refused() {
    let app = spawn_app_with(|config| {
        config.server.rate_limit_requests = 20;
        config.server.rate_limit_window_secs = 60;
    })
    .await;

    for n in 1..=20 {
        let response = app.get("/", None).await;
        assert_eq!(response.status(), StatusCode::OK, "request {n}");
    }

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(body_text(response).await.contains("Too many requests"));

    let response = app.get("/static/style.css", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn stylesheet_is_served_with_security_headers() {
    let app = spawn_app().await;

    let response = app.get("/static/style.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/css")
    );
    assert_eq!(response.headers()["x-frame-options"], "DENY");

    let response = app.get("/static/missing.js", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
