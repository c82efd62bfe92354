//! The authorization gate driven through axum

use axum::http::{StatusCode, header};
use wicket::Authority;

use crate::helpers::{
    activated_user, body_string, get_with_cookie, post_form, send, set_cookie, test_app,
    test_authority,
};

/// Log `name` in and return the `Cookie` header value for its session.
async fn session_for(authority: &Authority, name: &str, password: &str) -> String {
    let (_, cookie) = authority.login_cookie(name, password).await.unwrap();
    format!("{}={}", cookie.name(), cookie.value())
}

async fn body_of(app: &axum::Router, uri: &str, cookie: Option<&str>) -> (StatusCode, String) {
    let response = send(app, get_with_cookie(uri, cookie)).await;
    let status = response.status();
    (status, body_string(response).await)
}

#[tokio::test]
async fn test_public_route_is_not_gated() {
    let (_dir, authority) = test_authority().await;
    let app = test_app(&authority);

    let (status, body) = body_of(&app, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "public");
}

#[tokio::test]
async fn test_anonymous_caller_gets_login_form() {
    let (_dir, authority) = test_authority().await;
    let app = test_app(&authority);

    let (status, body) = body_of(&app, "/amigos", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"action="/amigos""#));
    assert!(body.contains(r#"name="username""#));
    assert!(!body.contains("amigos area"));
}

#[tokio::test]
async fn test_trust_at_least() {
    let (_dir, authority) = test_authority().await;
    activated_user(&authority, "low", "pw", false, 1).await;
    activated_user(&authority, "high", "pw", false, 2).await;
    let app = test_app(&authority);

    let low = session_for(&authority, "low", "pw").await;
    let (_, body) = body_of(&app, "/amigos", Some(&low)).await;
    assert_ne!(body, "amigos area");

    let high = session_for(&authority, "high", "pw").await;
    let (status, body) = body_of(&app, "/amigos", Some(&high)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "amigos area");
}

#[tokio::test]
async fn test_trust_exactly() {
    let (_dir, authority) = test_authority().await;
    activated_user(&authority, "seven", "pw", false, 7).await;
    activated_user(&authority, "eight", "pw", false, 8).await;
    let app = test_app(&authority);

    let seven = session_for(&authority, "seven", "pw").await;
    let (_, body) = body_of(&app, "/exact", Some(&seven)).await;
    assert_eq!(body, "exact area");

    let eight = session_for(&authority, "eight", "pw").await;
    let (_, body) = body_of(&app, "/exact", Some(&eight)).await;
    assert_ne!(body, "exact area");
}

#[tokio::test]
async fn test_admin_passes_every_rule() {
    let (_dir, authority) = test_authority().await;
    activated_user(&authority, "root", "pw", true, 0).await;
    activated_user(&authority, "trusted", "pw", false, 1_000).await;
    let app = test_app(&authority);

    let root = session_for(&authority, "root", "pw").await;
    for (uri, expected) in [
        ("/admin", "admin area"),
        ("/amigos", "amigos area"),
        ("/exact", "exact area"),
        ("/bounce", "bounce area"),
    ] {
        let (_, body) = body_of(&app, uri, Some(&root)).await;
        assert_eq!(body, expected);
    }

    let trusted = session_for(&authority, "trusted", "pw").await;
    let (_, body) = body_of(&app, "/admin", Some(&trusted)).await;
    assert_ne!(body, "admin area");
}

#[tokio::test]
async fn test_refused_caller_is_redirected() {
    let (_dir, authority) = test_authority().await;
    let app = test_app(&authority);

    let response = send(&app, get_with_cookie("/bounce", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_login_through_gated_route() {
    let (_dir, authority) = test_authority().await;
    activated_user(&authority, "alice", "pw1", false, 2).await;
    let app = test_app(&authority);
    let cookie_name = authority.session().cookie_name().to_string();

    let response = send(&app, post_form("/amigos", "username=alice&password=pw1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let session = set_cookie(&response, &cookie_name).expect("session cookie");
    assert!(body_string(response).await.contains("Welcome, alice"));

    let (_, body) = body_of(&app, "/amigos", Some(&session)).await;
    assert_eq!(body, "amigos area");
}

#[tokio::test]
async fn test_bad_credentials() {
    let (_dir, authority) = test_authority().await;
    activated_user(&authority, "alice", "pw1", false, 2).await;
    let app = test_app(&authority);
    let cookie_name = authority.session().cookie_name().to_string();

    for form in [
        "username=alice&password=wrong",
        "username=nobody&password=pw1",
        "username=&password=",
    ] {
        let response = send(&app, post_form("/login", form)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{form}");
        assert!(set_cookie(&response, &cookie_name).is_none());
    }
}

#[tokio::test]
async fn test_invite_link_renders_signup_form() {
    let (_dir, authority) = test_authority().await;
    let (_, token) = authority.create_invitation("a@b.com", false, 2).await.unwrap();
    let app = test_app(&authority);

    let (status, body) = body_of(&app, &format!("/amigos?invite={token}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&format!(r#"name="invite" value="{token}""#)));
    assert!(body.contains(r#"name="chosen_name""#));
}

#[tokio::test]
async fn test_accept_through_query_token() {
    let (_dir, authority) = test_authority().await;
    let (_, token) = authority.create_invitation("a@b.com", false, 2).await.unwrap();
    let app = test_app(&authority);
    let cookie_name = authority.session().cookie_name().to_string();

    let response = send(
        &app,
        post_form(&format!("/login?invite={token}"), "chosen_name=alice&password=pw1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let session = set_cookie(&response, &cookie_name).expect("session cookie");

    let (_, body) = body_of(&app, "/amigos", Some(&session)).await;
    assert_eq!(body, "amigos area");
}

#[tokio::test]
async fn test_delete_on_gated_route_logs_out() {
    let (_dir, authority) = test_authority().await;
    activated_user(&authority, "low", "pw", false, 1).await;
    let app = test_app(&authority);
    let cookie_name = authority.session().cookie_name().to_string();
    let low = session_for(&authority, "low", "pw").await;

    let request = axum::http::Request::builder()
        .method("DELETE")
        .uri("/amigos")
        .header("cookie", &low)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, &cookie_name).is_some());
    assert!(body_string(response).await.contains("Thanks for visiting"));
}
