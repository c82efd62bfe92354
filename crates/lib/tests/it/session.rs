//! Session cookies through a real cookie manager

use axum::{Json, Router, extract::State, routing::get};
use tower_cookies::{CookieManagerLayer, Cookies};
use wicket::{Authority, SessionUser, constants::LOGOUT_SENTINEL};

use crate::helpers::{
    activated_user, body_string, get_with_cookie, post_form, send, set_cookie, set_cookie_header,
    test_app, test_authority,
};

async fn whoami(State(authority): State<Authority>, cookies: Cookies) -> Json<SessionUser> {
    Json(authority.session().read_session(&cookies))
}

fn whoami_app(authority: &Authority) -> Router {
    Router::new()
        .route("/whoami", get(whoami))
        .with_state(authority.clone())
        .layer(CookieManagerLayer::new())
}

async fn identify(app: &Router, cookie: Option<&str>) -> SessionUser {
    let response = send(app, get_with_cookie("/whoami", cookie)).await;
    serde_json::from_str(&body_string(response).await).unwrap()
}

#[tokio::test]
async fn test_cookie_round_trip() {
    let (_dir, authority) = test_authority().await;
    let alice = activated_user(&authority, "alice", "pw1", false, 3).await;
    let (_, cookie) = authority.login_cookie("alice", "pw1").await.unwrap();

    let header = format!("{}={}", cookie.name(), cookie.value());
    let seen = identify(&whoami_app(&authority), Some(&header)).await;
    assert_eq!(seen.id, alice.id);
    assert_eq!(seen.name, "alice");
    assert_eq!(seen.trust, 3);
}

#[tokio::test]
async fn test_missing_or_forged_cookie_is_anonymous() {
    let (_dir, authority) = test_authority().await;
    let app = whoami_app(&authority);
    let name = authority.session().cookie_name().to_string();

    assert!(identify(&app, None).await.is_anonymous());
    assert!(identify(&app, Some(&format!("{name}=forged"))).await.is_anonymous());
    assert!(
        identify(&app, Some(&format!("{name}={LOGOUT_SENTINEL}")))
            .await
            .is_anonymous()
    );
}

#[tokio::test]
async fn test_login_sets_http_only_root_cookie() {
    let (_dir, authority) = test_authority().await;
    activated_user(&authority, "alice", "pw1", false, 3).await;
    let app = test_app(&authority);

    let response = send(&app, post_form("/login", "username=alice&password=pw1")).await;
    assert_eq!(response.status(), 200);

    let name = authority.session().cookie_name();
    let header = set_cookie_header(&response, name).expect("session cookie");
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("Path=/"));
    assert!(header.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_logout_overwrites_cookie() {
    let (_dir, authority) = test_authority().await;
    activated_user(&authority, "alice", "pw1", false, 3).await;
    let app = test_app(&authority);
    let name = authority.session().cookie_name().to_string();

    let response = send(&app, post_form("/login", "username=alice&password=pw1")).await;
    let session = set_cookie(&response, &name).unwrap();

    let logout = axum::http::Request::builder()
        .method("POST")
        .uri("/logout")
        .header("cookie", &session)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&app, logout).await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        set_cookie(&response, &name).unwrap(),
        format!("{name}={LOGOUT_SENTINEL}")
    );

    let response = send(&app, get_with_cookie("/logout", Some(&session))).await;
    assert_eq!(response.status(), 405);
}

#[tokio::test]
async fn test_sessions_end_with_key_reset() {
    let (_dir, authority) = test_authority().await;
    activated_user(&authority, "alice", "pw1", false, 3).await;
    let (_, cookie) = authority.login_cookie("alice", "pw1").await.unwrap();
    let header = format!("{}={}", cookie.name(), cookie.value());
    let app = whoami_app(&authority);

    assert!(!identify(&app, Some(&header)).await.is_anonymous());
    authority.reset_keys().await.unwrap();
    assert!(identify(&app, Some(&header)).await.is_anonymous());
}

#[tokio::test]
async fn test_invitation_token_is_not_a_session() {
    let (_dir, authority) = test_authority().await;
    let app = test_app(&authority);
    let name = authority.session().cookie_name().to_string();

    let (_, token) = authority.create_invitation("x@y", true, 0).await.unwrap();
    let header = format!("{name}={token}");

    assert!(identify(&whoami_app(&authority), Some(&header)).await.is_anonymous());
    let response = send(&app, get_with_cookie("/admin", Some(&header))).await;
    assert_eq!(response.status(), 200);
    let body = body_string(response).await;
    assert!(body.contains(r#"name="username""#));
    assert!(!body.contains("admin area"));

    // Still refused once the invitation has been accepted
    authority.accept_invitation("root", "pw1", &token).await.unwrap();
    let response = send(&app, get_with_cookie("/admin", Some(&header))).await;
    assert_ne!(body_string(response).await, "admin area");
}
