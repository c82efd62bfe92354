//! End-to-end: bootstrap, invite, accept, log in, restart

use axum::http::StatusCode;
use wicket::Authority;

use crate::helpers::{body_string, post_form, send, set_cookie, test_app, test_options};

#[tokio::test]
async fn test_invite_accept_login() {
    let dir = tempfile::tempdir().unwrap();
    let authority = Authority::open(test_options(&dir)).await.unwrap();
    let app = test_app(&authority);
    let cookie_name = authority.session().cookie_name().to_string();

    // Bootstrap the administrator
    let (_, root_token) = authority.first_run_invitation("root").await.unwrap();
    let response = send(
        &app,
        post_form(
            "/login",
            &format!("invite={root_token}&chosen_name=admin&password=secret"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, &cookie_name).is_some());

    // Invite and accept
    let (_, token) = authority.create_invitation("a@b.com", false, 2).await.unwrap();
    let response = send(
        &app,
        post_form(
            "/login",
            &format!("invite={token}&chosen_name=alice&password=pw1"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, &cookie_name).is_some());
    assert!(body_string(response).await.contains("Welcome, alice"));

    // Log in
    let response = send(&app, post_form("/login", "username=alice&password=pw1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, &cookie_name).is_some());

    let response = send(&app, post_form("/login", "username=alice&password=nope")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response, &cookie_name).is_none());

    // The invitation cannot be reused
    let response = send(
        &app,
        post_form(
            "/login",
            &format!("invite={token}&chosen_name=mallory&password=pw2"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response, &cookie_name).is_none());
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let cookie = {
        let authority = Authority::open(test_options(&dir)).await.unwrap();
        let (_, token) = authority.create_invitation("a@b.com", false, 2).await.unwrap();
        authority.accept_invitation("alice", "pw1", &token).await.unwrap();
        let (_, cookie) = authority.login_cookie("alice", "pw1").await.unwrap();
        cookie
    };

    let authority = Authority::open(test_options(&dir)).await.unwrap();
    let user = authority.login("alice", "pw1").await.unwrap();
    assert_eq!(user.trust, 2);

    let session = authority.session().read_value(cookie.value());
    assert_eq!(session.id, user.id);

    let err = authority.first_run_invitation("root").await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_rotation_task_rotates() {
    let dir = tempfile::tempdir().unwrap();
    let authority = Authority::open(test_options(&dir)).await.unwrap();
    let before = authority.keyring().snapshot();

    let handle = authority.spawn_key_rotation(std::time::Duration::from_millis(20));
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    handle.abort();

    let after = authority.keyring().snapshot();
    assert_eq!(after.len(), before.len());
    assert_ne!(after[0], before[0]);
}
