//! Invitation lifecycle through the `Authority`

use wicket::token::TokenPurpose;
use wicket::user::UserError;
use wicket::{Error, constants::ROOT_TRUST};

use crate::helpers::{activated_user, test_authority};

#[tokio::test]
async fn test_accept_activates_pending_record() {
    let (_dir, authority) = test_authority().await;
    let (pending, token) = authority.create_invitation("a@b.com", false, 2).await.unwrap();
    assert!(pending.is_pending());

    let user = authority.accept_invitation("alice", "pw1", &token).await.unwrap();
    assert_eq!(user.id, pending.id);
    assert_eq!(user.unique_name, "alice");
    assert_eq!(user.email, "a@b.com");
    assert_eq!(user.trust, 2);
    assert!(user.active);

    let logged_in = authority.login("alice", "pw1").await.unwrap();
    assert_eq!(logged_in.id, pending.id);
    assert!(logged_in.last_seen.is_some());
}

#[tokio::test]
async fn test_accept_twice_is_refused() {
    let (_dir, authority) = test_authority().await;
    let (_, token) = authority.create_invitation("a@b.com", false, 2).await.unwrap();
    authority.accept_invitation("alice", "pw1", &token).await.unwrap();

    let err = authority.accept_invitation("alice", "pw2", &token).await.unwrap_err();
    assert!(matches!(err, Error::User(UserError::AlreadyAccepted { .. })));

    // Neither a new name nor a new password sticks
    let err = authority.accept_invitation("mallory", "pw2", &token).await.unwrap_err();
    assert!(matches!(err, Error::User(UserError::AlreadyAccepted { .. })));
    assert!(authority.login("alice", "pw1").await.is_ok());
    assert!(authority.login("alice", "pw2").await.is_err());
    assert!(authority.store().load_by_name("mallory").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_concurrent_accepts_with_different_names() {
    let (_dir, authority) = test_authority().await;
    let (pending, token) = authority.create_invitation("a@b.com", false, 2).await.unwrap();

    let handles: Vec<_> = ["alice", "bob", "carol", "dave"]
        .into_iter()
        .map(|name| {
            let authority = authority.clone();
            let token = token.clone();
            tokio::spawn(async move { authority.accept_invitation(name, "pw", &token).await })
        })
        .collect();

    let mut accepted = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(user) => accepted.push(user),
            Err(e) => assert!(
                matches!(e, Error::User(UserError::AlreadyAccepted { .. })),
                "unexpected error: {e}"
            ),
        }
    }
    assert_eq!(accepted.len(), 1);

    let winner = &accepted[0];
    assert_eq!(winner.id, pending.id);
    assert_eq!(authority.store().count().await.unwrap(), 1);
    for name in ["alice", "bob", "carol", "dave"] {
        let found = authority.store().load_by_name(name).await;
        assert_eq!(found.is_ok(), name == winner.unique_name);
    }
}

#[tokio::test]
async fn test_accept_with_taken_name() {
    let (_dir, authority) = test_authority().await;
    activated_user(&authority, "alice", "pw", false, 1).await;
    let (pending, token) = authority.create_invitation("a@b.com", false, 2).await.unwrap();

    let err = authority.accept_invitation("alice", "pw1", &token).await.unwrap_err();
    assert!(matches!(err, Error::User(UserError::NameTaken { .. })));
    assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

    // The invitation is still usable with another name
    assert!(authority.store().load_by_id(&pending.id).await.unwrap().is_pending());
    authority.accept_invitation("alicia", "pw1", &token).await.unwrap();
}

#[tokio::test]
async fn test_invalid_tokens() {
    let (_dir, authority) = test_authority().await;

    let err = authority.accept_invitation("alice", "pw", "garbage").await.unwrap_err();
    assert!(matches!(err, Error::User(UserError::InvalidInvitation)));

    // A token that verifies but whose record is gone
    let ghost = wicket::User::pending("ghost@example.com", false, 1);
    let token = authority
        .codec()
        .with_purpose(TokenPurpose::Invitation)
        .encode(&ghost.session())
        .unwrap();
    let err = authority.accept_invitation("alice", "pw", &token).await.unwrap_err();
    assert!(matches!(err, Error::User(UserError::InvalidInvitation)));

    // Reset keys: outstanding invitations stop verifying
    let (_, token) = authority.create_invitation("a@b.com", false, 2).await.unwrap();
    authority.reset_keys().await.unwrap();
    let err = authority.accept_invitation("alice", "pw", &token).await.unwrap_err();
    assert!(matches!(err, Error::User(UserError::InvalidInvitation)));
}

#[tokio::test]
async fn test_accept_validation() {
    let (_dir, authority) = test_authority().await;
    let (_, token) = authority.create_invitation("a@b.com", false, 2).await.unwrap();

    let err = authority.accept_invitation("  ", "pw", &token).await.unwrap_err();
    assert!(err.is_validation_error());

    let err = authority.accept_invitation("alice", "", &token).await.unwrap_err();
    assert!(err.is_validation_error());

    authority.accept_invitation("alice", "pw", &token).await.unwrap();
}

#[tokio::test]
async fn test_first_run_invitation() {
    let (_dir, authority) = test_authority().await;

    let err = authority.first_run_invitation("").await.unwrap_err();
    assert!(err.is_validation_error());

    let (root, token) = authority.first_run_invitation("root").await.unwrap();
    assert!(root.is_admin);
    assert_eq!(root.trust, ROOT_TRUST);

    let err = authority.first_run_invitation("root").await.unwrap_err();
    assert!(matches!(err, Error::User(UserError::AlreadyInitialized)));

    let admin = authority.accept_invitation("admin", "secret", &token).await.unwrap();
    assert!(admin.is_admin);
    assert_eq!(admin.id, root.id);
}

#[tokio::test]
async fn test_first_run_refused_once_users_exist() {
    let (_dir, authority) = test_authority().await;
    authority.create_invitation("a@b.com", false, 2).await.unwrap();

    let err = authority.first_run_invitation("root").await.unwrap_err();
    assert!(err.is_conflict());
}
