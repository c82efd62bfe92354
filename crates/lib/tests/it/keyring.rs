//! Key ring persistence and rotation

use std::sync::Arc;

use wicket::keyring::{Key, KeyRing};

fn disjoint(a: &[Key], b: &[Key]) -> bool {
    a.iter().all(|k| !b.contains(k))
}

#[tokio::test]
async fn test_first_run_generates_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wicket.keys");
    assert!(!path.exists());

    let ring = KeyRing::open(&path, 4).await.unwrap();
    assert_eq!(ring.len(), 4);
    assert!(path.exists());

    let reopened = KeyRing::open(&path, 4).await.unwrap();
    assert_eq!(&*ring.snapshot(), &*reopened.snapshot());
}

#[tokio::test]
async fn test_rotation_retains_all_but_oldest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wicket.keys");
    let ring = KeyRing::open(&path, 3).await.unwrap();
    let before = ring.snapshot();

    ring.rotate().await.unwrap();
    let after = ring.snapshot();

    assert_eq!(after.len(), 3);
    assert!(!before.contains(&after[0]));
    assert_eq!(&after[1..], &before[..2]);

    // The rotated ring is what a restart sees
    let reopened = KeyRing::open(&path, 3).await.unwrap();
    assert_eq!(&*reopened.snapshot(), &*after);
}

#[tokio::test]
async fn test_reset_replaces_every_key() {
    let dir = tempfile::tempdir().unwrap();
    let ring = KeyRing::open(dir.path().join("wicket.keys"), 3).await.unwrap();
    let before = ring.snapshot();

    ring.reset().await.unwrap();
    let after = ring.snapshot();

    assert_eq!(after.len(), 3);
    assert!(disjoint(&before, &after));
}

#[tokio::test]
async fn test_capacity_change_on_open_regenerates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wicket.keys");
    let before = KeyRing::open(&path, 3).await.unwrap().snapshot();

    let resized = KeyRing::open(&path, 5).await.unwrap();
    let after = resized.snapshot();

    assert_eq!(after.len(), 5);
    assert!(disjoint(&before, &after));
}

#[tokio::test]
async fn test_capacity_change_at_rotation_resets() {
    let dir = tempfile::tempdir().unwrap();
    let ring = KeyRing::open(dir.path().join("wicket.keys"), 3).await.unwrap();
    let before = ring.snapshot();

    ring.set_capacity(2);
    ring.rotate().await.unwrap();
    let after = ring.snapshot();

    assert_eq!(after.len(), 2);
    assert!(disjoint(&before, &after));
}

#[tokio::test]
async fn test_malformed_key_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wicket.keys");
    tokio::fs::write(&path, b"this is not a key ring").await.unwrap();

    let ring = KeyRing::open(&path, 3).await.unwrap();
    assert_eq!(ring.len(), 3);
    assert_eq!(ring.read_key_file().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_load_reports_count_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wicket.keys");
    KeyRing::open(&path, 3).await.unwrap();

    let ring = KeyRing::new(&path, 4);
    let err = ring.load().await.unwrap_err();
    assert!(err.is_count_mismatch());
    assert!(ring.is_empty());
}

#[tokio::test]
async fn test_concurrent_rotations_serialize() {
    let dir = tempfile::tempdir().unwrap();
    let ring = Arc::new(KeyRing::open(dir.path().join("wicket.keys"), 4).await.unwrap());
    let before = ring.snapshot();

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let ring = Arc::clone(&ring);
            tokio::spawn(async move { ring.rotate().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Three serialized rotations leave only the newest starting key
    let after = ring.snapshot();
    assert_eq!(after.len(), 4);
    assert_eq!(after[3], before[0]);
    assert!(disjoint(&after[..3], &before));
    assert_eq!(&*ring.read_key_file().await.unwrap(), &*after);
}
