//! Unit-level tests for the room actor, driven through its handle.
//!
//! These live as integration tests (not a `#[cfg(test)]` module inside the
//! crate) because they use `engine-test-utils`, which depends on this crate;
//! an in-crate test module would see a second, incompatible copy of the
//! `Store`/`Notifier` traits.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use engine_test_utils::{CaptureNotifier, MemoryStore};
use room_engine::actors::{RoomActor, RoomActorHandle};
use room_engine::store::keys;
use room_engine::{
    CreateRoomParams, EngineConfig, EngineError, ItemId, RoomId, RoomRecord, Store, UserId,
    VoteOutcome,
};
use tokio_util::sync::CancellationToken;

fn test_params() -> CreateRoomParams {
    CreateRoomParams {
        display_name: "Friday dinner".to_string(),
        city: "Austin".to_string(),
        candidate_items: vec![ItemId::from("tacos"), ItemId::from("ramen")],
        is_private: false,
    }
}

async fn seeded_actor() -> (RoomActorHandle, Arc<MemoryStore>, Arc<CaptureNotifier>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(CaptureNotifier::new());

    let room_id = RoomId::from("room-1");
    let record =
        RoomRecord::create(room_id.clone(), UserId::from("owner"), &test_params()).unwrap();
    store
        .put(&keys::room(&room_id), &record.to_json().unwrap())
        .await
        .unwrap();

    let (handle, _task) = RoomActor::spawn(
        room_id,
        store.clone(),
        notifier.clone(),
        &EngineConfig::default(),
        CancellationToken::new(),
    );

    (handle, store, notifier)
}

#[tokio::test]
async fn test_join_is_idempotent() {
    let (handle, _store, _notifier) = seeded_actor().await;

    let first = handle.join(UserId::from("a")).await.unwrap();
    let second = handle.join(UserId::from("a")).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec![UserId::from("a")]);

    handle.cancel();
}

#[tokio::test]
async fn test_leave_absent_participant_is_noop() {
    let (handle, _store, _notifier) = seeded_actor().await;

    handle.join(UserId::from("a")).await.unwrap();
    handle.leave(UserId::from("ghost")).await.unwrap();

    let members = handle.members().await.unwrap();
    assert_eq!(members, vec![UserId::from("a")]);

    handle.cancel();
}

#[tokio::test]
async fn test_vote_requires_membership() {
    let (handle, _store, _notifier) = seeded_actor().await;

    let result = handle
        .vote(UserId::from("outsider"), ItemId::from("tacos"))
        .await;
    assert!(matches!(result, Err(EngineError::NotAMember)));

    handle.cancel();
}

#[tokio::test]
async fn test_vote_rejects_unknown_item() {
    let (handle, _store, _notifier) = seeded_actor().await;

    handle.join(UserId::from("a")).await.unwrap();
    let result = handle
        .vote(UserId::from("a"), ItemId::from("not-on-ballot"))
        .await;
    assert!(matches!(result, Err(EngineError::InvalidRoom(_))));

    handle.cancel();
}

#[tokio::test]
async fn test_unanimous_vote_matches() {
    let (handle, _store, _notifier) = seeded_actor().await;

    handle.join(UserId::from("a")).await.unwrap();
    handle.join(UserId::from("b")).await.unwrap();

    let outcome = handle
        .vote(UserId::from("a"), ItemId::from("tacos"))
        .await
        .unwrap();
    assert_eq!(outcome, VoteOutcome::Recorded);

    let outcome = handle
        .vote(UserId::from("b"), ItemId::from("tacos"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        VoteOutcome::Matched {
            item: ItemId::from("tacos"),
            members: vec![UserId::from("a"), UserId::from("b")],
        }
    );

    let status = handle.match_status().await.unwrap();
    let matched = status.last_match.unwrap();
    assert_eq!(matched.item, ItemId::from("tacos"));

    handle.cancel();
}

#[tokio::test]
async fn test_duplicate_vote_is_noop() {
    let (handle, _store, _notifier) = seeded_actor().await;

    handle.join(UserId::from("a")).await.unwrap();
    handle.join(UserId::from("b")).await.unwrap();

    // Same participant voting twice must not fire a match.
    let first = handle
        .vote(UserId::from("a"), ItemId::from("tacos"))
        .await
        .unwrap();
    let second = handle
        .vote(UserId::from("a"), ItemId::from("tacos"))
        .await
        .unwrap();
    assert_eq!(first, VoteOutcome::Recorded);
    assert_eq!(second, VoteOutcome::Recorded);

    handle.cancel();
}

#[tokio::test]
async fn test_delete_requires_owner() {
    let (handle, store, _notifier) = seeded_actor().await;

    handle.join(UserId::from("a")).await.unwrap();

    let result = handle.delete(UserId::from("a")).await;
    assert!(matches!(result, Err(EngineError::NotAuthorized)));

    // Room state untouched.
    let record = store.get("room:room-1").await.unwrap();
    assert!(record.is_some());
    let members = handle.members().await.unwrap();
    assert_eq!(members, vec![UserId::from("a")]);

    handle.cancel();
}

#[tokio::test]
async fn test_delete_cascade_and_closure() {
    let (handle, store, _notifier) = seeded_actor().await;

    handle.join(UserId::from("owner")).await.unwrap();
    handle.join(UserId::from("a")).await.unwrap();
    handle.leave(UserId::from("a")).await.unwrap();

    handle.delete(UserId::from("owner")).await.unwrap();

    assert!(store.get("room:room-1").await.unwrap().is_none());
    // Historical member's index entry is cleared too.
    assert!(store
        .set_members("user:a:rooms")
        .await
        .unwrap()
        .is_empty());
    assert!(store
        .set_members("user:owner:rooms")
        .await
        .unwrap()
        .is_empty());

    // Actor cancels itself after a successful delete.
    assert!(handle.is_cancelled());
}
