//! Unit-level tests for the directory actor, driven through its handle.
//!
//! These live as integration tests (not a `#[cfg(test)]` module inside the
//! crate) because they use `engine-test-utils`, which depends on this crate;
//! an in-crate test module would see a second, incompatible copy of the
//! `Store`/`Notifier` traits.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use engine_test_utils::{CaptureNotifier, MemoryStore};
use room_engine::actors::{RoomDirectoryActor, RoomDirectoryHandle};
use room_engine::store::keys;
use room_engine::{
    CreateRoomParams, EngineConfig, EngineError, ItemId, RoomId, RoomRecord, Store, UserId,
};

fn test_params() -> CreateRoomParams {
    CreateRoomParams {
        display_name: "Friday dinner".to_string(),
        city: "Austin".to_string(),
        candidate_items: vec![ItemId::from("tacos"), ItemId::from("ramen")],
        is_private: false,
    }
}

fn spawn_directory() -> (RoomDirectoryHandle, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(CaptureNotifier::new());
    let (handle, _task) = RoomDirectoryActor::spawn(
        store.clone(),
        notifier,
        EngineConfig::default(),
    );
    (handle, store)
}

#[tokio::test]
async fn test_create_room_persists_record() {
    let (directory, store) = spawn_directory();

    let room_id = directory
        .create_room(UserId::from("owner"), test_params())
        .await
        .unwrap();

    let json = store.get(&keys::room(&room_id)).await.unwrap().unwrap();
    let record = RoomRecord::from_json(&json).unwrap();
    assert_eq!(record.owner, UserId::from("owner"));
    assert_eq!(record.display_name, "Friday dinner");

    let status = directory.status().await.unwrap();
    assert_eq!(status.live_rooms, 1);

    directory.shutdown();
}

#[tokio::test]
async fn test_create_room_rejects_invalid_params() {
    let (directory, _store) = spawn_directory();

    let mut params = test_params();
    params.candidate_items = vec![ItemId::from("tacos")];

    let result = directory.create_room(UserId::from("owner"), params).await;
    assert!(matches!(result, Err(EngineError::InvalidRoom(_))));

    let status = directory.status().await.unwrap();
    assert_eq!(status.live_rooms, 0);

    directory.shutdown();
}

#[tokio::test]
async fn test_resolve_unknown_room() {
    let (directory, _store) = spawn_directory();

    let result = directory.resolve_room(RoomId::from("missing")).await;
    assert!(matches!(result, Err(EngineError::RoomNotFound)));

    directory.shutdown();
}

#[tokio::test]
async fn test_resolve_revives_from_storage() {
    let (directory, store) = spawn_directory();

    // Record exists in storage but no actor is running.
    let room_id = RoomId::from("room-1");
    let record =
        RoomRecord::create(room_id.clone(), UserId::from("owner"), &test_params()).unwrap();
    store
        .put(&keys::room(&room_id), &record.to_json().unwrap())
        .await
        .unwrap();

    let handle = directory.resolve_room(room_id.clone()).await.unwrap();
    assert_eq!(handle.room_id(), &room_id);

    let status = directory.status().await.unwrap();
    assert_eq!(status.live_rooms, 1);

    directory.shutdown();
}

#[tokio::test]
async fn test_retire_removes_live_entry() {
    let (directory, _store) = spawn_directory();

    let room_id = directory
        .create_room(UserId::from("owner"), test_params())
        .await
        .unwrap();

    directory.retire_room(room_id).await.unwrap();

    let status = directory.status().await.unwrap();
    assert_eq!(status.live_rooms, 0);

    directory.shutdown();
}

#[tokio::test]
async fn test_retire_unknown_room_is_noop() {
    let (directory, _store) = spawn_directory();

    directory.retire_room(RoomId::from("missing")).await.unwrap();

    let status = directory.status().await.unwrap();
    assert_eq!(status.live_rooms, 0);

    directory.shutdown();
}
