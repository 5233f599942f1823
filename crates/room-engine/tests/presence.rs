//! Presence lease behavior under paused time: expiry, renewal, and the
//! no-expiry default.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use engine_test_utils::{dinner_params, TestEngine};
use room_engine::{EngineConfig, EngineError, ItemId, RoomState, UserId};

fn leased_config() -> EngineConfig {
    EngineConfig {
        presence_ttl: Some(Duration::from_secs(30)),
        presence_sweep_interval: Duration::from_secs(5),
        ..EngineConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_expired_lease_removes_member_and_drains_room() {
    let t = TestEngine::with_config(leased_config());
    let room = t
        .engine
        .create_room(UserId::from("alice"), dinner_params())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(40)).await;

    let members = t.engine.members(room.clone()).await.unwrap();
    assert!(members.is_empty());

    let status = t.engine.match_status(room).await.unwrap();
    assert_eq!(status.state, RoomState::Draining);

    t.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_renewal_keeps_member_alive() {
    let t = TestEngine::with_config(leased_config());
    let room = t
        .engine
        .create_room(UserId::from("alice"), dinner_params())
        .await
        .unwrap();
    t.engine
        .join_room(room.clone(), UserId::from("bob"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(20)).await;
    t.engine
        .renew_presence(room.clone(), UserId::from("bob"))
        .await
        .unwrap();

    // At 40s alice's lease (never renewed) is past the 30s TTL while bob's
    // renewal at 20s holds until 50s.
    tokio::time::sleep(Duration::from_secs(20)).await;

    let members = t.engine.members(room.clone()).await.unwrap();
    assert_eq!(members, vec![UserId::from("bob")]);

    let status = t.engine.match_status(room).await.unwrap();
    assert_eq!(status.state, RoomState::Active);

    t.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_voting_refreshes_lease() {
    let t = TestEngine::with_config(leased_config());
    let room = t
        .engine
        .create_room(UserId::from("alice"), dinner_params())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(20)).await;
    t.engine
        .vote(room.clone(), UserId::from("alice"), ItemId::from("ramen-bar"))
        .await
        .unwrap();

    // 40s after join but only 20s after the vote.
    tokio::time::sleep(Duration::from_secs(20)).await;

    let members = t.engine.members(room).await.unwrap();
    assert_eq!(members, vec![UserId::from("alice")]);

    t.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_ttl_means_no_expiry() {
    let t = TestEngine::new();
    let room = t
        .engine
        .create_room(UserId::from("alice"), dinner_params())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(24 * 3600)).await;

    let members = t.engine.members(room).await.unwrap();
    assert_eq!(members, vec![UserId::from("alice")]);

    t.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_renew_presence_requires_membership() {
    let t = TestEngine::with_config(leased_config());
    let room = t
        .engine
        .create_room(UserId::from("alice"), dinner_params())
        .await
        .unwrap();

    let result = t
        .engine
        .renew_presence(room, UserId::from("outsider"))
        .await;
    assert!(matches!(result, Err(EngineError::NotAMember)));

    t.engine.shutdown().await;
}
