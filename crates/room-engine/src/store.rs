//! Storage collaborator boundary.
//!
//! The engine persists all room state through this narrow key-value
//! interface and never assumes a particular backing store. Two capabilities
//! beyond plain get/put are required:
//!
//! - atomic set-union / set-removal on a single key (join, leave, vote), and
//! - an atomic multi-key write batch (the delete cascade and ledger purges),
//!   which must apply fully or not at all.
//!
//! # Key Patterns
//!
//! - `room:{id}` - Room record (JSON)
//! - `room:{id}:members` - Membership set (user ids)
//! - `room:{id}:votes:{item}` - Approvals for one candidate item (user ids)
//! - `room:{id}:roster` - Every user that has ever joined the room
//! - `user:{id}:rooms` - User-room index (room ids), derived, non-authoritative

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

/// Error from the storage collaborator.
///
/// The engine treats every store failure as transient: callers of the
/// idempotent operations may retry without side effects beyond the first
/// success.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A single write within an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Set `key` to `value`.
    Put { key: String, value: String },
    /// Remove `key` entirely.
    Delete { key: String },
    /// Add `member` to the set at `key` (creating the set if absent).
    SetAdd { key: String, member: String },
    /// Remove `member` from the set at `key` (no-op if absent).
    SetRemove { key: String, member: String },
}

/// Key-value storage collaborator.
///
/// Implementations live outside the engine. Single-key set operations must
/// be atomic with respect to each other; `batch` must be all-or-nothing.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get the value at `key`, if present.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set `key` to `value`.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically add `member` to the set at `key`.
    ///
    /// Returns `true` if the member was newly added.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Atomically remove `member` from the set at `key`.
    ///
    /// Returns `true` if the member was present.
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Snapshot of the set at `key` (empty if absent). No ordering guarantee.
    async fn set_members(&self, key: &str) -> Result<HashSet<String>, StoreError>;

    /// Apply `ops` as a single all-or-nothing unit.
    async fn batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}

/// Storage key layout for room state.
pub mod keys {
    use crate::types::{ItemId, RoomId, UserId};

    /// Key of the room record.
    #[must_use]
    pub fn room(room_id: &RoomId) -> String {
        format!("room:{room_id}")
    }

    /// Key of the room's membership set.
    #[must_use]
    pub fn members(room_id: &RoomId) -> String {
        format!("room:{room_id}:members")
    }

    /// Key of the approval set for one candidate item.
    #[must_use]
    pub fn votes(room_id: &RoomId, item: &ItemId) -> String {
        format!("room:{room_id}:votes:{item}")
    }

    /// Key of the room's historical roster.
    #[must_use]
    pub fn roster(room_id: &RoomId) -> String {
        format!("room:{room_id}:roster")
    }

    /// Key of a user's room index.
    #[must_use]
    pub fn user_rooms(user: &UserId) -> String {
        format!("user:{user}:rooms")
    }
}
