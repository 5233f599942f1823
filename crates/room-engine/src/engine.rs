//! `RoomEngine` - the public facade over the actor system.
//!
//! The engine is cheap to clone and safe to share: it holds the storage
//! collaborator and a handle to the `RoomDirectoryActor`. Per-room
//! operations resolve the room's actor handle through the directory and then
//! talk to the room actor directly, so the directory never sits on the
//! mutation hot path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::actors::directory::{RoomDirectoryActor, RoomDirectoryHandle};
use crate::actors::messages::{DirectoryStatus, RoomStatus, VoteOutcome};
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::model::CreateRoomParams;
use crate::notify::Notifier;
use crate::store::{keys, Store};
use crate::types::{ItemId, RoomId, UserId};

/// How long `shutdown` waits for the directory task to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Room session and consensus matching engine.
#[derive(Clone)]
pub struct RoomEngine {
    store: Arc<dyn Store>,
    directory: RoomDirectoryHandle,
    directory_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for RoomEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomEngine").finish_non_exhaustive()
    }
}

impl RoomEngine {
    /// Start the engine: spawns the directory actor.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, config: EngineConfig) -> Self {
        let (directory, directory_task) =
            RoomDirectoryActor::spawn(store.clone(), notifier, config);

        info!(target: "engine", "Room engine started");

        Self {
            store,
            directory,
            directory_task: Arc::new(Mutex::new(Some(directory_task))),
        }
    }

    /// Create a room owned by `owner` and join the owner to it.
    ///
    /// The record write and the owner's join are two steps; if the join
    /// fails the room exists with the owner indexed but not yet a member,
    /// and a retried join converges.
    pub async fn create_room(
        &self,
        owner: UserId,
        params: CreateRoomParams,
    ) -> Result<RoomId, EngineError> {
        let room_id = self
            .directory
            .create_room(owner.clone(), params)
            .await?;

        let handle = self.directory.resolve_room(room_id.clone()).await?;
        handle.join(owner).await?;

        Ok(room_id)
    }

    /// Join a room. Idempotent; returns the post-join membership snapshot.
    pub async fn join_room(
        &self,
        room_id: RoomId,
        user: UserId,
    ) -> Result<Vec<UserId>, EngineError> {
        let handle = self.directory.resolve_room(room_id).await?;
        handle.join(user).await
    }

    /// Leave a room. Leaving a room one is not in is a no-op. The user-room
    /// index entry is kept so the room stays in the user's room list.
    pub async fn leave_room(&self, room_id: RoomId, user: UserId) -> Result<(), EngineError> {
        let handle = self.directory.resolve_room(room_id).await?;
        handle.leave(user).await
    }

    /// Record an approval vote; returns whether consensus was reached.
    pub async fn vote(
        &self,
        room_id: RoomId,
        user: UserId,
        item: ItemId,
    ) -> Result<VoteOutcome, EngineError> {
        let handle = self.directory.resolve_room(room_id).await?;
        handle.vote(user, item).await
    }

    /// Current membership snapshot for a room, sorted.
    pub async fn members(&self, room_id: RoomId) -> Result<Vec<UserId>, EngineError> {
        let handle = self.directory.resolve_room(room_id).await?;
        handle.members().await
    }

    /// Lifecycle state and last declared match for a room.
    pub async fn match_status(&self, room_id: RoomId) -> Result<RoomStatus, EngineError> {
        let handle = self.directory.resolve_room(room_id).await?;
        handle.match_status().await
    }

    /// Refresh a member's presence lease. Only meaningful when the engine
    /// was configured with a presence TTL.
    pub async fn renew_presence(&self, room_id: RoomId, user: UserId) -> Result<(), EngineError> {
        let handle = self.directory.resolve_room(room_id).await?;
        handle.renew_presence(user).await
    }

    /// Delete a room. Owner only; applies the full cleanup cascade and
    /// retires the room's actor.
    pub async fn delete_room(&self, room_id: RoomId, requester: UserId) -> Result<(), EngineError> {
        let handle = self.directory.resolve_room(room_id.clone()).await?;
        handle.delete(requester).await?;
        self.directory.retire_room(room_id).await
    }

    /// Remove `room_id` from `user`'s own room list.
    ///
    /// Touches only the caller's index entry; room state is unaffected. This
    /// is how a non-owner drops a room they no longer care about.
    pub async fn forget_room(&self, user: UserId, room_id: RoomId) -> Result<(), EngineError> {
        self.store
            .set_remove(&keys::user_rooms(&user), room_id.as_str())
            .await?;
        Ok(())
    }

    /// The rooms in `user`'s room list whose record still exists, sorted.
    ///
    /// Index entries pointing at deleted rooms are skipped, not repaired:
    /// the index is derived data and a dangling entry is harmless.
    pub async fn rooms_of(&self, user: UserId) -> Result<Vec<RoomId>, EngineError> {
        let indexed = self.store.set_members(&keys::user_rooms(&user)).await?;

        let mut rooms = Vec::with_capacity(indexed.len());
        for id in indexed {
            let room_id = RoomId::from(id);
            if self.store.get(&keys::room(&room_id)).await?.is_some() {
                rooms.push(room_id);
            }
        }

        rooms.sort();
        Ok(rooms)
    }

    /// Current directory status (for health checks).
    pub async fn status(&self) -> Result<DirectoryStatus, EngineError> {
        self.directory.status().await
    }

    /// Shut down the engine: cancels the directory and every room actor,
    /// then waits (bounded) for the directory task to finish.
    pub async fn shutdown(&self) {
        info!(target: "engine", "Room engine shutting down");
        self.directory.shutdown();

        let task = self.directory_task.lock().await.take();
        if let Some(task) = task {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await.is_err() {
                warn!(
                    target: "engine",
                    "Directory task did not finish within shutdown timeout"
                );
            }
        }
    }
}
