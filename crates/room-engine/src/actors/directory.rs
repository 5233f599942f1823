//! `RoomDirectoryActor` - singleton supervisor that owns the room-id to
//! room-actor map.
//!
//! The directory is the only place room actors are spawned or retired, which
//! guarantees at most one live actor per room id. It stays off the hot path:
//! callers resolve a `RoomActorHandle` once and talk to the room actor
//! directly, so per-room mutations never funnel through the directory.
//!
//! A room actor can die (process restart never reaches here, but a panic or
//! a retire does); the record in storage remains authoritative, and the
//! directory revives an actor from the record on the next resolve.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::model::{CreateRoomParams, RoomRecord};
use crate::notify::Notifier;
use crate::store::{keys, Store};
use crate::types::{RoomId, UserId};

use super::messages::{DirectoryMessage, DirectoryStatus};
use super::room::{RoomActor, RoomActorHandle};

/// How long shutdown waits for each room actor task to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A room actor under directory management.
struct ManagedRoom {
    /// Handle for messaging the room actor.
    handle: RoomActorHandle,
    /// Task handle for liveness checks and shutdown.
    task_handle: JoinHandle<()>,
}

/// Handle to the `RoomDirectoryActor`.
#[derive(Clone)]
pub struct RoomDirectoryHandle {
    sender: mpsc::Sender<DirectoryMessage>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for RoomDirectoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomDirectoryHandle").finish_non_exhaustive()
    }
}

impl RoomDirectoryHandle {
    /// Create a new room, persist its record, and spawn its actor.
    pub async fn create_room(
        &self,
        owner: UserId,
        params: CreateRoomParams,
    ) -> Result<RoomId, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DirectoryMessage::CreateRoom {
                owner,
                params,
                respond_to: tx,
            })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))?
    }

    /// Resolve a handle to the room's actor, reviving it from storage if
    /// needed. Fails with `RoomNotFound` if no record exists.
    pub async fn resolve_room(&self, room_id: RoomId) -> Result<RoomActorHandle, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DirectoryMessage::ResolveRoom {
                room_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))?
    }

    /// Retire a room actor after its room was deleted.
    pub async fn retire_room(&self, room_id: RoomId) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DirectoryMessage::RetireRoom {
                room_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))
    }

    /// Get current directory status.
    pub async fn status(&self) -> Result<DirectoryStatus, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DirectoryMessage::GetStatus { respond_to: tx })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))
    }

    /// Signal the directory (and every room actor under it) to shut down.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

/// The `RoomDirectoryActor` implementation.
pub struct RoomDirectoryActor {
    /// Message receiver.
    receiver: mpsc::Receiver<DirectoryMessage>,
    /// Root cancellation token; room actors get child tokens.
    cancel_token: CancellationToken,
    /// Storage collaborator, shared with every room actor.
    store: Arc<dyn Store>,
    /// Notification collaborator, shared with every room actor.
    notifier: Arc<dyn Notifier>,
    /// Engine configuration.
    config: EngineConfig,
    /// Live room actors by room id.
    rooms: HashMap<RoomId, ManagedRoom>,
    /// Set once shutdown has begun.
    is_shutting_down: bool,
}

impl RoomDirectoryActor {
    /// Spawn the directory actor.
    pub fn spawn(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> (RoomDirectoryHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.directory_mailbox_buffer);
        let cancel_token = CancellationToken::new();

        let actor = Self {
            receiver,
            cancel_token: cancel_token.clone(),
            store,
            notifier,
            config,
            rooms: HashMap::new(),
            is_shutting_down: false,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = RoomDirectoryHandle {
            sender,
            cancel_token,
        };

        (handle, task_handle)
    }

    /// Run the directory message loop.
    #[instrument(skip_all, name = "engine.actor.directory")]
    async fn run(mut self) {
        debug!(target: "engine.actor.directory", "RoomDirectoryActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "engine.actor.directory",
                        "RoomDirectoryActor received shutdown signal"
                    );
                    self.is_shutting_down = true;
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            debug!(
                                target: "engine.actor.directory",
                                "RoomDirectoryActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        self.shutdown_rooms().await;
        debug!(target: "engine.actor.directory", "RoomDirectoryActor stopped");
    }

    /// Handle a single message.
    async fn handle_message(&mut self, message: DirectoryMessage) {
        match message {
            DirectoryMessage::CreateRoom {
                owner,
                params,
                respond_to,
            } => {
                let result = self.handle_create_room(owner, params).await;
                let _ = respond_to.send(result);
            }

            DirectoryMessage::ResolveRoom {
                room_id,
                respond_to,
            } => {
                let result = self.handle_resolve_room(room_id).await;
                let _ = respond_to.send(result);
            }

            DirectoryMessage::RetireRoom {
                room_id,
                respond_to,
            } => {
                self.handle_retire_room(&room_id);
                let _ = respond_to.send(());
            }

            DirectoryMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(DirectoryStatus {
                    live_rooms: self.rooms.len(),
                    is_shutting_down: self.is_shutting_down,
                });
            }
        }
    }

    /// Create a room: validate, persist the record, spawn the actor.
    #[instrument(skip_all, fields(owner = %owner))]
    async fn handle_create_room(
        &mut self,
        owner: UserId,
        params: CreateRoomParams,
    ) -> Result<RoomId, EngineError> {
        let room_id = RoomId::generate();
        let record = RoomRecord::create(room_id.clone(), owner, &params)?;

        self.store
            .put(&keys::room(&room_id), &record.to_json()?)
            .await?;

        self.spawn_room(room_id.clone());

        info!(
            target: "engine.actor.directory",
            room_id = %room_id,
            live_rooms = self.rooms.len(),
            "Room created"
        );

        Ok(room_id)
    }

    /// Resolve a room actor handle, reviving from storage when the actor is
    /// not running (or its task has died).
    async fn handle_resolve_room(
        &mut self,
        room_id: RoomId,
    ) -> Result<RoomActorHandle, EngineError> {
        if let Some(managed) = self.rooms.get(&room_id) {
            if !managed.task_handle.is_finished() && !managed.handle.is_cancelled() {
                return Ok(managed.handle.clone());
            }

            warn!(
                target: "engine.actor.directory",
                room_id = %room_id,
                "Room actor is dead, removing stale entry before revival"
            );
            self.rooms.remove(&room_id);
        }

        // The record in storage is authoritative; revive only if it exists.
        if self.store.get(&keys::room(&room_id)).await?.is_none() {
            return Err(EngineError::RoomNotFound);
        }

        debug!(
            target: "engine.actor.directory",
            room_id = %room_id,
            "Reviving room actor from storage"
        );

        Ok(self.spawn_room(room_id))
    }

    /// Retire a room actor. The map entry is removed immediately; the task
    /// is awaited in the background so the directory loop never blocks.
    fn handle_retire_room(&mut self, room_id: &RoomId) {
        let Some(managed) = self.rooms.remove(room_id) else {
            return;
        };

        managed.handle.cancel();

        let id = room_id.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, managed.task_handle).await {
                Ok(_) => {
                    debug!(
                        target: "engine.actor.directory",
                        room_id = %id,
                        "Retired room actor finished"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "engine.actor.directory",
                        room_id = %id,
                        "Retired room actor did not finish within timeout"
                    );
                }
            }
        });

        info!(
            target: "engine.actor.directory",
            room_id = %room_id,
            live_rooms = self.rooms.len(),
            "Room actor retired"
        );
    }

    /// Spawn a room actor under a child cancellation token and register it.
    fn spawn_room(&mut self, room_id: RoomId) -> RoomActorHandle {
        let (handle, task_handle) = RoomActor::spawn(
            room_id.clone(),
            self.store.clone(),
            self.notifier.clone(),
            &self.config,
            self.cancel_token.child_token(),
        );

        self.rooms.insert(
            room_id,
            ManagedRoom {
                handle: handle.clone(),
                task_handle,
            },
        );

        handle
    }

    /// Cancel every room actor and wait (bounded) for the tasks to finish.
    async fn shutdown_rooms(&mut self) {
        let count = self.rooms.len();
        if count > 0 {
            info!(
                target: "engine.actor.directory",
                rooms = count,
                "Shutting down room actors"
            );
        }

        for (room_id, managed) in self.rooms.drain() {
            managed.handle.cancel();
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, managed.task_handle)
                .await
                .is_err()
            {
                warn!(
                    target: "engine.actor.directory",
                    room_id = %room_id,
                    "Room actor did not shut down within timeout"
                );
            }
        }
    }
}
