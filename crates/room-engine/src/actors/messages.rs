//! Message types for actor communication.
//!
//! All inter-actor communication uses strongly-typed message passing via
//! `tokio::sync::mpsc`. Response patterns use `tokio::sync::oneshot` for
//! request-reply semantics.

use tokio::sync::oneshot;

use crate::errors::EngineError;
use crate::model::{CreateRoomParams, MatchRecord, RoomState};
use crate::types::{ItemId, RoomId, UserId};

use super::room::RoomActorHandle;

/// Messages sent to the `RoomDirectoryActor`.
#[derive(Debug)]
pub enum DirectoryMessage {
    /// Create a new room and spawn its actor.
    CreateRoom {
        owner: UserId,
        params: CreateRoomParams,
        /// Response channel for the new room's id.
        respond_to: oneshot::Sender<Result<RoomId, EngineError>>,
    },

    /// Resolve a handle to the room's actor, reviving it from storage if the
    /// record exists but no actor is running.
    ResolveRoom {
        room_id: RoomId,
        /// Response channel for the room actor handle.
        respond_to: oneshot::Sender<Result<RoomActorHandle, EngineError>>,
    },

    /// Retire a room actor after its room was deleted.
    RetireRoom {
        room_id: RoomId,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<()>,
    },

    /// Get current directory status (for health checks).
    GetStatus {
        /// Response channel for directory status.
        respond_to: oneshot::Sender<DirectoryStatus>,
    },
}

/// Directory status snapshot.
#[derive(Debug, Clone)]
pub struct DirectoryStatus {
    /// Number of rooms with a live actor.
    pub live_rooms: usize,
    /// Whether the directory is shutting down.
    pub is_shutting_down: bool,
}

/// Messages sent to a `RoomActor`.
#[derive(Debug)]
pub enum RoomMessage {
    /// A participant joins the room.
    Join {
        user: UserId,
        /// Response channel for the post-join membership snapshot.
        respond_to: oneshot::Sender<Result<Vec<UserId>, EngineError>>,
    },

    /// A participant leaves the room (idempotent).
    Leave {
        user: UserId,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), EngineError>>,
    },

    /// A participant approves a candidate item.
    Vote {
        user: UserId,
        item: ItemId,
        /// Response channel for the vote outcome.
        respond_to: oneshot::Sender<Result<VoteOutcome, EngineError>>,
    },

    /// Current membership snapshot.
    Members {
        /// Response channel for the membership set.
        respond_to: oneshot::Sender<Result<Vec<UserId>, EngineError>>,
    },

    /// Current lifecycle state and last declared match.
    MatchStatus {
        /// Response channel for the status.
        respond_to: oneshot::Sender<Result<RoomStatus, EngineError>>,
    },

    /// Refresh a member's presence lease.
    RenewPresence {
        user: UserId,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), EngineError>>,
    },

    /// Delete the room (owner only); runs the full cleanup cascade.
    Delete {
        requester: UserId,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), EngineError>>,
    },
}

/// Outcome of a successful vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was recorded; no consensus yet.
    Recorded,
    /// Every current member has approved this item.
    Matched {
        /// The matched item.
        item: ItemId,
        /// Membership set at match time, sorted.
        members: Vec<UserId>,
    },
}

/// Room lifecycle status returned by `MatchStatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatus {
    /// Current lifecycle state.
    pub state: RoomState,
    /// Most recently declared match, if any.
    pub last_match: Option<MatchRecord>,
}
