//! Actor implementations for the room engine.
//!
//! The engine uses an actor-based architecture with message passing:
//!
//! - `RoomDirectoryActor`: singleton that owns the room-id to actor map,
//!   spawns room actors on creation, revives them from storage on demand,
//!   and retires them after deletion
//! - `RoomActor`: one per live room, the single writer for that room's
//!   membership, votes, and lifecycle
//!
//! All cross-actor communication goes through typed messages over
//! `tokio::sync::mpsc` channels with `oneshot` reply channels. Cancellation
//! flows through a `CancellationToken` tree rooted at the directory.

pub mod directory;
pub mod messages;
pub mod room;

pub use directory::{RoomDirectoryActor, RoomDirectoryHandle};
pub use messages::{DirectoryStatus, RoomStatus, VoteOutcome};
pub use room::{RoomActor, RoomActorHandle};
