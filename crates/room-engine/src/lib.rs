//! Room session and consensus matching engine.
//!
//! Small groups gather in short-lived decision rooms, each seeded with a
//! fixed ballot of candidate items. Members cast approval votes; the moment
//! the set of approvers for one item exactly equals the current membership
//! set, the engine declares a match and clears the ledger.
//!
//! # Architecture
//!
//! The engine uses an actor-based design for strict per-room serialization:
//!
//! ```text
//! RoomEngine (facade)
//!     |
//!     v
//! RoomDirectoryActor (singleton)
//!     |
//!     +-- RoomActor (room A)
//!     +-- RoomActor (room B)
//!     +-- RoomActor (room C)
//! ```
//!
//! Each room's actor is the single writer for that room's membership, vote
//! ledger, and lifecycle, so two concurrent votes in one room can never both
//! miss the consensus check. Rooms never share an actor and proceed fully in
//! parallel.
//!
//! Persistence goes through the [`store::Store`] collaborator; change
//! notification goes through the [`notify::Notifier`] collaborator. The
//! engine implements neither.

pub mod actors;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod notify;
pub mod store;
pub mod types;

pub use actors::{DirectoryStatus, RoomStatus, VoteOutcome};
pub use config::EngineConfig;
pub use engine::RoomEngine;
pub use errors::EngineError;
pub use model::{CreateRoomParams, MatchRecord, RoomRecord, RoomState};
pub use notify::{Notifier, RoomDelta};
pub use store::{Store, StoreError, WriteOp};
pub use types::{ItemId, RoomId, UserId};
