//! Change notification boundary.
//!
//! The engine publishes a delta after every state-changing operation. Deltas
//! for one room are published in the order the mutations were applied: the
//! room actor is the only publisher for its room and publishes before
//! replying to the caller. Delivery to observers is at-least-once only, so
//! every delta carries a snapshot rather than a diff.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{ItemId, RoomId, UserId};

/// A state delta published after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomDelta {
    /// Membership changed; carries the full post-mutation membership set.
    MembershipChanged {
        /// Current members, sorted for stable comparison.
        members: Vec<UserId>,
    },

    /// A participant approved a candidate item.
    VoteRecorded {
        /// The approved item.
        item: ItemId,
        /// The approving participant.
        voter: UserId,
    },

    /// Every current member has approved the same item.
    MatchDeclared {
        /// The matched item.
        item: ItemId,
        /// The full membership set at match time, sorted.
        members: Vec<UserId>,
    },
}

/// Notification collaborator the engine calls, never implements.
///
/// Implementations fan deltas out to room observers over whatever transport
/// the application uses. Delivery failures are the transport's concern; the
/// engine's ordering guarantee only covers the publish calls themselves.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish a delta for one room.
    async fn publish(&self, room_id: &RoomId, delta: RoomDelta);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_serialization_round_trip() {
        let delta = RoomDelta::MatchDeclared {
            item: ItemId::from("ramen-bar"),
            members: vec![UserId::from("a"), UserId::from("b")],
        };

        let json = serde_json::to_string(&delta).unwrap();
        let back: RoomDelta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, delta);
    }

    #[test]
    fn test_membership_delta_carries_snapshot() {
        let delta = RoomDelta::MembershipChanged {
            members: vec![UserId::from("a")],
        };
        let json = serde_json::to_string(&delta).unwrap();
        assert!(json.contains("MembershipChanged"));
        assert!(json.contains("\"a\""));
    }
}
