//! Room record schema.
//!
//! The room record is an explicit, validated schema persisted as JSON at
//! `room:{id}`. The candidate list is fixed at creation and immutable
//! thereafter; membership and votes live in separate set keys so they can be
//! mutated atomically without rewriting the record.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::types::{ItemId, RoomId, UserId};

/// Room lifecycle state.
///
/// `Active → Draining → Closed`. A `Draining` room has no members and no
/// votes but keeps its record so it can be rejoined; `Closed` rooms have no
/// record at all (the state only appears in-flight during deletion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    /// Normal operation.
    Active,
    /// Membership reached zero; vote ledger purged, record retained.
    Draining,
    /// Deleted by the owner; the record is gone.
    Closed,
}

/// A declared consensus match, retained on the room record so late
/// observers can render the result after the vote ledger is purged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// The item every member approved.
    pub item: ItemId,
    /// The full membership set at match time, sorted.
    pub members: Vec<UserId>,
    /// Unix timestamp of the match.
    pub matched_at: i64,
}

/// Parameters for room creation, validated at the boundary.
#[derive(Debug, Clone)]
pub struct CreateRoomParams {
    /// Display name shown to participants. Must be non-empty.
    pub display_name: String,
    /// City label for the candidate items.
    pub city: String,
    /// Candidate items; at least two distinct entries required.
    pub candidate_items: Vec<ItemId>,
    /// Whether the room is hidden from public discovery.
    pub is_private: bool,
}

impl CreateRoomParams {
    /// Validate the parameters, returning the deduplicated candidate list.
    ///
    /// Duplicate candidate entries are collapsed (keeping first occurrence)
    /// before the minimum-size check, so a ballot of two identical items is
    /// rejected.
    pub fn validate(&self) -> Result<Vec<ItemId>, EngineError> {
        if self.display_name.trim().is_empty() {
            return Err(EngineError::InvalidRoom(
                "display name must not be empty".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        let items: Vec<ItemId> = self
            .candidate_items
            .iter()
            .filter(|item| seen.insert((*item).clone()))
            .cloned()
            .collect();

        if items.len() < 2 {
            return Err(EngineError::InvalidRoom(
                "at least two candidate items are required".to_string(),
            ));
        }

        Ok(items)
    }
}

/// The persisted room record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Room identifier.
    pub room_id: RoomId,
    /// Display name.
    pub display_name: String,
    /// City label.
    pub city: String,
    /// Fixed candidate list, set at creation.
    pub candidate_items: Vec<ItemId>,
    /// The creating participant; the only one permitted to delete the room.
    pub owner: UserId,
    /// Privacy flag.
    pub is_private: bool,
    /// Lifecycle state.
    pub state: RoomState,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Most recently declared match, if any.
    pub last_match: Option<MatchRecord>,
}

impl RoomRecord {
    /// Build a new `Active` record from validated creation parameters.
    pub fn create(
        room_id: RoomId,
        owner: UserId,
        params: &CreateRoomParams,
    ) -> Result<Self, EngineError> {
        let candidate_items = params.validate()?;

        Ok(Self {
            room_id,
            display_name: params.display_name.trim().to_string(),
            city: params.city.clone(),
            candidate_items,
            owner,
            is_private: params.is_private,
            state: RoomState::Active,
            created_at: Utc::now().timestamp(),
            last_match: None,
        })
    }

    /// Serialize the record for storage.
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self)
            .map_err(|e| EngineError::Internal(format!("room record serialization failed: {e}")))
    }

    /// Deserialize a record read from storage.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::Internal(format!("room record deserialization failed: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn params(items: &[&str]) -> CreateRoomParams {
        CreateRoomParams {
            display_name: "Friday dinner".to_string(),
            city: "Austin".to_string(),
            candidate_items: items.iter().map(|s| ItemId::from(*s)).collect(),
            is_private: false,
        }
    }

    #[test]
    fn test_validate_rejects_single_item() {
        let result = params(&["tacos"]).validate();
        assert!(matches!(result, Err(EngineError::InvalidRoom(_))));
    }

    #[test]
    fn test_validate_accepts_two_items() {
        let items = params(&["tacos", "ramen"]).validate().unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_validate_rejects_empty_display_name() {
        let mut p = params(&["tacos", "ramen"]);
        p.display_name = "   ".to_string();
        assert!(matches!(p.validate(), Err(EngineError::InvalidRoom(_))));
    }

    #[test]
    fn test_validate_collapses_duplicates() {
        // Two copies of the same item are one distinct candidate.
        let result = params(&["tacos", "tacos"]).validate();
        assert!(matches!(result, Err(EngineError::InvalidRoom(_))));

        let items = params(&["tacos", "tacos", "ramen"]).validate().unwrap();
        assert_eq!(items, vec![ItemId::from("tacos"), ItemId::from("ramen")]);
    }

    #[test]
    fn test_record_round_trip() {
        let record = RoomRecord::create(
            RoomId::from("room-1"),
            UserId::from("owner-1"),
            &params(&["tacos", "ramen"]),
        )
        .unwrap();

        assert_eq!(record.state, RoomState::Active);
        assert!(record.last_match.is_none());

        let json = record.to_json().unwrap();
        let back = RoomRecord::from_json(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_trims_display_name() {
        let mut p = params(&["tacos", "ramen"]);
        p.display_name = "  Friday dinner  ".to_string();

        let record =
            RoomRecord::create(RoomId::from("room-1"), UserId::from("owner-1"), &p).unwrap();
        assert_eq!(record.display_name, "Friday dinner");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = RoomRecord::from_json("{not json}");
        assert!(matches!(result, Err(EngineError::Internal(_))));
    }
}
