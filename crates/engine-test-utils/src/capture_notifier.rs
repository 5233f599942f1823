//! Capturing `Notifier` implementation for engine testing.
//!
//! Records every published delta in publish order so tests can assert on
//! the per-room delta stream.

use std::sync::Mutex;

use async_trait::async_trait;
use room_engine::{Notifier, RoomDelta, RoomId};

/// Notifier that records published deltas instead of delivering them.
#[derive(Debug, Default)]
pub struct CaptureNotifier {
    published: Mutex<Vec<(RoomId, RoomDelta)>>,
}

impl CaptureNotifier {
    /// Create an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// All published deltas, in publish order.
    pub fn all(&self) -> Vec<(RoomId, RoomDelta)> {
        self.published.lock().unwrap().clone()
    }

    /// Deltas published for one room, in publish order.
    pub fn deltas_for(&self, room_id: &RoomId) -> Vec<RoomDelta> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == room_id)
            .map(|(_, delta)| delta.clone())
            .collect()
    }

    /// Total number of published deltas.
    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    /// Discard everything captured so far.
    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for CaptureNotifier {
    async fn publish(&self, room_id: &RoomId, delta: RoomDelta) {
        self.published
            .lock()
            .unwrap()
            .push((room_id.clone(), delta));
    }
}
