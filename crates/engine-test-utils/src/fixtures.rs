//! Pre-configured test fixtures for engine tests.

use std::sync::{Arc, Once};

use room_engine::{CreateRoomParams, EngineConfig, ItemId, RoomEngine};

use crate::{CaptureNotifier, MemoryStore};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging once per process.
///
/// Respects `RUST_LOG`; output goes through the test writer so it only
/// shows for failing tests.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A fully wired engine over in-memory collaborators.
pub struct TestEngine {
    /// The engine under test.
    pub engine: RoomEngine,
    /// Backing store, for direct state inspection and failure injection.
    pub store: Arc<MemoryStore>,
    /// Capturing notifier, for delta assertions.
    pub notifier: Arc<CaptureNotifier>,
}

impl TestEngine {
    /// Engine with default configuration (no presence expiry).
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with custom configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        init_test_logging();

        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CaptureNotifier::new());
        let engine = RoomEngine::new(store.clone(), notifier.clone(), config);

        Self {
            engine,
            store,
            notifier,
        }
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Room creation parameters with a three-item ballot.
pub fn dinner_params() -> CreateRoomParams {
    CreateRoomParams {
        display_name: "Friday dinner".to_string(),
        city: "Austin".to_string(),
        candidate_items: vec![
            ItemId::from("taqueria-azteca"),
            ItemId::from("ramen-bar"),
            ItemId::from("curry-house"),
        ],
        is_private: false,
    }
}

/// Room creation parameters with a custom ballot.
pub fn params_with_items(items: &[&str]) -> CreateRoomParams {
    CreateRoomParams {
        display_name: "Friday dinner".to_string(),
        city: "Austin".to_string(),
        candidate_items: items.iter().map(|s| ItemId::from(*s)).collect(),
        is_private: false,
    }
}
