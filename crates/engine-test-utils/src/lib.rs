//! # Engine Test Utilities
//!
//! Shared test utilities for the Tablematch room engine.
//!
//! Provides in-memory collaborator implementations and fixtures so engine
//! tests run without real infrastructure.
//!
//! ## Modules
//!
//! - `memory_store` - In-memory `Store` with atomic batches and failure
//!   injection
//! - `capture_notifier` - `Notifier` that records deltas for assertions
//! - `fixtures` - Pre-wired engine and room parameter helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use engine_test_utils::{dinner_params, TestEngine};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let t = TestEngine::new();
//!     let room_id = t
//!         .engine
//!         .create_room("alice".into(), dinner_params())
//!         .await
//!         .unwrap();
//!     // Inspect t.store / t.notifier directly...
//! }
//! ```

pub mod capture_notifier;
pub mod fixtures;
pub mod memory_store;

pub use capture_notifier::CaptureNotifier;
pub use fixtures::{dinner_params, init_test_logging, params_with_items, TestEngine};
pub use memory_store::MemoryStore;
