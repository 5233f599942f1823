//! Engine configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults. Presence expiry is deliberately opt-in: with no TTL configured
//! a participant that never leaves stays in the membership set indefinitely,
//! because client disconnects are a hint, not a guaranteed signal.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default presence sweep interval in seconds.
pub const DEFAULT_PRESENCE_SWEEP_INTERVAL_SECONDS: u64 = 5;

/// Default room actor mailbox buffer size.
pub const DEFAULT_ROOM_MAILBOX_BUFFER: usize = 256;

/// Default directory actor mailbox buffer size.
pub const DEFAULT_DIRECTORY_MAILBOX_BUFFER: usize = 1024;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Lease duration after which a member that has neither acted nor
    /// renewed presence is removed. `None` disables expiry entirely.
    pub presence_ttl: Option<Duration>,

    /// How often each room actor checks for expired presence leases.
    pub presence_sweep_interval: Duration,

    /// Room actor mailbox buffer size.
    pub room_mailbox_buffer: usize,

    /// Directory actor mailbox buffer size.
    pub directory_mailbox_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            presence_ttl: None,
            presence_sweep_interval: Duration::from_secs(
                DEFAULT_PRESENCE_SWEEP_INTERVAL_SECONDS,
            ),
            room_mailbox_buffer: DEFAULT_ROOM_MAILBOX_BUFFER,
            directory_mailbox_buffer: DEFAULT_DIRECTORY_MAILBOX_BUFFER,
        }
    }
}

/// Configuration loading error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid configuration value for {0}: {1}")]
    InvalidValue(String, String),
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let presence_ttl = match vars.get("ENGINE_PRESENCE_TTL_SECONDS") {
            None => None,
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    ConfigError::InvalidValue(
                        "ENGINE_PRESENCE_TTL_SECONDS".to_string(),
                        raw.clone(),
                    )
                })?;
                // 0 means "disabled", matching the no-expiry default.
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        let presence_sweep_interval = vars
            .get("ENGINE_PRESENCE_SWEEP_INTERVAL_SECONDS")
            .and_then(|s| s.parse().ok())
            .map_or(
                Duration::from_secs(DEFAULT_PRESENCE_SWEEP_INTERVAL_SECONDS),
                Duration::from_secs,
            );

        let room_mailbox_buffer = vars
            .get("ENGINE_ROOM_MAILBOX_BUFFER")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ROOM_MAILBOX_BUFFER);

        let directory_mailbox_buffer = vars
            .get("ENGINE_DIRECTORY_MAILBOX_BUFFER")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DIRECTORY_MAILBOX_BUFFER);

        Ok(Self {
            presence_ttl,
            presence_sweep_interval,
            room_mailbox_buffer,
            directory_mailbox_buffer,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_vars(&HashMap::new()).unwrap();

        assert!(config.presence_ttl.is_none());
        assert_eq!(
            config.presence_sweep_interval,
            Duration::from_secs(DEFAULT_PRESENCE_SWEEP_INTERVAL_SECONDS)
        );
        assert_eq!(config.room_mailbox_buffer, DEFAULT_ROOM_MAILBOX_BUFFER);
        assert_eq!(
            config.directory_mailbox_buffer,
            DEFAULT_DIRECTORY_MAILBOX_BUFFER
        );
    }

    #[test]
    fn test_presence_ttl_parsing() {
        let vars = HashMap::from([(
            "ENGINE_PRESENCE_TTL_SECONDS".to_string(),
            "90".to_string(),
        )]);
        let config = EngineConfig::from_vars(&vars).unwrap();
        assert_eq!(config.presence_ttl, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_presence_ttl_zero_means_disabled() {
        let vars = HashMap::from([(
            "ENGINE_PRESENCE_TTL_SECONDS".to_string(),
            "0".to_string(),
        )]);
        let config = EngineConfig::from_vars(&vars).unwrap();
        assert!(config.presence_ttl.is_none());
    }

    #[test]
    fn test_presence_ttl_invalid_value() {
        let vars = HashMap::from([(
            "ENGINE_PRESENCE_TTL_SECONDS".to_string(),
            "soon".to_string(),
        )]);
        let result = EngineConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(var, _)) if var == "ENGINE_PRESENCE_TTL_SECONDS"));
    }

    #[test]
    fn test_custom_buffers() {
        let vars = HashMap::from([
            ("ENGINE_ROOM_MAILBOX_BUFFER".to_string(), "32".to_string()),
            (
                "ENGINE_DIRECTORY_MAILBOX_BUFFER".to_string(),
                "64".to_string(),
            ),
        ]);
        let config = EngineConfig::from_vars(&vars).unwrap();
        assert_eq!(config.room_mailbox_buffer, 32);
        assert_eq!(config.directory_mailbox_buffer, 64);
    }
}
