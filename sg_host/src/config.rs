//! Host configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use set_game::{DEFAULT_CLAIM_WINDOW, DEFAULT_NUM_PLAYERS, GameSettings, MAX_PLAYERS, server::HostConfig};
use std::{net::SocketAddr, time::Duration};

/// Address the host listens on when nothing else is configured.
pub const DEFAULT_BIND: &str = "127.0.0.1:9999";

/// Complete host configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Host bind address
    pub bind: SocketAddr,
    /// Peers to wait for before the game starts
    pub players: usize,
    /// How long a claim holder is protected from competing claims
    pub claim_window: Duration,
}

/// Values given on the command line. Each one wins over its environment
/// variable.
#[derive(Debug, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub players: Option<usize>,
    pub claim_window_secs: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed.
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => match std::env::var("SG_BIND") {
                Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                    var: "SG_BIND".to_string(),
                    reason: format!("`{value}` is not an IP:PORT address"),
                })?,
                Err(_) => default_bind()?,
            },
        };

        let players = overrides
            .players
            .unwrap_or_else(|| parse_env_or("SG_PLAYERS", DEFAULT_NUM_PLAYERS));

        let claim_window_secs = overrides
            .claim_window_secs
            .unwrap_or_else(|| parse_env_or("SG_CLAIM_WINDOW_SECS", DEFAULT_CLAIM_WINDOW.as_secs()));

        Ok(ServerConfig {
            bind,
            players,
            claim_window: Duration::from_secs(claim_window_secs),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_PLAYERS).contains(&self.players) {
            return Err(ConfigError::Invalid {
                var: "SG_PLAYERS".to_string(),
                reason: format!("Must be between 1 and {MAX_PLAYERS}"),
            });
        }

        if self.claim_window.is_zero() {
            return Err(ConfigError::Invalid {
                var: "SG_CLAIM_WINDOW_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn host_config(&self) -> HostConfig {
        HostConfig::from(GameSettings::new(self.claim_window, self.players))
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> Result<SocketAddr, ConfigError> {
    DEFAULT_BIND.parse().map_err(|_| ConfigError::Invalid {
        var: "SG_BIND".to_string(),
        reason: "default address does not parse".to_string(),
    })
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
