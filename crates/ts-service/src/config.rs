//! Talking Stick service configuration.
//!
//! Configuration is loaded from environment variables. The bot token is
//! redacted in Debug output.

use crate::session::{validate_turn_duration, SessionSettings};
use common::config::LoggingConfig;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default chat-platform REST base URL.
pub const DEFAULT_DISCORD_API_BASE_URL: &str = "https://discord.com/api/v10";

/// Default bind address for the command API, health and metrics endpoints.
pub const DEFAULT_HTTP_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default turn duration in seconds.
pub const DEFAULT_TURN_SECONDS: u64 = 15;

/// Default inactivity watchdog in seconds (15 minutes).
pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 900;

/// Default TTS grace window in seconds.
pub const DEFAULT_TTS_GRACE_SECONDS: u64 = 5;

/// Upper bound for the idle timeout and TTS grace window (one day).
pub const MAX_TIMER_SECONDS: u64 = 86_400;

/// Default page size when listing guild members.
pub const DEFAULT_MEMBER_FETCH_LIMIT: u32 = 1000;

/// Talking Stick service configuration.
#[derive(Clone)]
pub struct Config {
    /// Bot token used for every REST call.
    /// Protected by `SecretString` to prevent accidental logging.
    pub discord_bot_token: SecretString,

    /// Chat-platform REST base URL.
    pub discord_api_base_url: String,

    /// Bind address for the HTTP server (default: "0.0.0.0:8080").
    pub http_bind_address: String,

    /// Turn duration used when a create request omits one.
    pub default_turn_seconds: u64,

    /// Inactivity watchdog: sessions with no external action for this long end.
    pub idle_timeout_seconds: u64,

    /// Minimum lifetime of a spoken announcement before it may be deleted.
    pub tts_grace_seconds: u64,

    /// Shuffle the member ring when a session is created.
    pub shuffle_members: bool,

    /// Page size for guild member listing.
    pub member_fetch_limit: u32,

    /// Log filter and format.
    pub logging: LoggingConfig,
}

/// Custom Debug implementation that redacts the bot token.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("discord_bot_token", &"[REDACTED]")
            .field("discord_api_base_url", &self.discord_api_base_url)
            .field("http_bind_address", &self.http_bind_address)
            .field("default_turn_seconds", &self.default_turn_seconds)
            .field("idle_timeout_seconds", &self.idle_timeout_seconds)
            .field("tts_grace_seconds", &self.tts_grace_seconds)
            .field("shuffle_members", &self.shuffle_members)
            .field("member_fetch_limit", &self.member_fetch_limit)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let discord_bot_token = SecretString::from(
            vars.get("DISCORD_BOT_TOKEN")
                .ok_or_else(|| ConfigError::MissingEnvVar("DISCORD_BOT_TOKEN".to_string()))?
                .clone(),
        );

        let discord_api_base_url = vars
            .get("DISCORD_API_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE_URL.to_string());

        let http_bind_address = vars
            .get("TS_HTTP_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HTTP_BIND_ADDRESS.to_string());

        let default_turn_seconds = vars
            .get("TS_DEFAULT_TURN_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TURN_SECONDS);

        let idle_timeout_seconds = vars
            .get("TS_IDLE_TIMEOUT_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECONDS);

        let tts_grace_seconds = vars
            .get("TS_TTS_GRACE_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TTS_GRACE_SECONDS);

        let shuffle_members = vars
            .get("TS_SHUFFLE_MEMBERS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        let member_fetch_limit = vars
            .get("TS_MEMBER_FETCH_LIMIT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MEMBER_FETCH_LIMIT);

        validate_turn_duration(Duration::from_secs(default_turn_seconds))
            .map_err(|e| ConfigError::InvalidValue(format!("TS_DEFAULT_TURN_SECONDS: {e}")))?;

        if !(1..=MAX_TIMER_SECONDS).contains(&idle_timeout_seconds) {
            return Err(ConfigError::InvalidValue(format!(
                "TS_IDLE_TIMEOUT_SECONDS must be between 1 and {MAX_TIMER_SECONDS}"
            )));
        }

        // Zero disables the grace window
        if tts_grace_seconds > MAX_TIMER_SECONDS {
            return Err(ConfigError::InvalidValue(format!(
                "TS_TTS_GRACE_SECONDS must be at most {MAX_TIMER_SECONDS}"
            )));
        }

        if !(1..=1000).contains(&member_fetch_limit) {
            return Err(ConfigError::InvalidValue(
                "TS_MEMBER_FETCH_LIMIT must be between 1 and 1000".to_string(),
            ));
        }

        Ok(Config {
            discord_bot_token,
            discord_api_base_url,
            http_bind_address,
            default_turn_seconds,
            idle_timeout_seconds,
            tts_grace_seconds,
            shuffle_members,
            member_fetch_limit,
            logging: LoggingConfig::from_vars(vars),
        })
    }

    /// Timing and ordering settings handed to the session registry.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            default_turn_duration: Duration::from_secs(self.default_turn_seconds),
            idle_timeout: Duration::from_secs(self.idle_timeout_seconds),
            tts_grace: Duration::from_secs(self.tts_grace_seconds),
            shuffle_members: self.shuffle_members,
        }
    }
}
