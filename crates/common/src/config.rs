//! Common configuration types for Talking Stick binaries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default `tracing` filter directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "ts_service=debug,tower_http=debug";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive (e.g. `ts_service=info`)
    pub filter: String,
    /// Emit JSON-formatted logs instead of the human-readable format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Read `RUST_LOG` and `TS_LOG_JSON` from a variable map.
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let filter = vars
            .get("RUST_LOG")
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let json = vars
            .get("TS_LOG_JSON")
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);

        Self { filter, json }
    }
}
