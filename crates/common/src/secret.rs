//! Secret types for keeping credentials out of logs.
//!
//! Re-exports the [`secrecy`] types used for the bot token and any other
//! credential a Talking Stick binary loads from its environment.
//! `SecretString` prints as `[REDACTED]` under `Debug`, so structs holding a
//! token can derive `Debug` and still be logged with `?config`.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct BotCredentials {
//!     application_id: String,
//!     token: SecretString,
//! }
//!
//! let creds = BotCredentials {
//!     application_id: "1100".to_string(),
//!     token: SecretString::from("bot-token"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("bot-token"));
//! let header = format!("Bot {}", creds.token.expose_secret());
//! assert_eq!(header, "Bot bot-token");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
