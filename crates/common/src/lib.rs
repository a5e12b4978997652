//! Common utilities and types shared across Talking Stick components.

#![warn(clippy::pedantic)]

/// Module for chat-platform identifiers and member data
pub mod types;

/// Module for common configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;
