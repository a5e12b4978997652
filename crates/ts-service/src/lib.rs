//! Talking Stick Service Library
//!
//! Turn-taking for voice channels: one member at a time holds the "talking
//! stick" (the platform's priority-speaker permission) and the stick moves
//! around the channel on a timer or on command.
//!
//! # Architecture
//!
//! ```text
//! SessionRegistry (one per process)
//! └── Session (one per voice channel)
//!     ├── MemberRing (pass order, fixed at creation)
//!     ├── worker task (turn timer + inactivity watchdog)
//!     └── close task (revoke, announce, delete announcements)
//! ```
//!
//! Every platform side effect goes through [`platform::PlatformGateway`]; the
//! REST implementation lives in [`platform::discord`] and tests use
//! [`platform::mock::MockPlatform`].
//!
//! # Modules
//!
//! - [`session`] - Sessions, the member ring and the registry
//! - [`display`] - Control-panel view model
//! - [`platform`] - Chat-platform gateway
//! - [`handlers`] / [`routes`] - HTTP command API
//! - [`observability`] - Health endpoints and Prometheus metrics
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with HTTP mappings

pub mod config;
pub mod display;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod platform;
pub mod routes;
pub mod session;
