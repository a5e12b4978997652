//! Talking-stick session engine.
//!
//! # Components
//!
//! - [`MemberRing`] - circular pass order, fixed at creation
//! - [`Session`] - per-channel state machine plus one background worker
//! - [`SessionRegistry`] - channel → session table, one live session per channel
//!
//! # Lifecycle
//!
//! ```text
//! New ──start──▶ Active ◀──resume── Paused
//!                  │ ──pause──────────▲
//!                  │
//!   end / idle / ring exhausted
//!                  ▼
//!                Ended ──▶ Close (revoke, announce, drain messages) ──▶ unregister
//! ```
//!
//! Close runs exactly once per session: started sessions close when their
//! worker exits, sessions ended before Start are closed by whoever claims the
//! launch slot.

mod handle;
pub mod metrics;
pub mod registry;
pub mod ring;
pub mod types;
mod worker;

pub use handle::Session;
pub use metrics::{SessionMetrics, SessionMetricsSnapshot};
pub use registry::SessionRegistry;
pub use ring::MemberRing;
pub use types::{
    validate_turn_duration, Action, ActionKind, CloseReason, LoggedMessage, PassTrigger,
    SessionSnapshot, SessionState, MAX_TURN_DURATION, MIN_TURN_DURATION,
};

use std::time::Duration;

/// Timing and ordering knobs shared by every session in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Turn duration when a create request names none.
    pub default_turn_duration: Duration,
    /// A session with no external action for this long ends itself.
    pub idle_timeout: Duration,
    /// Spoken announcements stay up at least this long before deletion.
    pub tts_grace: Duration,
    /// Shuffle the ring at creation.
    pub shuffle_members: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_turn_duration: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(15 * 60),
            tts_grace: Duration::from_secs(5),
            shuffle_members: true,
        }
    }
}
