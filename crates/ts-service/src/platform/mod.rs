//! Chat-platform collaborator.
//!
//! Sessions never talk to the platform directly; every side effect goes
//! through [`PlatformGateway`] so the turn engine can be driven by the real
//! REST client in production and by [`mock::MockPlatform`] in tests.
//!
//! # Modules
//!
//! - [`discord`] - REST implementation backed by `reqwest`
//! - [`mock`] - In-memory recorder with injectable failures

pub mod discord;
pub mod mock;

pub use discord::DiscordGateway;
pub use mock::MockPlatform;

use crate::display::PanelView;
use common::types::{ChannelId, GuildId, Member, MessageId, UserId};
use thiserror::Error;
use tokio::time::Instant;

/// Errors returned by platform calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The platform answered with a non-success status.
    #[error("platform returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be understood.
    #[error("invalid platform response: {0}")]
    InvalidResponse(String),

    /// The referenced guild, channel, user or message does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Platform calls, as bounded labels for logs, metrics and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformOperation {
    FetchVoiceMembers,
    SetPrioritySpeaker,
    SendAnnouncement,
    DeleteMessage,
    RefreshDisplay,
}

impl PlatformOperation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PlatformOperation::FetchVoiceMembers => "fetch_voice_members",
            PlatformOperation::SetPrioritySpeaker => "set_priority_speaker",
            PlatformOperation::SendAnnouncement => "send_announcement",
            PlatformOperation::DeleteMessage => "delete_message",
            PlatformOperation::RefreshDisplay => "refresh_display",
        }
    }
}

/// A message the platform accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Platform id of the message.
    pub id: MessageId,
    /// When the message was posted, on the monotonic clock.
    pub sent_at: Instant,
}

/// Side effects a talking-stick session needs from the chat platform.
#[async_trait::async_trait]
pub trait PlatformGateway: Send + Sync {
    /// Members currently connected to a voice channel, in platform order.
    async fn fetch_voice_members(
        &self,
        guild_id: &GuildId,
        channel_id: &ChannelId,
    ) -> Result<Vec<Member>, PlatformError>;

    /// Grant (`true`) or revoke (`false`) the priority-speaker flag.
    async fn set_priority_speaker(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
        grant: bool,
    ) -> Result<(), PlatformError>;

    /// Post an announcement, optionally spoken aloud (TTS).
    async fn send_announcement(
        &self,
        channel_id: &ChannelId,
        text: &str,
        tts: bool,
    ) -> Result<SentMessage, PlatformError>;

    /// Delete a previously posted message.
    async fn delete_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), PlatformError>;

    /// Show the control panel for a channel. Optional; the default does nothing.
    async fn refresh_display(
        &self,
        _channel_id: &ChannelId,
        _view: &PanelView,
    ) -> Result<(), PlatformError> {
        Ok(())
    }
}
