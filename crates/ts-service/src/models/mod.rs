//! Request and response bodies for the command API.

use crate::display::DisplayKind;
use crate::session::{SessionSnapshot, SessionState};
use common::types::{ChannelId, GuildId, Member, UserId};
use serde::{Deserialize, Serialize};

/// `POST /v1/sessions`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub guild_id: GuildId,
    /// Voice channel the session is bound to.
    pub channel_id: ChannelId,
    /// Turn duration; the configured default when absent.
    #[serde(default)]
    pub duration_secs: Option<u64>,
    /// Start immediately after creation.
    #[serde(default)]
    pub auto_start: bool,
}

/// `POST /v1/sessions/:channel_id/pass`
///
/// Without a `user_id` the stick goes to the next member.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PassRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// `POST /v1/sessions/:channel_id/actions/:custom_id`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionRequest {
    /// Selected value for menus (e.g. seconds for `ts_set_duration`).
    #[serde(default)]
    pub value: Option<String>,
}

/// Session state as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub channel_id: ChannelId,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<Member>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Member>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Member>,
    /// Pass order.
    pub members: Vec<Member>,
    pub turn_duration_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<u64>,
    pub display: DisplayKind,
}

impl From<SessionSnapshot> for SessionResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            channel_id: snapshot.channel_id,
            state: snapshot.state,
            holder: snapshot.holder,
            previous: snapshot.previous,
            next: snapshot.next,
            members: snapshot.members,
            turn_duration_secs: snapshot.turn_duration.as_secs(),
            elapsed_secs: snapshot.elapsed.map(|e| e.as_secs()),
            display: snapshot.display,
        }
    }
}
