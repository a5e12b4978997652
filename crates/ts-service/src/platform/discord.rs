//! Discord REST implementation of [`PlatformGateway`].
//!
//! Only plain REST calls are used; no gateway connection is needed.
//!
//! # Voice members
//!
//! REST has no "members in voice channel" listing, so guild members are
//! listed once and each one's voice state is looked up. A 404 voice state
//! means the member is not connected anywhere.

use super::{PlatformError, PlatformGateway, SentMessage};
use crate::display::PanelView;
use chrono::{DateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use common::types::{ChannelId, GuildId, Member, MessageId, UserId};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

/// Timeout for a single REST call.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Connect timeout.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// `PRIORITY_SPEAKER` permission bit.
pub const PRIORITY_SPEAKER: u64 = 1 << 8;

/// Permission overwrite type for a single member.
const OVERWRITE_TYPE_MEMBER: u8 = 1;

const AVATAR_CDN: &str = "https://cdn.discordapp.com/avatars";

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct ApiGuildMember {
    user: ApiUser,
    #[serde(default)]
    nick: Option<String>,
}

impl ApiGuildMember {
    fn into_member(self) -> Member {
        let avatar_url = self
            .user
            .avatar
            .as_ref()
            .map(|hash| format!("{AVATAR_CDN}/{}/{hash}.png", self.user.id));
        let display_name = self
            .nick
            .or(self.user.global_name)
            .unwrap_or(self.user.username);
        let mut member = Member::new(self.user.id, display_name);
        member.avatar_url = avatar_url;
        member
    }
}

#[derive(Debug, Deserialize)]
struct ApiVoiceState {
    #[serde(default)]
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    id: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct PermissionOverwrite {
    #[serde(rename = "type")]
    kind: u8,
    allow: String,
    deny: String,
}

impl PermissionOverwrite {
    fn priority_speaker(grant: bool) -> Self {
        let (allow, deny) = if grant {
            (PRIORITY_SPEAKER, 0)
        } else {
            (0, PRIORITY_SPEAKER)
        };
        Self {
            kind: OVERWRITE_TYPE_MEMBER,
            allow: allow.to_string(),
            deny: deny.to_string(),
        }
    }
}

/// Discord REST client.
pub struct DiscordGateway {
    client: Client,
    base_url: String,
    /// Bot token (protected by `SecretString`).
    token: SecretString,
    member_fetch_limit: u32,
    /// Control-panel message per channel, posted on first refresh.
    panels: Mutex<HashMap<ChannelId, MessageId>>,
}

impl DiscordGateway {
    /// Create a new Discord client.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Http` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        member_fetch_limit: u32,
    ) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "ts.platform", error = %e, "Failed to build HTTP client");
                PlatformError::Http(e.to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            member_fetch_limit,
            panels: Mutex::new(HashMap::new()),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header(
                "Authorization",
                format!("Bot {}", self.token.expose_secret()),
            )
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, PlatformError> {
        let response = request.send().await.map_err(|e| {
            warn!(target: "ts.platform", error = %e, "Discord request failed");
            PlatformError::Http(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Err(PlatformError::NotFound(body))
        } else {
            if status == StatusCode::UNAUTHORIZED {
                error!(target: "ts.platform", "Bot token rejected by Discord");
            } else {
                warn!(target: "ts.platform", status = %status, body = %body, "Discord returned error");
            }
            Err(PlatformError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PlatformError> {
        response.json().await.map_err(|e| {
            error!(target: "ts.platform", error = %e, "Failed to parse Discord response");
            PlatformError::InvalidResponse(e.to_string())
        })
    }

    /// Voice channel the user is connected to, if any.
    async fn voice_channel_of(
        &self,
        guild_id: &GuildId,
        user_id: &str,
    ) -> Result<Option<String>, PlatformError> {
        let path = format!("/guilds/{guild_id}/voice-states/{user_id}");
        match self.send(self.request(reqwest::Method::GET, &path)).await {
            Ok(response) => Ok(Self::json::<ApiVoiceState>(response).await?.channel_id),
            Err(PlatformError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn post_panel(
        &self,
        channel_id: &ChannelId,
        payload: &Value,
    ) -> Result<MessageId, PlatformError> {
        let path = format!("/channels/{channel_id}/messages");
        let response = self
            .send(self.request(reqwest::Method::POST, &path).json(payload))
            .await?;
        let message: ApiMessage = Self::json(response).await?;
        Ok(MessageId::from(message.id))
    }

    async fn edit_panel(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        payload: &Value,
    ) -> Result<(), PlatformError> {
        let path = format!("/channels/{channel_id}/messages/{message_id}");
        self.send(self.request(reqwest::Method::PATCH, &path).json(payload))
            .await?;
        Ok(())
    }
}

/// Map a platform timestamp onto the monotonic clock.
fn monotonic_from(timestamp: Option<DateTime<Utc>>) -> Instant {
    let now = Instant::now();
    let age = timestamp
        .and_then(|ts| (Utc::now() - ts).to_std().ok())
        .unwrap_or_default();
    now.checked_sub(age).unwrap_or(now)
}

/// Embed + components payload for a panel view.
fn panel_payload(view: &PanelView) -> Value {
    let mut embed = json!({
        "title": view.title,
        "color": view.color,
        "fields": view.fields.iter().map(|f| json!({
            "name": f.name,
            "value": f.value,
            "inline": f.inline,
        })).collect::<Vec<_>>(),
    });
    if let Some(description) = &view.description {
        embed["description"] = json!(description);
    }
    if let Some(footer) = &view.footer {
        embed["footer"] = json!({ "text": footer });
    }

    let mut components = Vec::new();
    if let Some(select) = &view.select {
        components.push(json!({
            "type": 1,
            "components": [{
                "type": 3,
                "custom_id": select.custom_id,
                "placeholder": select.placeholder,
                "max_values": 1,
                "options": select.options.iter().map(|(label, value)| json!({
                    "label": label,
                    "value": value,
                })).collect::<Vec<_>>(),
            }],
        }));
    }
    if !view.buttons.is_empty() {
        components.push(json!({
            "type": 1,
            "components": view.buttons.iter().map(|b| json!({
                "type": 2,
                "style": b.style.code(),
                "label": b.label,
                "custom_id": b.custom_id,
                "emoji": { "name": b.emoji },
            })).collect::<Vec<_>>(),
        }));
    }

    json!({ "embeds": [embed], "components": components })
}

#[async_trait::async_trait]
impl PlatformGateway for DiscordGateway {
    #[instrument(skip_all, fields(guild_id = %guild_id, channel_id = %channel_id))]
    async fn fetch_voice_members(
        &self,
        guild_id: &GuildId,
        channel_id: &ChannelId,
    ) -> Result<Vec<Member>, PlatformError> {
        let path = format!("/guilds/{guild_id}/members");
        let response = self
            .send(
                self.request(reqwest::Method::GET, &path)
                    .query(&[("limit", self.member_fetch_limit)]),
            )
            .await?;
        let guild_members: Vec<ApiGuildMember> = Self::json(response).await?;

        let mut members = Vec::new();
        for guild_member in guild_members {
            if guild_member.user.bot {
                continue;
            }
            match self.voice_channel_of(guild_id, &guild_member.user.id).await {
                Ok(Some(voice)) if voice == channel_id.as_str() => {
                    members.push(guild_member.into_member());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        target: "ts.platform",
                        user_id = %guild_member.user.id,
                        error = %e,
                        "Failed to fetch voice state, skipping member"
                    );
                }
            }
        }

        debug!(target: "ts.platform", members = members.len(), "Fetched voice members");
        Ok(members)
    }

    async fn set_priority_speaker(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
        grant: bool,
    ) -> Result<(), PlatformError> {
        let path = format!("/channels/{channel_id}/permissions/{user_id}");
        self.send(
            self.request(reqwest::Method::PUT, &path)
                .json(&PermissionOverwrite::priority_speaker(grant)),
        )
        .await?;
        Ok(())
    }

    async fn send_announcement(
        &self,
        channel_id: &ChannelId,
        text: &str,
        tts: bool,
    ) -> Result<SentMessage, PlatformError> {
        let path = format!("/channels/{channel_id}/messages");
        let response = self
            .send(
                self.request(reqwest::Method::POST, &path)
                    .json(&json!({ "content": text, "tts": tts })),
            )
            .await?;
        let message: ApiMessage = Self::json(response).await?;
        Ok(SentMessage {
            id: MessageId::from(message.id),
            sent_at: monotonic_from(message.timestamp),
        })
    }

    async fn delete_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), PlatformError> {
        let path = format!("/channels/{channel_id}/messages/{message_id}");
        self.send(self.request(reqwest::Method::DELETE, &path))
            .await?;
        Ok(())
    }

    /// Post the panel on first use, edit it afterwards. The final view is the
    /// last edit; the channel's panel is forgotten after it.
    async fn refresh_display(
        &self,
        channel_id: &ChannelId,
        view: &PanelView,
    ) -> Result<(), PlatformError> {
        let payload = panel_payload(view);
        let mut panels = self.panels.lock().await;

        let existing = if view.is_final() {
            panels.remove(channel_id)
        } else {
            panels.get(channel_id).cloned()
        };

        match existing {
            Some(message_id) => self.edit_panel(channel_id, &message_id, &payload).await,
            None if view.is_final() => Ok(()),
            None => {
                let message_id = self.post_panel(channel_id, &payload).await?;
                panels.insert(channel_id.clone(), message_id);
                Ok(())
            }
        }
    }
}
