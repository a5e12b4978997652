//! In-memory platform for tests.
//!
//! Records every call with the (possibly paused) tokio clock so timing
//! properties like the TTS grace window can be asserted exactly. Individual
//! operations can be made to fail to exercise the swallow-and-continue paths.

use super::{PlatformError, PlatformGateway, PlatformOperation, SentMessage};
use crate::display::{DisplayKind, PanelView};
use common::types::{ChannelId, GuildId, Member, MessageId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    FetchVoiceMembers {
        guild_id: GuildId,
        channel_id: ChannelId,
    },
    Grant {
        channel_id: ChannelId,
        user_id: UserId,
    },
    Revoke {
        channel_id: ChannelId,
        user_id: UserId,
    },
    Send {
        channel_id: ChannelId,
        message_id: MessageId,
        text: String,
        tts: bool,
        at: Instant,
    },
    Delete {
        channel_id: ChannelId,
        message_id: MessageId,
        at: Instant,
    },
    Refresh {
        channel_id: ChannelId,
        kind: DisplayKind,
    },
}

#[derive(Debug, Default)]
struct MockState {
    voice_members: HashMap<ChannelId, Vec<Member>>,
    calls: Vec<PlatformCall>,
    failing: HashSet<PlatformOperation>,
    fetch_delay: Option<Duration>,
}

/// Mock chat platform.
#[derive(Debug, Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
    next_message_id: AtomicU64,
}

impl MockPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the members connected to `channel_id`.
    #[must_use]
    pub fn with_voice_members(self, channel_id: impl Into<ChannelId>, members: Vec<Member>) -> Self {
        self.set_voice_members(channel_id, members);
        self
    }

    pub fn set_voice_members(&self, channel_id: impl Into<ChannelId>, members: Vec<Member>) {
        self.lock().voice_members.insert(channel_id.into(), members);
    }

    /// Delay every member fetch (simulated time).
    #[must_use]
    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        self.lock().fetch_delay = Some(delay);
        self
    }

    /// Make `operation` fail until [`MockPlatform::recover`] is called.
    pub fn fail(&self, operation: PlatformOperation) {
        self.lock().failing.insert(operation);
    }

    pub fn recover(&self, operation: PlatformOperation) {
        self.lock().failing.remove(&operation);
    }

    /// Every call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock().calls.clone()
    }

    /// Users granted priority speaker, in order.
    #[must_use]
    pub fn grants(&self) -> Vec<UserId> {
        self.filter(|call| match call {
            PlatformCall::Grant { user_id, .. } => Some(user_id.clone()),
            _ => None,
        })
    }

    /// Users whose priority speaker was revoked, in order.
    #[must_use]
    pub fn revokes(&self) -> Vec<UserId> {
        self.filter(|call| match call {
            PlatformCall::Revoke { user_id, .. } => Some(user_id.clone()),
            _ => None,
        })
    }

    /// `(message id, text, tts, sent at)` for every announcement.
    #[must_use]
    pub fn announcements(&self) -> Vec<(MessageId, String, bool, Instant)> {
        self.filter(|call| match call {
            PlatformCall::Send {
                message_id,
                text,
                tts,
                at,
                ..
            } => Some((message_id.clone(), text.clone(), *tts, *at)),
            _ => None,
        })
    }

    /// `(message id, deleted at)` for every deletion.
    #[must_use]
    pub fn deletions(&self) -> Vec<(MessageId, Instant)> {
        self.filter(|call| match call {
            PlatformCall::Delete { message_id, at, .. } => Some((message_id.clone(), *at)),
            _ => None,
        })
    }

    /// Panel views shown, in order.
    #[must_use]
    pub fn displays(&self) -> Vec<DisplayKind> {
        self.filter(|call| match call {
            PlatformCall::Refresh { kind, .. } => Some(*kind),
            _ => None,
        })
    }

    fn filter<T>(&self, f: impl FnMut(&PlatformCall) -> Option<T>) -> Vec<T> {
        self.lock().calls.iter().filter_map(f).collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call` unless `operation` is set to fail.
    fn record(&self, operation: PlatformOperation, call: PlatformCall) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.failing.contains(&operation) {
            return Err(PlatformError::Status {
                status: 500,
                body: format!("mock {} failure", operation.as_str()),
            });
        }
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait::async_trait]
impl PlatformGateway for MockPlatform {
    async fn fetch_voice_members(
        &self,
        guild_id: &GuildId,
        channel_id: &ChannelId,
    ) -> Result<Vec<Member>, PlatformError> {
        let delay = self.lock().fetch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record(
            PlatformOperation::FetchVoiceMembers,
            PlatformCall::FetchVoiceMembers {
                guild_id: guild_id.clone(),
                channel_id: channel_id.clone(),
            },
        )?;
        Ok(self
            .lock()
            .voice_members
            .get(channel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_priority_speaker(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
        grant: bool,
    ) -> Result<(), PlatformError> {
        let channel_id = channel_id.clone();
        let user_id = user_id.clone();
        let call = if grant {
            PlatformCall::Grant {
                channel_id,
                user_id,
            }
        } else {
            PlatformCall::Revoke {
                channel_id,
                user_id,
            }
        };
        self.record(PlatformOperation::SetPrioritySpeaker, call)
    }

    async fn send_announcement(
        &self,
        channel_id: &ChannelId,
        text: &str,
        tts: bool,
    ) -> Result<SentMessage, PlatformError> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        let message_id = MessageId::from(format!("msg-{id}"));
        let at = Instant::now();
        self.record(
            PlatformOperation::SendAnnouncement,
            PlatformCall::Send {
                channel_id: channel_id.clone(),
                message_id: message_id.clone(),
                text: text.to_string(),
                tts,
                at,
            },
        )?;
        Ok(SentMessage {
            id: message_id,
            sent_at: at,
        })
    }

    async fn delete_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), PlatformError> {
        self.record(
            PlatformOperation::DeleteMessage,
            PlatformCall::Delete {
                channel_id: channel_id.clone(),
                message_id: message_id.clone(),
                at: Instant::now(),
            },
        )
    }

    async fn refresh_display(
        &self,
        channel_id: &ChannelId,
        view: &PanelView,
    ) -> Result<(), PlatformError> {
        self.record(
            PlatformOperation::RefreshDisplay,
            PlatformCall::Refresh {
                channel_id: channel_id.clone(),
                kind: view.kind,
            },
        )
    }
}
