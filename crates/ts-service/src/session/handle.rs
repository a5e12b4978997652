//! `Session` - one talking-stick session bound to a voice channel.
//!
//! All holder mutations happen under the session's own lock, so concurrent
//! Pass/Skip calls on one channel are applied one at a time in lock order.
//! Platform calls made while holding the lock only ever block this channel.
//!
//! The end signal is a `CancellationToken`: firing it is idempotent and every
//! operation checks it before mutating, so calls after End are rejected or
//! ignored rather than racing Close.

use super::metrics::SessionMetrics;
use super::ring::MemberRing;
use super::types::{
    validate_turn_duration, CloseReason, LoggedMessage, PassTrigger, SessionSnapshot, SessionState,
};
use super::SessionSettings;
use crate::display::{self, ControlPanel};
use crate::errors::TsError;
use crate::platform::{PlatformError, PlatformGateway, PlatformOperation};
use common::types::{ChannelId, Member, UserId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub(super) const PASS_ANNOUNCEMENT_PREFIX: &str = "Passing the talking stick to";
pub(super) const CLOSING_ANNOUNCEMENT: &str = "The talking stick session has ended";

/// A live talking-stick session.
pub struct Session {
    channel_id: ChannelId,
    settings: SessionSettings,
    platform: Arc<dyn PlatformGateway>,
    metrics: Arc<SessionMetrics>,
    /// Single-fire end signal.
    end_token: CancellationToken,
    /// Wakes the worker when a deadline moves.
    pub(super) wake: Notify,
    pub(super) inner: Mutex<SessionInner>,
}

pub(super) struct SessionInner {
    pub(super) ring: MemberRing,
    /// Ring position of the current holder.
    pub(super) active: Option<usize>,
    /// Ring position of the holder replaced by the latest pass.
    pub(super) prev: Option<usize>,
    pub(super) turn_duration: Duration,
    pub(super) state: SessionState,
    /// `None` unless Active.
    pub(super) turn_deadline: Option<Instant>,
    pub(super) idle_deadline: Instant,
    pub(super) messages: Vec<LoggedMessage>,
    pub(super) started_at: Option<Instant>,
    pub(super) panel: ControlPanel,
    /// Set once by whoever becomes responsible for Close (Start's worker,
    /// or End on a session that never started).
    pub(super) launched: bool,
}

impl SessionInner {
    fn member_at(&self, position: Option<usize>) -> Option<&Member> {
        position.and_then(|p| self.ring.get(p))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("channel_id", &self.channel_id)
            .field("ended", &self.end_token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session in the New state.
    #[must_use]
    pub fn new(
        channel_id: ChannelId,
        ring: MemberRing,
        turn_duration: Duration,
        settings: SessionSettings,
        platform: Arc<dyn PlatformGateway>,
        metrics: Arc<SessionMetrics>,
    ) -> Arc<Self> {
        Arc::new(Self {
            channel_id,
            settings,
            platform,
            metrics,
            end_token: CancellationToken::new(),
            wake: Notify::new(),
            inner: Mutex::new(SessionInner {
                ring,
                active: None,
                prev: None,
                turn_duration,
                state: SessionState::New,
                turn_deadline: None,
                idle_deadline: Instant::now() + settings.idle_timeout,
                messages: Vec::new(),
                started_at: None,
                panel: ControlPanel::new(),
                launched: false,
            }),
        })
    }

    #[must_use]
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Whether End has been signalled (explicitly or by the worker).
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.end_token.is_cancelled()
    }

    pub(super) fn end_token(&self) -> &CancellationToken {
        &self.end_token
    }

    /// Fire the end signal. Repeated calls are no-ops.
    pub fn end(&self) {
        if !self.end_token.is_cancelled() {
            debug!(target: "ts.session", channel_id = %self.channel_id, "End signalled");
        }
        self.end_token.cancel();
    }

    /// Claim responsibility for Close on a session that was never started.
    ///
    /// Returns `true` exactly once per session, and only if Start never
    /// launched a worker.
    pub async fn claim_close(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.launched {
            false
        } else {
            inner.launched = true;
            true
        }
    }

    /// Push the inactivity watchdog out by the full idle timeout.
    pub async fn touch(&self) {
        let mut inner = self.inner.lock().await;
        inner.idle_deadline = Instant::now() + self.settings.idle_timeout;
        drop(inner);
        self.wake.notify_one();
    }

    /// New → Active.
    ///
    /// Returns `Ok(true)` when this call started the session; the caller must
    /// then spawn the worker. Starting an already running or paused session
    /// returns `Ok(false)`.
    pub async fn start(&self) -> Result<bool, TsError> {
        let mut inner = self.inner.lock().await;
        self.ensure_not_ended(&inner)?;
        if inner.state != SessionState::New {
            return Ok(false);
        }
        self.start_locked(&mut inner).await;
        Ok(true)
    }

    async fn start_locked(&self, inner: &mut SessionInner) {
        let now = Instant::now();
        inner.state = SessionState::Active;
        inner.started_at = Some(now);
        inner.launched = true;

        info!(
            target: "ts.session",
            channel_id = %self.channel_id,
            members = inner.ring.len(),
            turn_secs = inner.turn_duration.as_secs(),
            "Session started"
        );

        let head = inner.ring.head();
        self.hand_over(inner, head, PassTrigger::Start).await;
        self.refresh_locked(inner).await;
    }

    /// Active → Paused. Returns whether the state changed.
    pub async fn pause(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if self.end_token.is_cancelled() || inner.state != SessionState::Active {
            return false;
        }
        self.pause_locked(&mut inner).await;
        true
    }

    async fn pause_locked(&self, inner: &mut SessionInner) {
        inner.state = SessionState::Paused;
        inner.turn_deadline = None;
        debug!(target: "ts.session", channel_id = %self.channel_id, "Session paused");
        self.refresh_locked(inner).await;
        self.wake.notify_one();
    }

    /// Paused → Active with a fresh full turn. Returns whether the state changed.
    pub async fn resume(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if self.end_token.is_cancelled() || inner.state != SessionState::Paused {
            return false;
        }
        self.resume_locked(&mut inner).await;
        true
    }

    async fn resume_locked(&self, inner: &mut SessionInner) {
        inner.state = SessionState::Active;
        inner.turn_deadline = Some(Instant::now() + inner.turn_duration);
        debug!(target: "ts.session", channel_id = %self.channel_id, "Session resumed");
        self.refresh_locked(inner).await;
        self.wake.notify_one();
    }

    /// Play/pause button: New → start, Active → pause, Paused → resume.
    ///
    /// Returns `Ok(true)` when the toggle started the session.
    pub async fn toggle(&self) -> Result<bool, TsError> {
        let mut inner = self.inner.lock().await;
        self.ensure_not_ended(&inner)?;
        match inner.state {
            SessionState::New => {
                self.start_locked(&mut inner).await;
                Ok(true)
            }
            SessionState::Active => {
                self.pause_locked(&mut inner).await;
                Ok(false)
            }
            SessionState::Paused => {
                self.resume_locked(&mut inner).await;
                Ok(false)
            }
            SessionState::Ended => Err(TsError::SessionInactive),
        }
    }

    /// Pass the stick to `target`, or to the next member when `None`.
    ///
    /// Returns `Ok(false)` when the ring yields no further holder; the caller
    /// must treat that as the end of the session.
    pub async fn pass(&self, target: Option<&UserId>) -> Result<bool, TsError> {
        let mut inner = self.inner.lock().await;
        if self.end_token.is_cancelled() || inner.state != SessionState::Active {
            return Err(TsError::SessionInactive);
        }

        let (position, trigger) = match target {
            Some(user_id) => (
                inner
                    .ring
                    .find(user_id)
                    .ok_or(TsError::MemberNotInSession)?,
                PassTrigger::Target,
            ),
            None => match inner.active.and_then(|p| inner.ring.next(p)) {
                Some(next) => (next, PassTrigger::Skip),
                None => return Ok(false),
            },
        };

        let passed = self.hand_over(&mut inner, position, trigger).await;
        if passed {
            self.refresh_locked(&mut inner).await;
        }
        Ok(passed)
    }

    /// Pass to the next member in the ring.
    pub async fn skip(&self) -> Result<bool, TsError> {
        self.pass(None).await
    }

    /// Turn-timer expiry. Returns `false` when the worker should exit.
    pub(super) async fn advance_on_timer(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if self.end_token.is_cancelled() || inner.state != SessionState::Active {
            return true;
        }
        // Pause/resume or a manual pass may have moved the deadline since the
        // worker armed its timer.
        match inner.turn_deadline {
            Some(deadline) if deadline <= Instant::now() => {}
            _ => return true,
        }

        let Some(next) = inner.active.and_then(|p| inner.ring.next(p)) else {
            return false;
        };
        let passed = self.hand_over(&mut inner, next, PassTrigger::Timer).await;
        if passed {
            self.refresh_locked(&mut inner).await;
        }
        passed
    }

    /// Change the turn duration; the running turn keeps its deadline.
    pub async fn set_turn_duration(&self, duration: Duration) -> Result<(), TsError> {
        let duration = validate_turn_duration(duration)?;
        let mut inner = self.inner.lock().await;
        self.ensure_not_ended(&inner)?;
        inner.turn_duration = duration;
        debug!(
            target: "ts.session",
            channel_id = %self.channel_id,
            turn_secs = duration.as_secs(),
            "Turn duration changed"
        );
        self.refresh_locked(&mut inner).await;
        Ok(())
    }

    /// Show the settings view on the control panel.
    pub async fn open_settings(&self) -> Result<(), TsError> {
        let mut inner = self.inner.lock().await;
        self.ensure_not_ended(&inner)?;
        inner.panel.open_settings();
        self.refresh_locked(&mut inner).await;
        Ok(())
    }

    /// Leave the settings view.
    pub async fn display_back(&self) -> Result<(), TsError> {
        let mut inner = self.inner.lock().await;
        self.ensure_not_ended(&inner)?;
        inner.panel.back();
        self.refresh_locked(&mut inner).await;
        Ok(())
    }

    /// Show the panel for the current state (used right after creation).
    pub async fn refresh_display(&self) {
        let mut inner = self.inner.lock().await;
        self.refresh_locked(&mut inner).await;
    }

    /// Point-in-time view of the session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        self.snapshot_locked(&inner)
    }

    pub(super) fn snapshot_locked(&self, inner: &SessionInner) -> SessionSnapshot {
        let next = inner.active.and_then(|p| inner.ring.next(p));
        SessionSnapshot {
            channel_id: self.channel_id.clone(),
            state: inner.state,
            holder: inner.member_at(inner.active).cloned(),
            previous: inner.member_at(inner.prev).cloned(),
            next: inner.member_at(next).cloned(),
            members: inner.ring.members().to_vec(),
            turn_duration: inner.turn_duration,
            elapsed: inner.started_at.map(|started| started.elapsed()),
            logged_messages: inner.messages.len(),
            display: inner.panel.display(),
        }
    }

    fn ensure_not_ended(&self, inner: &SessionInner) -> Result<(), TsError> {
        if self.end_token.is_cancelled() || inner.state == SessionState::Ended {
            Err(TsError::SessionInactive)
        } else {
            Ok(())
        }
    }

    /// Move the stick to `position`: revoke the previous holder, grant the
    /// new one, announce it and restart the turn timer.
    ///
    /// Platform failures are logged and the transfer still completes.
    async fn hand_over(&self, inner: &mut SessionInner, position: usize, trigger: PassTrigger) -> bool {
        let Some(holder) = inner.ring.get(position).cloned() else {
            return false;
        };

        inner.prev = inner.active;
        inner.active = Some(position);

        if let Some(previous) = inner.member_at(inner.prev).cloned() {
            if previous.id != holder.id {
                self.set_priority(&previous.id, false).await;
            }
        }
        self.set_priority(&holder.id, true).await;

        let text = format!("{PASS_ANNOUNCEMENT_PREFIX} {}", holder.mention());
        self.announce(inner, &text).await;

        inner.turn_deadline = Some(Instant::now() + inner.turn_duration);
        self.wake.notify_one();
        self.metrics.turn_passed(trigger);

        info!(
            target: "ts.session",
            channel_id = %self.channel_id,
            holder = %holder.id,
            trigger = trigger.as_str(),
            "Talking stick passed"
        );
        true
    }

    pub(super) async fn set_priority(&self, user_id: &UserId, grant: bool) {
        if let Err(e) = self
            .platform
            .set_priority_speaker(&self.channel_id, user_id, grant)
            .await
        {
            self.platform_failed(PlatformOperation::SetPrioritySpeaker, &e);
        }
    }

    /// Send a spoken announcement and log it for deletion at Close.
    pub(super) async fn announce(&self, inner: &mut SessionInner, text: &str) {
        match self.platform.send_announcement(&self.channel_id, text, true).await {
            Ok(sent) => inner.messages.push(LoggedMessage {
                id: sent.id,
                sent_at: sent.sent_at,
                is_announcement: true,
            }),
            Err(e) => self.platform_failed(PlatformOperation::SendAnnouncement, &e),
        }
    }

    pub(super) async fn refresh_locked(&self, inner: &mut SessionInner) {
        let kind = inner.panel.follow(inner.state);
        let view = display::render(kind, &self.snapshot_locked(inner));
        if let Err(e) = self.platform.refresh_display(&self.channel_id, &view).await {
            self.platform_failed(PlatformOperation::RefreshDisplay, &e);
        }
    }

    pub(super) async fn delete_logged(&self, message: &LoggedMessage) {
        match self
            .platform
            .delete_message(&self.channel_id, &message.id)
            .await
        {
            Ok(()) => self.metrics.message_deleted(),
            Err(e) => self.platform_failed(PlatformOperation::DeleteMessage, &e),
        }
    }

    pub(super) fn record_closed(&self, reason: CloseReason, took: Duration) {
        self.metrics.session_closed(reason, took);
    }

    fn platform_failed(&self, operation: PlatformOperation, error: &PlatformError) {
        warn!(
            target: "ts.session",
            channel_id = %self.channel_id,
            operation = operation.as_str(),
            error = %error,
            "Platform call failed, continuing"
        );
        self.metrics.platform_error(operation);
    }
}
