//! `SessionRegistry` - process-wide table of live sessions.
//!
//! - At most one live session per channel
//! - The map lock is held only for map operations, never across a platform
//!   call or a wait
//! - Workers and close tasks run on a `TaskTracker` so `shutdown` can wait for
//!   every one of them
//!
//! # Removal
//!
//! End removes the entry immediately, so a new session can be created for the
//! channel while the old one is still draining. Sessions that end on their own
//! (idle, ring exhausted) unregister once Close finishes. Removal is checked
//! against the session's identity, which makes it idempotent.

use super::handle::Session;
use super::metrics::SessionMetrics;
use super::ring::MemberRing;
use super::types::{validate_turn_duration, Action, CloseReason, SessionSnapshot};
use super::SessionSettings;
use crate::errors::TsError;
use crate::platform::{PlatformGateway, PlatformOperation};
use common::types::{ChannelId, GuildId, UserId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

type SessionMap = Mutex<HashMap<ChannelId, Arc<Session>>>;

/// Owner of every live session in the process.
pub struct SessionRegistry {
    platform: Arc<dyn PlatformGateway>,
    settings: SessionSettings,
    metrics: Arc<SessionMetrics>,
    sessions: Arc<SessionMap>,
    tasks: TaskTracker,
    accepting: AtomicBool,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(
        platform: Arc<dyn PlatformGateway>,
        settings: SessionSettings,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self {
            platform,
            settings,
            metrics,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            tasks: TaskTracker::new(),
            accepting: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Create a session for `channel_id` from its current voice members.
    ///
    /// `duration` defaults to the configured turn duration.
    #[instrument(skip_all, fields(guild_id = %guild_id, channel_id = %channel_id))]
    pub async fn create(
        &self,
        guild_id: &GuildId,
        channel_id: &ChannelId,
        duration: Option<Duration>,
    ) -> Result<SessionSnapshot, TsError> {
        self.ensure_accepting()?;
        let turn_duration =
            validate_turn_duration(duration.unwrap_or(self.settings.default_turn_duration))?;

        if self.sessions.lock().await.contains_key(channel_id) {
            return Err(TsError::SessionAlreadyExists);
        }

        let members = self
            .platform
            .fetch_voice_members(guild_id, channel_id)
            .await
            .map_err(|e| {
                warn!(
                    target: "ts.registry",
                    channel_id = %channel_id,
                    error = %e,
                    "Failed to fetch voice members"
                );
                self.metrics.platform_error(PlatformOperation::FetchVoiceMembers);
                TsError::Platform(e.to_string())
            })?;

        let ring = MemberRing::build(members, self.settings.shuffle_members)
            .ok_or(TsError::NoVoiceMembers)?;
        let session = Session::new(
            channel_id.clone(),
            ring,
            turn_duration,
            self.settings,
            Arc::clone(&self.platform),
            Arc::clone(&self.metrics),
        );

        {
            let mut sessions = self.sessions.lock().await;
            // Shutdown may have drained the map while members were fetched.
            self.ensure_accepting()?;
            match sessions.entry(channel_id.clone()) {
                Entry::Occupied(_) => return Err(TsError::SessionAlreadyExists),
                Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(&session));
                }
            }
        }
        self.metrics.session_registered();

        info!(
            target: "ts.registry",
            channel_id = %channel_id,
            turn_secs = turn_duration.as_secs(),
            "Session created"
        );

        session.refresh_display().await;
        Ok(session.snapshot().await)
    }

    /// Start the session; a second Start is a no-op.
    #[instrument(skip_all, fields(channel_id = %channel_id))]
    pub async fn start(&self, channel_id: &ChannelId) -> Result<(), TsError> {
        let session = self.acquire(channel_id).await?;
        // Held from before the launch claim until the worker exists, so
        // shutdown cannot finish waiting in between.
        let token = self.tasks.token();
        if session.start().await? {
            self.launch(session, token);
        }
        Ok(())
    }

    /// Pass the stick to `user_id`.
    #[instrument(skip_all, fields(channel_id = %channel_id, user_id = %user_id))]
    pub async fn pass(&self, channel_id: &ChannelId, user_id: &UserId) -> Result<(), TsError> {
        let session = self.acquire(channel_id).await?;
        let passed = session.pass(Some(user_id)).await?;
        self.end_if_exhausted(&session, passed);
        Ok(())
    }

    /// Pass the stick to the next member.
    #[instrument(skip_all, fields(channel_id = %channel_id))]
    pub async fn skip(&self, channel_id: &ChannelId) -> Result<(), TsError> {
        let session = self.acquire(channel_id).await?;
        self.skip_session(&session).await
    }

    async fn skip_session(&self, session: &Session) -> Result<(), TsError> {
        let passed = session.skip().await?;
        self.end_if_exhausted(session, passed);
        Ok(())
    }

    /// End the session and release the channel.
    ///
    /// Close runs in the background; the channel is free as soon as this
    /// returns.
    #[instrument(skip_all, fields(channel_id = %channel_id))]
    pub async fn end(&self, channel_id: &ChannelId) -> Result<(), TsError> {
        let session = self
            .sessions
            .lock()
            .await
            .remove(channel_id)
            .ok_or(TsError::SessionNotFound)?;
        self.metrics.session_unregistered();

        info!(target: "ts.registry", channel_id = %channel_id, "Session ended");
        self.finish(session).await;
        Ok(())
    }

    /// Apply a control-panel action. Every action resets the watchdog.
    #[instrument(skip_all, fields(channel_id = %channel_id, action = action.kind().custom_id()))]
    pub async fn handle(&self, channel_id: &ChannelId, action: Action) -> Result<(), TsError> {
        let session = self.acquire(channel_id).await?;
        debug!(target: "ts.registry", channel_id = %channel_id, action = ?action, "Handling action");

        match action {
            Action::TogglePlayPause => {
                let token = self.tasks.token();
                if session.toggle().await? {
                    self.launch(session, token);
                }
                Ok(())
            }
            Action::Skip => self.skip_session(&session).await,
            Action::Quit => self.end(channel_id).await,
            Action::SetDuration(duration) => session.set_turn_duration(duration).await,
            Action::OpenSettings => session.open_settings().await,
            Action::DisplayBack => session.display_back().await,
        }
    }

    /// Current view of a session.
    pub async fn snapshot(&self, channel_id: &ChannelId) -> Result<SessionSnapshot, TsError> {
        let session = self.get(channel_id).await?;
        Ok(session.snapshot().await)
    }

    /// End every live session and wait until all of them have closed.
    ///
    /// Create is rejected with `Draining` from here on.
    pub async fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);

        let drained: Vec<Arc<Session>> = self
            .sessions
            .lock()
            .await
            .drain()
            .map(|(_, session)| session)
            .collect();

        info!(
            target: "ts.registry",
            sessions = drained.len(),
            "Shutting down session registry"
        );

        for session in drained {
            self.metrics.session_unregistered();
            self.finish(session).await;
        }

        self.tasks.close();
        self.tasks.wait().await;

        info!(target: "ts.registry", "Session registry shut down");
    }

    /// Signal End, and run Close directly if no worker ever will.
    async fn finish(&self, session: Arc<Session>) {
        session.end();
        if session.claim_close().await {
            self.tasks.spawn(async move {
                session.close(CloseReason::NeverStarted).await;
            });
        }
    }

    fn end_if_exhausted(&self, session: &Session, passed: bool) {
        if !passed {
            info!(
                target: "ts.registry",
                channel_id = %session.channel_id(),
                "No further holder, ending session"
            );
            session.end();
        }
    }

    /// Spawn the worker for a freshly started session. The worker closes the
    /// session and unregisters it when it exits.
    ///
    /// `token` must have been taken before the session was started.
    fn launch(&self, session: Arc<Session>, token: TaskTrackerToken) {
        let sessions = Arc::clone(&self.sessions);
        let metrics = Arc::clone(&self.metrics);
        self.tasks.spawn(async move {
            let _token = token;
            let reason = Arc::clone(&session).run().await;
            session.close(reason).await;
            unregister(&sessions, &session, &metrics).await;
        });
    }

    /// Look up a session for an external action and reset its watchdog.
    async fn acquire(&self, channel_id: &ChannelId) -> Result<Arc<Session>, TsError> {
        let session = self.get(channel_id).await?;
        session.touch().await;
        Ok(session)
    }

    async fn get(&self, channel_id: &ChannelId) -> Result<Arc<Session>, TsError> {
        self.sessions
            .lock()
            .await
            .get(channel_id)
            .cloned()
            .ok_or(TsError::SessionNotFound)
    }

    fn ensure_accepting(&self) -> Result<(), TsError> {
        if self.accepting.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TsError::Draining)
        }
    }
}

/// Remove `session` from the map if it is still the registered one.
async fn unregister(sessions: &SessionMap, session: &Arc<Session>, metrics: &SessionMetrics) {
    let mut map = sessions.lock().await;
    let registered = map
        .get(session.channel_id())
        .is_some_and(|current| Arc::ptr_eq(current, session));
    if registered {
        map.remove(session.channel_id());
        drop(map);
        metrics.session_unregistered();
        debug!(
            target: "ts.registry",
            channel_id = %session.channel_id(),
            "Session unregistered"
        );
    }
}
