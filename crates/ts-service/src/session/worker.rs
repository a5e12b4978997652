//! Background worker and Close for a [`Session`].
//!
//! One worker runs per started session. It waits on the first of:
//! the end signal, the inactivity watchdog, and the turn timer. Whatever
//! makes it exit, the caller runs [`Session::close`] exactly once afterwards.

use super::handle::{Session, CLOSING_ANNOUNCEMENT};
use super::types::{CloseReason, SessionState};
use std::future;
use std::sync::Arc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument};

impl Session {
    /// Drive the turn timer and watchdog until the session should close.
    #[instrument(skip_all, name = "ts.session.worker", fields(channel_id = %self.channel_id()))]
    pub async fn run(self: Arc<Self>) -> CloseReason {
        debug!(target: "ts.session", channel_id = %self.channel_id(), "Session worker started");

        let reason = loop {
            let (turn_deadline, idle_deadline) = {
                let inner = self.inner.lock().await;
                (inner.turn_deadline, inner.idle_deadline)
            };

            let turn_timer = async {
                match turn_deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => future::pending().await,
                }
            };

            tokio::select! {
                biased;

                () = self.end_token().cancelled() => {
                    break CloseReason::Ended;
                }

                () = sleep_until(idle_deadline) => {
                    let expired = self.inner.lock().await.idle_deadline <= Instant::now();
                    if expired {
                        info!(
                            target: "ts.session",
                            channel_id = %self.channel_id(),
                            idle_secs = self.settings().idle_timeout.as_secs(),
                            "Session idle, ending"
                        );
                        break CloseReason::Idle;
                    }
                }

                () = turn_timer => {
                    if !self.advance_on_timer().await {
                        break CloseReason::Exhausted;
                    }
                }

                // A deadline moved; re-arm.
                () = self.wake.notified() => {}
            }
        };

        debug!(
            target: "ts.session",
            channel_id = %self.channel_id(),
            reason = reason.as_str(),
            "Session worker exiting"
        );
        reason
    }

    /// Tear the session down.
    ///
    /// Stops the timers, revokes the current holder, posts the closing
    /// announcement, then deletes every logged message. Spoken announcements
    /// younger than the TTS grace window are waited on first. The session
    /// lock is released before any waiting.
    #[instrument(skip_all, name = "ts.session.close", fields(channel_id = %self.channel_id(), reason = reason.as_str()))]
    pub async fn close(&self, reason: CloseReason) {
        let began = Instant::now();
        self.end();

        let messages = {
            let mut inner = self.inner.lock().await;
            inner.state = SessionState::Ended;
            inner.turn_deadline = None;

            let holder = inner.active.and_then(|p| inner.ring.get(p)).cloned();
            if let Some(holder) = holder {
                self.set_priority(&holder.id, false).await;
            }

            self.announce(&mut inner, CLOSING_ANNOUNCEMENT).await;
            self.refresh_locked(&mut inner).await;

            std::mem::take(&mut inner.messages)
        };

        let grace = self.settings().tts_grace;
        for message in &messages {
            if message.is_announcement {
                sleep_until(message.sent_at + grace).await;
            }
            self.delete_logged(message).await;
        }

        let took = began.elapsed();
        self.record_closed(reason, took);
        info!(
            target: "ts.session",
            channel_id = %self.channel_id(),
            reason = reason.as_str(),
            messages = messages.len(),
            took_ms = took.as_millis() as u64,
            "Session closed"
        );
    }
}
