//! In-process counters for the session engine.
//!
//! Shared between the registry, every session, and anyone reporting on them.
//! Each update also forwards to the Prometheus facade in
//! [`crate::observability::metrics`].

use super::types::{CloseReason, PassTrigger};
use crate::observability::metrics as prom;
use crate::platform::PlatformOperation;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Aggregated counters for all sessions in the process.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// Sessions currently registered.
    active_sessions: AtomicUsize,
    /// Sessions ever created.
    sessions_created: AtomicU64,
    /// Sessions whose Close ran to completion.
    sessions_closed: AtomicU64,
    /// Turn transfers, including the first one at Start.
    turns_passed: AtomicU64,
    /// Platform calls that failed and were swallowed.
    platform_errors: AtomicU64,
    /// Messages removed during Close.
    messages_deleted: AtomicU64,
}

/// Snapshot of session metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMetricsSnapshot {
    pub active_sessions: usize,
    pub sessions_created: u64,
    pub sessions_closed: u64,
    pub turns_passed: u64,
    pub platform_errors: u64,
    pub messages_deleted: u64,
}

impl SessionMetrics {
    /// Create a new shared metrics instance.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn session_registered(&self) {
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        let active = self.active_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        prom::record_session_created();
        prom::set_sessions_active(active);
    }

    pub fn session_unregistered(&self) {
        let previous = self
            .active_sessions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or(0);
        prom::set_sessions_active(previous.saturating_sub(1));
    }

    pub fn session_closed(&self, reason: CloseReason, took: Duration) {
        self.sessions_closed.fetch_add(1, Ordering::SeqCst);
        prom::record_session_closed(reason.as_str(), took);
    }

    pub fn turn_passed(&self, trigger: PassTrigger) {
        self.turns_passed.fetch_add(1, Ordering::SeqCst);
        prom::record_turn_passed(trigger.as_str());
    }

    pub fn platform_error(&self, operation: PlatformOperation) {
        self.platform_errors.fetch_add(1, Ordering::SeqCst);
        prom::record_platform_error(operation.as_str());
    }

    pub fn message_deleted(&self) {
        self.messages_deleted.fetch_add(1, Ordering::SeqCst);
        prom::record_message_deleted();
    }

    /// Sessions whose Close has completed.
    #[must_use]
    pub fn sessions_closed(&self) -> u64 {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    /// Take a snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        SessionMetricsSnapshot {
            active_sessions: self.active_sessions.load(Ordering::SeqCst),
            sessions_created: self.sessions_created.load(Ordering::SeqCst),
            sessions_closed: self.sessions_closed.load(Ordering::SeqCst),
            turns_passed: self.turns_passed.load(Ordering::SeqCst),
            platform_errors: self.platform_errors.load(Ordering::SeqCst),
            messages_deleted: self.messages_deleted.load(Ordering::SeqCst),
        }
    }
}
