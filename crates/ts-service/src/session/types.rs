//! Value types shared by sessions, the registry and the command layer.

use crate::display::DisplayKind;
use crate::errors::TsError;
use common::types::{ChannelId, Member, MessageId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// Shortest turn a session accepts.
pub const MIN_TURN_DURATION: Duration = Duration::from_secs(1);

/// Longest turn a session accepts (one hour).
pub const MAX_TURN_DURATION: Duration = Duration::from_secs(3600);

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Created, waiting for Start.
    New,
    /// Turn timer running.
    Active,
    /// Turn timer suspended, holder retained.
    Paused,
    /// End signalled; no further transitions.
    Ended,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionState::New => "new",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Ended => "ended",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session's worker exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// End/Quit was requested (command, panel, or registry shutdown).
    Ended,
    /// Inactivity watchdog fired.
    Idle,
    /// The ring yielded no further holder.
    Exhausted,
    /// Ended before it was ever started.
    NeverStarted,
}

impl CloseReason {
    /// Bounded label for metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Ended => "ended",
            CloseReason::Idle => "idle",
            CloseReason::Exhausted => "exhausted",
            CloseReason::NeverStarted => "never_started",
        }
    }
}

/// What caused a turn to change hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    /// First holder at Start.
    Start,
    /// Turn timer expired.
    Timer,
    /// Skip command or panel button.
    Skip,
    /// Explicit pass to a named member.
    Target,
}

impl PassTrigger {
    /// Bounded label for metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PassTrigger::Start => "start",
            PassTrigger::Timer => "timer",
            PassTrigger::Skip => "skip",
            PassTrigger::Target => "target",
        }
    }
}

/// A message posted by the session, kept until Close deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMessage {
    /// Platform id of the message.
    pub id: MessageId,
    /// When the platform accepted the message.
    pub sent_at: Instant,
    /// Spoken (TTS) announcement; subject to the grace window before deletion.
    pub is_announcement: bool,
}

/// Control-panel action ids as sent by buttons and select menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    TogglePlayPause,
    SkipUser,
    QuitSession,
    SetDuration,
    OpenSettings,
    DisplayBack,
}

impl ActionKind {
    /// Component custom id for this action.
    #[must_use]
    pub const fn custom_id(&self) -> &'static str {
        match self {
            ActionKind::TogglePlayPause => "ts_toggle_play_pause",
            ActionKind::SkipUser => "ts_skip_user",
            ActionKind::QuitSession => "ts_quit_session",
            ActionKind::SetDuration => "ts_set_duration",
            ActionKind::OpenSettings => "ts_open_settings",
            ActionKind::DisplayBack => "ts_display_back",
        }
    }
}

impl FromStr for ActionKind {
    type Err = TsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ts_toggle_play_pause" => Ok(ActionKind::TogglePlayPause),
            "ts_skip_user" => Ok(ActionKind::SkipUser),
            "ts_quit_session" => Ok(ActionKind::QuitSession),
            "ts_set_duration" => Ok(ActionKind::SetDuration),
            "ts_open_settings" => Ok(ActionKind::OpenSettings),
            "ts_display_back" => Ok(ActionKind::DisplayBack),
            other => Err(TsError::UnknownAction(other.to_string())),
        }
    }
}

/// A control-panel action together with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// New → start, Active → pause, Paused → resume.
    TogglePlayPause,
    /// Pass to the next member in the ring.
    Skip,
    /// End the session.
    Quit,
    /// Change the turn duration from the next turn on.
    SetDuration(Duration),
    /// Show the settings view.
    OpenSettings,
    /// Return from the settings view.
    DisplayBack,
}

impl Action {
    /// Parse an action from its component custom id and optional value.
    ///
    /// `ts_set_duration` requires a value in whole seconds.
    pub fn parse(custom_id: &str, value: Option<&str>) -> Result<Self, TsError> {
        let action = match custom_id.parse::<ActionKind>()? {
            ActionKind::TogglePlayPause => Action::TogglePlayPause,
            ActionKind::SkipUser => Action::Skip,
            ActionKind::QuitSession => Action::Quit,
            ActionKind::OpenSettings => Action::OpenSettings,
            ActionKind::DisplayBack => Action::DisplayBack,
            ActionKind::SetDuration => {
                let raw = value.ok_or_else(|| {
                    TsError::InvalidDuration("duration is required".to_string())
                })?;
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| TsError::InvalidDuration(format!("'{raw}' is not a number")))?;
                Action::SetDuration(validate_turn_duration(Duration::from_secs(secs))?)
            }
        };
        Ok(action)
    }

    /// Bounded label for logs.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Action::TogglePlayPause => ActionKind::TogglePlayPause,
            Action::Skip => ActionKind::SkipUser,
            Action::Quit => ActionKind::QuitSession,
            Action::SetDuration(_) => ActionKind::SetDuration,
            Action::OpenSettings => ActionKind::OpenSettings,
            Action::DisplayBack => ActionKind::DisplayBack,
        }
    }
}

/// Reject turn durations outside `MIN_TURN_DURATION..=MAX_TURN_DURATION`.
pub fn validate_turn_duration(duration: Duration) -> Result<Duration, TsError> {
    if (MIN_TURN_DURATION..=MAX_TURN_DURATION).contains(&duration) {
        Ok(duration)
    } else {
        Err(TsError::InvalidDuration(format!(
            "{}s is outside {}s..={}s",
            duration.as_secs(),
            MIN_TURN_DURATION.as_secs(),
            MAX_TURN_DURATION.as_secs()
        )))
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub channel_id: ChannelId,
    pub state: SessionState,
    /// Current holder of the stick.
    pub holder: Option<Member>,
    /// Holder being replaced by the most recent pass.
    pub previous: Option<Member>,
    /// Who receives the stick on the next timer or skip.
    pub next: Option<Member>,
    /// Ring order starting from the head.
    pub members: Vec<Member>,
    pub turn_duration: Duration,
    /// Time since Start, if started.
    pub elapsed: Option<Duration>,
    /// Messages awaiting deletion at Close.
    pub logged_messages: usize,
    /// View currently shown on the control panel.
    pub display: DisplayKind,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_round_trips_custom_ids() {
        for kind in [
            ActionKind::TogglePlayPause,
            ActionKind::SkipUser,
            ActionKind::QuitSession,
            ActionKind::SetDuration,
            ActionKind::OpenSettings,
            ActionKind::DisplayBack,
        ] {
            assert_eq!(kind.custom_id().parse::<ActionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = Action::parse("ts_dance", None).unwrap_err();
        assert_eq!(err, TsError::UnknownAction("ts_dance".to_string()));
    }

    #[test]
    fn test_set_duration_parses_seconds() {
        let action = Action::parse("ts_set_duration", Some("120")).unwrap();
        assert_eq!(action, Action::SetDuration(Duration::from_secs(120)));
        assert_eq!(action.kind(), ActionKind::SetDuration);
    }

    #[test]
    fn test_set_duration_requires_valid_value() {
        assert!(matches!(
            Action::parse("ts_set_duration", None),
            Err(TsError::InvalidDuration(_))
        ));
        assert!(matches!(
            Action::parse("ts_set_duration", Some("soon")),
            Err(TsError::InvalidDuration(_))
        ));
        assert!(matches!(
            Action::parse("ts_set_duration", Some("0")),
            Err(TsError::InvalidDuration(_))
        ));
        assert!(matches!(
            Action::parse("ts_set_duration", Some("7200")),
            Err(TsError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_payload_free_actions_ignore_value() {
        assert_eq!(
            Action::parse("ts_skip_user", Some("ignored")).unwrap(),
            Action::Skip
        );
        assert_eq!(Action::parse("ts_quit_session", None).unwrap(), Action::Quit);
    }

    #[test]
    fn test_session_state_serializes_lowercase() {
        let json = serde_json::to_string(&SessionState::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
        assert_eq!(SessionState::Active.to_string(), "active");
    }
}
