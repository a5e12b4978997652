//! Control-panel projection.
//!
//! The panel is a view over a session, not part of its turn state machine.
//! [`ControlPanel`] only remembers which view is showing; the session state
//! drives it, except that Settings/Back navigation is layered on top.
//! [`render`] turns a [`SessionSnapshot`] into a platform-neutral
//! [`PanelView`].

use crate::session::{ActionKind, SessionSnapshot, SessionState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const COLOR_GREEN: u32 = 0x00FF00;
const COLOR_BLUE: u32 = 0x0000FF;
const COLOR_YELLOW: u32 = 0xFFFF00;

/// Turn durations offered by the settings view, in seconds.
pub const DURATION_CHOICES: [u64; 5] = [15, 30, 60, 120, 300];

/// Which view the control panel is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    New,
    Active,
    Paused,
    Settings,
    Ended,
}

impl DisplayKind {
    /// View that mirrors a session state.
    #[must_use]
    pub const fn for_state(state: SessionState) -> Self {
        match state {
            SessionState::New => DisplayKind::New,
            SessionState::Active => DisplayKind::Active,
            SessionState::Paused => DisplayKind::Paused,
            SessionState::Ended => DisplayKind::Ended,
        }
    }
}

/// Navigation state of a session's control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPanel {
    display: DisplayKind,
    /// View to return to when leaving Settings.
    previous: DisplayKind,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPanel {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            display: DisplayKind::New,
            previous: DisplayKind::New,
        }
    }

    /// View currently shown.
    #[must_use]
    pub const fn display(&self) -> DisplayKind {
        self.display
    }

    /// Track a session state change.
    ///
    /// While Settings is open the new state becomes the Back target instead
    /// of replacing the view. Ended always wins.
    pub fn follow(&mut self, state: SessionState) -> DisplayKind {
        let kind = DisplayKind::for_state(state);
        if self.display == DisplayKind::Settings && kind != DisplayKind::Ended {
            self.previous = kind;
        } else {
            self.display = kind;
        }
        self.display
    }

    /// Show the settings view. No-op once Ended.
    pub fn open_settings(&mut self) -> DisplayKind {
        if !matches!(self.display, DisplayKind::Settings | DisplayKind::Ended) {
            self.previous = self.display;
            self.display = DisplayKind::Settings;
        }
        self.display
    }

    /// Leave the settings view.
    pub fn back(&mut self) -> DisplayKind {
        if self.display == DisplayKind::Settings {
            self.display = self.previous;
        }
        self.display
    }
}

/// Discord button styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

impl ButtonStyle {
    /// Numeric style code used by the Discord component API.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            ButtonStyle::Primary => 1,
            ButtonStyle::Secondary => 2,
            ButtonStyle::Success => 3,
            ButtonStyle::Danger => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelButton {
    pub custom_id: &'static str,
    pub label: &'static str,
    pub emoji: &'static str,
    pub style: ButtonStyle,
}

impl PanelButton {
    const fn new(
        action: ActionKind,
        label: &'static str,
        emoji: &'static str,
        style: ButtonStyle,
    ) -> Self {
        Self {
            custom_id: action.custom_id(),
            label,
            emoji,
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Single-choice menu offered by the settings view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelSelect {
    pub custom_id: &'static str,
    pub placeholder: &'static str,
    /// `(label, value)` pairs.
    pub options: Vec<(String, String)>,
}

/// Platform-neutral rendering of the control panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub kind: DisplayKind,
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<PanelField>,
    pub footer: Option<String>,
    pub select: Option<PanelSelect>,
    pub buttons: Vec<PanelButton>,
}

impl PanelView {
    /// The Ended view carries no interactive components.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.kind == DisplayKind::Ended
    }
}

fn quit_button() -> PanelButton {
    PanelButton::new(ActionKind::QuitSession, "Quit", "❌", ButtonStyle::Danger)
}

fn settings_button() -> PanelButton {
    PanelButton::new(ActionKind::OpenSettings, "Settings", "⚙️", ButtonStyle::Secondary)
}

fn field(name: &str, value: String) -> PanelField {
    PanelField {
        name: name.to_string(),
        value,
        inline: false,
    }
}

/// Human-readable duration, e.g. `2m 5s`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, s) => format!("{h}h {m}m {s}s"),
    }
}

fn duration_label(secs: u64) -> String {
    match secs {
        s if s < 60 => format!("{s} seconds"),
        60 => "1 minute".to_string(),
        s => format!("{} minutes", s / 60),
    }
}

/// Render the `kind` view of a session.
#[must_use]
pub fn render(kind: DisplayKind, snapshot: &SessionSnapshot) -> PanelView {
    let mut view = PanelView {
        kind,
        title: "Talking Stick Session".to_string(),
        description: None,
        color: COLOR_YELLOW,
        fields: Vec::new(),
        footer: None,
        select: None,
        buttons: Vec::new(),
    };

    match kind {
        DisplayKind::New => {
            view.description = Some("The talking stick session is ready to begin".to_string());
            view.footer = Some("Click the Start button to begin the session".to_string());
            view.buttons = vec![
                quit_button(),
                PanelButton::new(
                    ActionKind::TogglePlayPause,
                    "Start",
                    "▶️",
                    ButtonStyle::Success,
                ),
                settings_button(),
            ];
        }
        DisplayKind::Active => {
            view.color = COLOR_GREEN;
            if let Some(holder) = &snapshot.holder {
                view.description = Some(format!("Current speaker: {}", holder.mention()));
            }
            if let Some(next) = &snapshot.next {
                view.fields.push(field("Next", format!("🔜 {}", next.mention())));
            }
            view.footer = Some("Use the buttons below to control the session".to_string());
            view.buttons = vec![
                quit_button(),
                PanelButton::new(
                    ActionKind::TogglePlayPause,
                    "Pause",
                    "⏸️",
                    ButtonStyle::Primary,
                ),
                PanelButton::new(ActionKind::SkipUser, "Next", "⏭️", ButtonStyle::Secondary),
            ];
        }
        DisplayKind::Paused => {
            view.description = Some("The talking stick session has been paused".to_string());
            view.buttons = vec![
                quit_button(),
                PanelButton::new(
                    ActionKind::TogglePlayPause,
                    "Resume",
                    "▶️",
                    ButtonStyle::Primary,
                ),
                settings_button(),
            ];
        }
        DisplayKind::Settings => {
            view.title = "Talking Stick Settings".to_string();
            view.fields.push(PanelField {
                name: "Turn Duration".to_string(),
                value: format_duration(snapshot.turn_duration),
                inline: true,
            });
            view.select = Some(PanelSelect {
                custom_id: ActionKind::SetDuration.custom_id(),
                placeholder: "Set turn duration...",
                options: DURATION_CHOICES
                    .iter()
                    .map(|secs| (duration_label(*secs), secs.to_string()))
                    .collect(),
            });
            view.buttons = vec![
                quit_button(),
                PanelButton::new(ActionKind::DisplayBack, "Back", "🔙", ButtonStyle::Secondary),
            ];
        }
        DisplayKind::Ended => {
            view.title = "Talking Stick Session Ended".to_string();
            view.description = Some("The talking stick session is over".to_string());
            view.color = COLOR_BLUE;
            let elapsed = snapshot.elapsed.unwrap_or_default();
            view.fields.push(field(
                "Session Duration",
                format!("⏱️ {}", format_duration(elapsed)),
            ));
            view.footer = Some("Thank you for participating!".to_string());
        }
    }

    view
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::{ChannelId, Member};

    fn snapshot(state: SessionState) -> SessionSnapshot {
        let a = Member::new("1", "alice");
        let b = Member::new("2", "bob");
        SessionSnapshot {
            channel_id: ChannelId::from("900"),
            state,
            holder: Some(a.clone()),
            previous: None,
            next: Some(b.clone()),
            members: vec![a, b],
            turn_duration: Duration::from_secs(30),
            elapsed: Some(Duration::from_secs(125)),
            logged_messages: 1,
            display: DisplayKind::for_state(state),
        }
    }

    fn custom_ids(view: &PanelView) -> Vec<&'static str> {
        view.buttons.iter().map(|b| b.custom_id).collect()
    }

    #[test]
    fn test_panel_follows_state() {
        let mut panel = ControlPanel::new();
        assert_eq!(panel.display(), DisplayKind::New);
        assert_eq!(panel.follow(SessionState::Active), DisplayKind::Active);
        assert_eq!(panel.follow(SessionState::Paused), DisplayKind::Paused);
    }

    #[test]
    fn test_settings_and_back() {
        let mut panel = ControlPanel::new();
        panel.follow(SessionState::Paused);

        assert_eq!(panel.open_settings(), DisplayKind::Settings);
        // Opening twice keeps the original Back target.
        assert_eq!(panel.open_settings(), DisplayKind::Settings);
        assert_eq!(panel.back(), DisplayKind::Paused);
        // Back outside Settings does nothing.
        assert_eq!(panel.back(), DisplayKind::Paused);
    }

    #[test]
    fn test_state_change_while_in_settings_updates_back_target() {
        let mut panel = ControlPanel::new();
        panel.open_settings();

        assert_eq!(panel.follow(SessionState::Active), DisplayKind::Settings);
        assert_eq!(panel.back(), DisplayKind::Active);
    }

    #[test]
    fn test_ended_overrides_settings() {
        let mut panel = ControlPanel::new();
        panel.open_settings();

        assert_eq!(panel.follow(SessionState::Ended), DisplayKind::Ended);
        assert_eq!(panel.open_settings(), DisplayKind::Ended);
    }

    #[test]
    fn test_render_active_shows_holder_and_next() {
        let view = render(DisplayKind::Active, &snapshot(SessionState::Active));

        assert_eq!(view.color, COLOR_GREEN);
        assert_eq!(view.description.as_deref(), Some("Current speaker: <@1>"));
        assert_eq!(view.fields[0].value, "🔜 <@2>");
        assert_eq!(
            custom_ids(&view),
            vec!["ts_quit_session", "ts_toggle_play_pause", "ts_skip_user"]
        );
    }

    #[test]
    fn test_render_new_and_paused_offer_settings() {
        let new = render(DisplayKind::New, &snapshot(SessionState::New));
        assert_eq!(new.buttons[1].label, "Start");
        assert!(custom_ids(&new).contains(&"ts_open_settings"));

        let paused = render(DisplayKind::Paused, &snapshot(SessionState::Paused));
        assert_eq!(paused.buttons[1].label, "Resume");
        assert!(custom_ids(&paused).contains(&"ts_open_settings"));
    }

    #[test]
    fn test_render_settings_shows_duration_choices() {
        let view = render(DisplayKind::Settings, &snapshot(SessionState::Paused));

        assert_eq!(view.fields[0].value, "30s");
        let select = view.select.as_ref().expect("settings view has a duration menu");
        assert_eq!(select.custom_id, "ts_set_duration");
        let values: Vec<_> = select.options.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(values, vec!["15", "30", "60", "120", "300"]);
        assert_eq!(select.options[2].0, "1 minute");
        assert_eq!(custom_ids(&view), vec!["ts_quit_session", "ts_display_back"]);
    }

    #[test]
    fn test_render_ended_has_no_buttons() {
        let view = render(DisplayKind::Ended, &snapshot(SessionState::Ended));

        assert!(view.is_final());
        assert!(view.buttons.is_empty());
        assert_eq!(view.color, COLOR_BLUE);
        assert_eq!(view.fields[0].value, "⏱️ 2m 5s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
