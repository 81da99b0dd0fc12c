// src/ui/state.rs

//! What the reports screen offers for a given snapshot.
//!
//! This is the only place that decides which actions are reachable. Key
//! handling consults it before sending anything to the tracker.

use crate::sync::messages::ActionKind;
use crate::sync::status::SetupStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Hidden,
    Disabled,
    Enabled,
}

impl ButtonState {
    pub fn is_enabled(&self) -> bool {
        *self == ButtonState::Enabled
    }

    pub fn is_visible(&self) -> bool {
        *self != ButtonState::Hidden
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPanel {
    pub short_message: String,
    pub full_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenModel {
    /// Nothing fetched yet: show a placeholder instead of buttons.
    pub loading: bool,
    pub setup: ButtonState,
    pub delete: ButtonState,
    pub refresh: ButtonState,
    pub explore: ButtonState,
    pub spinner: bool,
    pub error: Option<ErrorPanel>,
}

impl ScreenModel {
    pub fn from_status(status: &SetupStatus) -> Self {
        if status.is_unknown() {
            return Self {
                loading: true,
                setup: ButtonState::Hidden,
                delete: ButtonState::Hidden,
                refresh: ButtonState::Hidden,
                explore: ButtonState::Hidden,
                spinner: false,
                error: None,
            };
        }

        let busy = status.is_any_job_in_progress();
        let complete = status.is_setup_complete();

        let setup = if status.can_start_setup() {
            ButtonState::Enabled
        } else if status.is_setup_in_progress() {
            ButtonState::Disabled
        } else {
            ButtonState::Hidden
        };

        let delete = match (complete, busy) {
            (true, false) => ButtonState::Enabled,
            (true, true) => ButtonState::Disabled,
            _ => ButtonState::Hidden,
        };

        let refresh = if status.is_create_questions_in_progress() || (complete && busy) {
            ButtonState::Disabled
        } else if complete {
            ButtonState::Enabled
        } else {
            ButtonState::Hidden
        };

        let explore = match (complete, busy) {
            (true, false) => ButtonState::Enabled,
            (true, true) => ButtonState::Disabled,
            _ => ButtonState::Hidden,
        };

        let error = status.error_message().map(|full| ErrorPanel {
            short_message: status.short_error_message().unwrap_or_default(),
            full_message: full.to_string(),
        });

        Self {
            loading: false,
            setup,
            delete,
            refresh,
            explore,
            spinner: busy,
            error,
        }
    }

    /// Whether the screen currently lets the user start `action`.
    pub fn allows(&self, action: ActionKind) -> bool {
        match action {
            ActionKind::Setup => self.setup.is_enabled(),
            ActionKind::Teardown => self.delete.is_enabled(),
            ActionKind::RefreshQuestions => self.refresh.is_enabled(),
        }
    }
}
