// src/sync/messages.rs

//! Defines the message types used for communication between the tracker and the view

use std::fmt;

use super::status::SetupStatus;

/// User-facing actions that start a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Setup,
    Teardown,
    RefreshQuestions,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::Setup,
        ActionKind::Teardown,
        ActionKind::RefreshQuestions,
    ];

    /// Path of the endpoint that starts this action.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ActionKind::Setup => "/web/metabase/setup",
            ActionKind::Teardown => "/web/metabase/teardown",
            ActionKind::RefreshQuestions => "/web/metabase/update-questions",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ActionKind::Setup => "setup",
            ActionKind::Teardown => "teardown",
            ActionKind::RefreshQuestions => "refresh",
        };
        f.write_str(text)
    }
}

/// Commands that can be sent from the view to the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCommand {
    /// Request an action. Repeats within the debounce window collapse into one.
    Trigger(ActionKind),

    /// Re-read the status endpoint now
    Refresh,
}

/// Events that can be sent from the tracker to the view
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// A new snapshot replaced the previous one
    StatusUpdated(SetupStatus),

    /// A status read failed; the previous snapshot is still live
    FetchFailed { during_poll: bool, message: String },

    /// The action endpoint rejected the request or could not be reached
    ActionFailed { action: ActionKind, message: String },

    /// The action endpoint accepted the request
    ActionAccepted(ActionKind),

    /// The poll timer was started
    PollingStarted,

    /// The poll timer was cancelled because nothing is running any more
    PollingStopped,
}
