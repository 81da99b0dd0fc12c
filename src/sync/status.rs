// src/sync/status.rs

//! Snapshot of the remote reporting setup, as returned by the status endpoint.
//!
//! A [`SetupStatus`] is never patched. Every fetch produces a new value and the
//! tracker swaps it in wholesale, so readers always see one consistent read.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::TrackerResult;

/// Lifecycle phase of the reporting integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SetupPhase {
    /// Nothing has been fetched yet. Never produced by the server.
    #[default]
    #[serde(skip_deserializing)]
    Unknown,
    NotSetup,
    SetupInProgress,
    SetupComplete,
    TeardownInProgress,
    CreateQuestionsInProgress,
    RefreshInProgress,
}

impl fmt::Display for SetupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SetupPhase::Unknown => "Unknown",
            SetupPhase::NotSetup => "Not set up",
            SetupPhase::SetupInProgress => "Setting up",
            SetupPhase::SetupComplete => "Set up",
            SetupPhase::TeardownInProgress => "Deleting",
            SetupPhase::CreateQuestionsInProgress => "Creating questions",
            SetupPhase::RefreshInProgress => "Refreshing reports",
        };
        f.write_str(text)
    }
}

/// A remote job that can be running on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum JobKind {
    Setup,
    Teardown,
    CreateQuestions,
    RefreshQuestions,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            JobKind::Setup => "setup",
            JobKind::Teardown => "teardown",
            JobKind::CreateQuestions => "create-questions",
            JobKind::RefreshQuestions => "refresh-questions",
        };
        f.write_str(text)
    }
}

// Wire shape of `GET /web/metabase/status`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
    status: SetupPhase,
    #[serde(default)]
    jobs_in_progress: Option<Vec<JobKind>>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetupStatus {
    phase: SetupPhase,
    jobs_in_progress: BTreeSet<JobKind>,
    error_message: Option<String>,
}

impl SetupStatus {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn new(
        phase: SetupPhase,
        jobs_in_progress: impl IntoIterator<Item = JobKind>,
        error_message: Option<String>,
    ) -> Self {
        Self {
            phase,
            jobs_in_progress: jobs_in_progress.into_iter().collect(),
            error_message,
        }
    }

    /// Parse a status endpoint body.
    pub fn from_json(body: &[u8]) -> TrackerResult<Self> {
        let payload: StatusPayload = serde_json::from_slice(body)?;
        Ok(Self::new(
            payload.status,
            payload.jobs_in_progress.unwrap_or_default(),
            payload.error_message,
        ))
    }

    pub fn phase(&self) -> SetupPhase {
        self.phase
    }

    pub fn jobs_in_progress(&self) -> &BTreeSet<JobKind> {
        &self.jobs_in_progress
    }

    pub fn is_unknown(&self) -> bool {
        self.phase == SetupPhase::Unknown
    }

    /// An empty job list means idle, whatever the phase says.
    pub fn is_any_job_in_progress(&self) -> bool {
        !self.jobs_in_progress.is_empty()
    }

    /// Setup has never completed and nothing is running.
    pub fn can_start_setup(&self) -> bool {
        self.phase == SetupPhase::NotSetup && !self.is_any_job_in_progress()
    }

    /// True once setup has finished, including while a later job runs on top of it.
    pub fn is_setup_complete(&self) -> bool {
        matches!(
            self.phase,
            SetupPhase::SetupComplete
                | SetupPhase::TeardownInProgress
                | SetupPhase::CreateQuestionsInProgress
                | SetupPhase::RefreshInProgress
        )
    }

    pub fn is_setup_in_progress(&self) -> bool {
        self.phase == SetupPhase::SetupInProgress || self.jobs_in_progress.contains(&JobKind::Setup)
    }

    pub fn is_teardown_in_progress(&self) -> bool {
        self.phase == SetupPhase::TeardownInProgress
            || self.jobs_in_progress.contains(&JobKind::Teardown)
    }

    pub fn is_create_questions_in_progress(&self) -> bool {
        matches!(
            self.phase,
            SetupPhase::CreateQuestionsInProgress | SetupPhase::RefreshInProgress
        ) || self.jobs_in_progress.contains(&JobKind::CreateQuestions)
            || self.jobs_in_progress.contains(&JobKind::RefreshQuestions)
    }

    /// A failure from the last finished job that is still current.
    ///
    /// While any job runs the stored message belongs to an earlier attempt and
    /// is treated as stale.
    pub fn has_error_message(&self) -> bool {
        !self.is_any_job_in_progress()
            && self
                .error_message
                .as_deref()
                .is_some_and(|msg| !msg.trim().is_empty())
    }

    /// Full text of the current failure, for copying.
    pub fn error_message(&self) -> Option<&str> {
        if self.has_error_message() {
            self.error_message.as_deref()
        } else {
            None
        }
    }

    /// Whatever the server sent, stale or not. Used for logging only.
    pub fn raw_error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// One-line form of the current failure for display.
    pub fn short_error_message(&self) -> Option<String> {
        self.error_message().map(shorten_error)
    }
}

static EXCEPTION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^org\..*: ").expect("valid exception prefix pattern"));

/// Drop a leading `org.some.Exception: ` prefix and keep the first line.
pub fn shorten_error(message: &str) -> String {
    let rest = EXCEPTION_PREFIX.replace(message, "");
    rest.split(['\n', '\r']).next().unwrap_or("").to_string()
}
