// src/commands.rs

//! One-shot CLI commands built on the tracker.

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::sync::manager::{spawn_tracker, TrackerSettings};
use crate::sync::messages::{ActionKind, TrackerEvent};
use crate::sync::source::StatusSource;
use crate::sync::status::SetupStatus;
use crate::ui::state::ScreenModel;

/// Human readable summary of a snapshot, one fact per line.
pub fn describe(status: &SetupStatus) -> String {
    let mut out = format!("Status: {}", status.phase());
    if status.is_any_job_in_progress() {
        let jobs: Vec<String> = status.jobs_in_progress().iter().map(|j| j.to_string()).collect();
        out.push_str(&format!("\nJobs: {}", jobs.join(", ")));
    }
    if let Some(msg) = status.short_error_message() {
        out.push_str(&format!("\nLast attempt failed with error: {}", msg));
    }
    out
}

pub async fn print_status(source: &dyn StatusSource) -> Result<()> {
    let status = source.fetch_status().await.context("Failed to read status")?;
    println!("{}", describe(&status));
    Ok(())
}

/// Start `action` and follow the job until nothing is running.
///
/// Refuses actions the current status does not offer, using the same rules as
/// the reports screen. Returns the final snapshot, or an error if the job
/// finished with a failure message.
pub async fn run_action(
    source: Arc<dyn StatusSource>,
    settings: TrackerSettings,
    action: ActionKind,
) -> Result<SetupStatus> {
    let (tracker, mut events) = spawn_tracker(source, settings);

    let initial = first_status(&mut events).await?;
    println!("{}", describe(&initial));
    if !ScreenModel::from_status(&initial).allows(action) {
        bail!(
            "{} is not available while status is '{}'",
            action,
            initial.phase()
        );
    }

    if !tracker.trigger(action) {
        bail!("Tracker stopped before {} could be requested", action);
    }

    let mut accepted = false;
    while let Some(event) = events.recv().await {
        match event {
            TrackerEvent::ActionFailed { message, .. } => {
                return Err(anyhow!("Could not start {}: {}", action, message));
            }
            TrackerEvent::ActionAccepted(_) => {
                accepted = true;
                println!("Started {}", action);
            }
            TrackerEvent::StatusUpdated(status) => {
                println!("{}", describe(&status));
                if accepted && !status.is_any_job_in_progress() {
                    if let Some(msg) = status.short_error_message() {
                        bail!("{} failed: {}", action, msg);
                    }
                    return Ok(status);
                }
            }
            TrackerEvent::FetchFailed { message, .. } => {
                warn!("Status read failed, retrying: {}", message);
            }
            other => debug!("Command: {:?}", other),
        }
    }
    bail!("Tracker stopped unexpectedly")
}

async fn first_status(events: &mut mpsc::UnboundedReceiver<TrackerEvent>) -> Result<SetupStatus> {
    while let Some(event) = events.recv().await {
        match event {
            TrackerEvent::StatusUpdated(status) => return Ok(status),
            TrackerEvent::FetchFailed { message, .. } => {
                bail!("Failed to read status: {}", message)
            }
            other => debug!("Command: {:?}", other),
        }
    }
    bail!("Tracker stopped before the first status read")
}
