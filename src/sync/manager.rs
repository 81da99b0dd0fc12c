// src/sync/manager.rs

//! The status tracker task: debounced actions, status fetches and the poll loop.
//!
//! All tracker work runs inside one task, one step at a time. At most one
//! request is in flight, so the live snapshot is always the result of the most
//! recently completed fetch.

use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::debounce::ActionDebouncers;
use super::messages::{ActionKind, TrackerCommand, TrackerEvent};
use super::source::StatusSource;
use super::status::SetupStatus;
use super::timer::PollTimer;
use crate::config::Config;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    pub poll_interval: Duration,
    pub debounce_window: Duration,
    /// Start polling right away if the first read shows a job already running.
    pub resume_polling_on_start: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            resume_polling_on_start: true,
        }
    }
}

impl From<&Config> for TrackerSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            debounce_window: Duration::from_millis(config.debounce_ms),
            resume_polling_on_start: config.resume_polling_on_start,
        }
    }
}

/// Owning side of a running tracker.
///
/// Dropping the handle (or calling [`TrackerHandle::shutdown`]) raises the
/// stop flag and aborts the task. The tracker checks the flag around every
/// request, so no fetch starts and no result is published afterwards, even if
/// the task is mid-step on another worker thread when the handle goes away.
pub struct TrackerHandle {
    cmd_tx: mpsc::UnboundedSender<TrackerCommand>,
    status_rx: watch::Receiver<SetupStatus>,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TrackerHandle {
    /// Request an action. Returns false if the tracker is no longer running.
    pub fn trigger(&self, action: ActionKind) -> bool {
        self.send(TrackerCommand::Trigger(action))
    }

    /// Re-read the status endpoint now.
    pub fn refresh(&self) -> bool {
        self.send(TrackerCommand::Refresh)
    }

    /// The live snapshot.
    pub fn status(&self) -> SetupStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SetupStatus> {
        self.status_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && !self.task.is_finished()
    }

    /// Tear the tracker down. Polling stops even if a job is still running remotely.
    pub fn shutdown(self) {
        // Drop does the work.
    }

    fn send(&self, cmd: TrackerCommand) -> bool {
        match self.cmd_tx.send(cmd) {
            Ok(()) => true,
            Err(e) => {
                warn!("Tracker: command dropped, tracker is not running: {:?}", e.0);
                false
            }
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

/// Spawn a tracker on the current runtime.
///
/// The tracker reads the status once immediately. Events describing what it
/// does are sent on the returned receiver; ignoring them is fine.
pub fn spawn_tracker(
    source: Arc<dyn StatusSource>,
    settings: TrackerSettings,
) -> (TrackerHandle, mpsc::UnboundedReceiver<TrackerEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(SetupStatus::unknown());
    let stopped = Arc::new(AtomicBool::new(false));

    let tracker = Tracker::new(source, status_tx, event_tx, stopped.clone(), &settings);
    let task = tokio::spawn(run_tracker(
        tracker,
        cmd_rx,
        settings.resume_polling_on_start,
    ));

    let handle = TrackerHandle {
        cmd_tx,
        status_rx,
        stopped,
        task,
    };
    (handle, event_rx)
}

struct Tracker {
    source: Arc<dyn StatusSource>,
    status_tx: watch::Sender<SetupStatus>,
    event_tx: mpsc::UnboundedSender<TrackerEvent>,
    stopped: Arc<AtomicBool>,
    timer: PollTimer,
    debouncers: ActionDebouncers,
}

async fn run_tracker(
    mut tracker: Tracker,
    mut cmd_rx: mpsc::UnboundedReceiver<TrackerCommand>,
    resume_polling_on_start: bool,
) {
    info!("Tracker: started");

    if let Some(status) = tracker.fetch(false).await {
        if resume_polling_on_start && status.is_any_job_in_progress() {
            info!("Tracker: job already running at start, resuming polling");
            tracker.start_polling();
        }
    }

    loop {
        if tracker.is_stopped() {
            break;
        }
        let wake = earliest(tracker.timer.next_tick(), tracker.debouncers.next_deadline());

        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(TrackerCommand::Trigger(action)) => {
                        debug!("Tracker: {} requested", action);
                        tracker.debouncers.trigger(action, Instant::now());
                    }
                    Some(TrackerCommand::Refresh) => {
                        debug!("Tracker: manual refresh requested");
                        tracker.fetch(false).await;
                    }
                    None => {
                        info!("Tracker: view closed, stopping");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep_until(wake.unwrap_or_else(Instant::now)), if wake.is_some() => {
                for action in tracker.debouncers.take_due(Instant::now()) {
                    tracker.perform_action(action).await;
                }
                if tracker.timer.is_due(Instant::now()) {
                    tracker.poll_tick().await;
                }
            }
        }
    }

    tracker.timer.cancel();
    tracker.debouncers.cancel_all();
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl Tracker {
    fn new(
        source: Arc<dyn StatusSource>,
        status_tx: watch::Sender<SetupStatus>,
        event_tx: mpsc::UnboundedSender<TrackerEvent>,
        stopped: Arc<AtomicBool>,
        settings: &TrackerSettings,
    ) -> Self {
        Self {
            source,
            status_tx,
            event_tx,
            stopped,
            timer: PollTimer::new(settings.poll_interval),
            debouncers: ActionDebouncers::new(settings.debounce_window),
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Post the action, read the status once, and poll if anything is running.
    async fn perform_action(&mut self, action: ActionKind) {
        if self.is_stopped() {
            return;
        }
        info!("Tracker: starting {}", action);

        if let Err(e) = self.source.post_action(action).await {
            error!("Tracker: {} request failed: {}", action, e);
            self.send_event(TrackerEvent::ActionFailed {
                action,
                message: e.to_string(),
            });
            return;
        }
        if self.is_stopped() {
            return;
        }
        self.send_event(TrackerEvent::ActionAccepted(action));

        match self.fetch(false).await {
            Some(status) if !status.is_any_job_in_progress() => {
                info!("Tracker: {} finished before the first status read", action);
            }
            // A failed read still polls: the job was accepted and the next
            // successful read will show it.
            _ if !self.is_stopped() => self.start_polling(),
            _ => {}
        }
    }

    async fn poll_tick(&mut self) {
        if self.is_stopped() {
            return;
        }
        debug!("Tracker: poll tick");
        self.fetch(true).await;
        self.timer.tick(Instant::now());
    }

    /// Read the status and publish it. A failure leaves the live snapshot alone.
    async fn fetch(&mut self, during_poll: bool) -> Option<SetupStatus> {
        if self.is_stopped() {
            return None;
        }
        let result = self.source.fetch_status().await;
        if self.is_stopped() {
            debug!("Tracker: stopped during status read, dropping the result");
            return None;
        }
        match result {
            Ok(status) => {
                self.publish(status.clone());
                Some(status)
            }
            Err(e) => {
                if during_poll {
                    debug!("Tracker: poll failed, keeping previous status: {}", e);
                } else {
                    warn!("Tracker: status read failed: {}", e);
                }
                self.send_event(TrackerEvent::FetchFailed {
                    during_poll,
                    message: e.to_string(),
                });
                None
            }
        }
    }

    fn publish(&mut self, status: SetupStatus) {
        debug!(
            "Tracker: status {} jobs={:?}",
            status.phase(),
            status.jobs_in_progress()
        );
        if let Some(msg) = status.short_error_message() {
            warn!("Tracker: last job failed: {}", msg);
        }

        let busy = status.is_any_job_in_progress();
        self.status_tx.send_replace(status.clone());
        self.send_event(TrackerEvent::StatusUpdated(status));

        if !busy && self.timer.is_active() {
            self.stop_polling();
        }
    }

    fn start_polling(&mut self) {
        let was_active = self.timer.is_active();
        self.timer.start(Instant::now());
        if !was_active {
            info!(
                "Tracker: polling every {} ms",
                self.timer.interval().as_millis()
            );
            self.send_event(TrackerEvent::PollingStarted);
        }
    }

    fn stop_polling(&mut self) {
        self.timer.cancel();
        info!("Tracker: no job in progress, polling stopped");
        self.send_event(TrackerEvent::PollingStopped);
    }

    fn send_event(&self, event: TrackerEvent) {
        if let Err(e) = self.event_tx.send(event) {
            debug!("Tracker: no listener for event {:?}", e.0);
        }
    }
}
