// src/app.rs

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::actions;
use crate::config::Config;
use crate::sync::manager::{spawn_tracker, TrackerHandle, TrackerSettings};
use crate::sync::messages::{ActionKind, TrackerEvent};
use crate::sync::source::StatusSource;
use crate::sync::status::SetupStatus;
use crate::ui::state::ScreenModel;

const ACTIVITY_LINES: usize = 6;
const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

/// What a key press asks the runner to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Trigger(ActionKind),
    RefreshStatus,
    CopyError(String),
    Explore(String),
    Quit,
}

// State of the reports screen
pub struct App {
    pub(crate) status: SetupStatus,
    pub(crate) reporting_url: String,
    pub(crate) status_line: Option<StatusLine>,
    pub(crate) activity: VecDeque<String>,
    pub(crate) spinner_frame: usize,
    pub(crate) should_quit: bool,
}

impl App {
    pub fn new(reporting_url: impl Into<String>) -> Self {
        Self {
            status: SetupStatus::unknown(),
            reporting_url: reporting_url.into(),
            status_line: None,
            activity: VecDeque::new(),
            spinner_frame: 0,
            should_quit: false,
        }
    }

    pub fn status(&self) -> &SetupStatus {
        &self.status
    }

    pub fn model(&self) -> ScreenModel {
        ScreenModel::from_status(&self.status)
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }

    fn set_info(&mut self, text: impl Into<String>) {
        self.status_line = Some(StatusLine {
            text: text.into(),
            is_error: false,
        });
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status_line = Some(StatusLine {
            text: text.into(),
            is_error: true,
        });
    }

    fn log_activity(&mut self, text: String) {
        if self.activity.len() == ACTIVITY_LINES {
            self.activity.pop_front();
        }
        self.activity.push_back(text);
    }

    pub fn handle_event(&mut self, event: TrackerEvent) {
        match event {
            TrackerEvent::StatusUpdated(status) => {
                // A good read clears an earlier read failure.
                if self
                    .status_line
                    .as_ref()
                    .is_some_and(|line| line.is_error && line.text.starts_with("Could not read"))
                {
                    self.status_line = None;
                }
                self.status = status;
            }
            TrackerEvent::FetchFailed {
                during_poll: true,
                message,
            } => {
                // Polling retries on its own; keep it out of the status line.
                self.log_activity(format!("Poll failed: {}", message));
            }
            TrackerEvent::FetchFailed {
                during_poll: false,
                message,
            } => {
                self.set_error(format!("Could not read status: {}", message));
            }
            TrackerEvent::ActionFailed { action, message } => {
                self.set_error(format!("Could not start {}: {}", action, message));
            }
            TrackerEvent::ActionAccepted(action) => {
                self.set_info(format!("Started {}", action));
                self.log_activity(format!("{} accepted", action));
            }
            TrackerEvent::PollingStarted => self.log_activity("Waiting for job to finish".into()),
            TrackerEvent::PollingStopped => self.log_activity("All jobs finished".into()),
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Option<UiAction> {
        let model = self.model();
        let action = match code {
            KeyCode::Char('q') | KeyCode::Esc => Some(UiAction::Quit),
            KeyCode::Char('u') => Some(UiAction::RefreshStatus),
            KeyCode::Char('s') => model
                .allows(ActionKind::Setup)
                .then_some(UiAction::Trigger(ActionKind::Setup)),
            KeyCode::Char('d') => model
                .allows(ActionKind::Teardown)
                .then_some(UiAction::Trigger(ActionKind::Teardown)),
            KeyCode::Char('r') => model
                .allows(ActionKind::RefreshQuestions)
                .then_some(UiAction::Trigger(ActionKind::RefreshQuestions)),
            KeyCode::Char('e') => model
                .explore
                .is_enabled()
                .then(|| UiAction::Explore(self.reporting_url.clone())),
            KeyCode::Char('c') => model.error.map(|panel| UiAction::CopyError(panel.full_message)),
            _ => None,
        };
        if action.is_none() {
            debug!("App: key {:?} not available in current state", code);
        }
        action
    }

    fn apply(&mut self, action: UiAction, tracker: &TrackerHandle) {
        match action {
            UiAction::Trigger(kind) => {
                if tracker.trigger(kind) {
                    self.set_info(format!("Requested {}", kind));
                } else {
                    self.set_error("Tracker stopped; restart the screen");
                }
            }
            UiAction::RefreshStatus => {
                tracker.refresh();
            }
            UiAction::CopyError(text) => match actions::copy_to_clipboard(&text) {
                Ok(()) => self.set_info("Error copied to clipboard"),
                Err(e) => self.set_error(format!("Clipboard unavailable: {}", e)),
            },
            UiAction::Explore(url) => match actions::open_reporting_site(&url) {
                Ok(()) => self.set_info(format!("Opened {}", url)),
                Err(e) => self.set_error(format!("Failed to open {}: {}", url, e)),
            },
            UiAction::Quit => self.should_quit = true,
        }
    }
}

// Forward key presses from a blocking reader thread into the async loop.
fn spawn_key_reader(tx: mpsc::UnboundedSender<KeyCode>) {
    std::thread::spawn(move || loop {
        if tx.is_closed() {
            break;
        }
        match event::poll(Duration::from_millis(200)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.send(key.code).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("App: failed to read terminal event: {}", e);
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                warn!("App: failed to poll terminal events: {}", e);
                break;
            }
        }
    });
}

/// Run the interactive reports screen until the user quits.
///
/// The tracker lives exactly as long as the screen.
pub async fn run_screen(config: &Config, source: Arc<dyn StatusSource>) -> Result<()> {
    let (tracker, events) = spawn_tracker(source, TrackerSettings::from(config));
    let (key_tx, key_rx) = mpsc::unbounded_channel();
    spawn_key_reader(key_tx);

    let mut app = App::new(config.reporting_url.clone());
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut app, &tracker, events, key_rx).await;
    ratatui::restore();

    tracker.shutdown();
    info!("App: screen closed");
    result
}

async fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App,
    tracker: &TrackerHandle,
    mut events: mpsc::UnboundedReceiver<TrackerEvent>,
    mut keys: mpsc::UnboundedReceiver<KeyCode>,
) -> Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_millis(250));

    while !app.should_quit {
        terminal
            .draw(|frame| crate::ui::draw(frame, app))
            .context("Failed to draw screen")?;

        tokio::select! {
            Some(code) = keys.recv() => {
                if let Some(action) = app.handle_key(code) {
                    app.apply(action, tracker);
                }
            }
            Some(event) = events.recv() => app.handle_event(event),
            _ = ticker.tick() => app.advance_spinner(),
        }
    }
    Ok(())
}
