// tests/tracker_test.rs

// Drives the tracker against a scripted status source on a paused clock, so
// debounce windows and poll ticks elapse instantly and deterministically.

use async_trait::async_trait;
use reportsync::commands::run_action;
use reportsync::error::{TrackerError, TrackerResult};
use reportsync::sync::source::STATUS_ENDPOINT;
use reportsync::sync::{
    spawn_tracker, ActionKind, JobKind, SetupPhase, SetupStatus, StatusSource, TrackerEvent,
    TrackerSettings,
};
use reportsync::ui::state::ScreenModel;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<SetupStatus, String>>,
    last: Option<SetupStatus>,
    fetches: usize,
    posts: Vec<ActionKind>,
    fail_posts: bool,
}

// Replays queued responses, then repeats the last good one.
struct ScriptedSource {
    script: Mutex<Script>,
}

impl ScriptedSource {
    fn new(responses: Vec<Result<SetupStatus, &str>>) -> Arc<Self> {
        let responses = responses
            .into_iter()
            .map(|r| r.map_err(|e| e.to_string()))
            .collect();
        Arc::new(Self {
            script: Mutex::new(Script {
                responses,
                ..Script::default()
            }),
        })
    }

    fn failing_posts(self: Arc<Self>) -> Arc<Self> {
        self.script.lock().unwrap().fail_posts = true;
        self
    }

    fn fetches(&self) -> usize {
        self.script.lock().unwrap().fetches
    }

    fn posts(&self) -> Vec<ActionKind> {
        self.script.lock().unwrap().posts.clone()
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch_status(&self) -> TrackerResult<SetupStatus> {
        let mut script = self.script.lock().unwrap();
        script.fetches += 1;
        match script.responses.pop_front() {
            Some(Ok(status)) => {
                script.last = Some(status.clone());
                Ok(status)
            }
            Some(Err(message)) => Err(TrackerError::transport(STATUS_ENDPOINT, message)),
            None => Ok(script.last.clone().unwrap_or_default()),
        }
    }

    async fn post_action(&self, action: ActionKind) -> TrackerResult<()> {
        let mut script = self.script.lock().unwrap();
        script.posts.push(action);
        if script.fail_posts {
            return Err(TrackerError::transport(action.endpoint(), "HTTP error: 500"));
        }
        Ok(())
    }
}

fn not_setup() -> SetupStatus {
    SetupStatus::new(SetupPhase::NotSetup, [], None)
}

fn setting_up() -> SetupStatus {
    SetupStatus::new(SetupPhase::SetupInProgress, [JobKind::Setup], None)
}

fn complete() -> SetupStatus {
    SetupStatus::new(SetupPhase::SetupComplete, [], None)
}

async fn next_event(events: &mut UnboundedReceiver<TrackerEvent>) -> TrackerEvent {
    tokio::time::timeout(Duration::from_secs(120), events.recv())
        .await
        .expect("timed out waiting for tracker event")
        .expect("tracker stopped")
}

async fn next_status(events: &mut UnboundedReceiver<TrackerEvent>) -> SetupStatus {
    loop {
        if let TrackerEvent::StatusUpdated(status) = next_event(events).await {
            return status;
        }
    }
}

async fn wait_for(events: &mut UnboundedReceiver<TrackerEvent>, wanted: fn(&TrackerEvent) -> bool) {
    loop {
        if wanted(&next_event(events).await) {
            return;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn mount_reads_status_once_and_stays_idle() {
    let source = ScriptedSource::new(vec![Ok(not_setup())]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    assert!(handle.status().is_unknown());

    let status = next_status(&mut events).await;
    assert!(status.can_start_setup());
    assert!(!status.is_any_job_in_progress());
    assert_eq!(handle.status(), status);
    assert!(!ScreenModel::from_status(&handle.status()).loading);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.fetches(), 1);
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn setup_polls_until_complete_then_stops() {
    let source = ScriptedSource::new(vec![
        Ok(not_setup()),
        Ok(setting_up()),
        Ok(setting_up()),
        Ok(complete()),
    ]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;

    let start = Instant::now();
    assert!(handle.trigger(ActionKind::Setup));

    assert!(matches!(
        next_event(&mut events).await,
        TrackerEvent::ActionAccepted(ActionKind::Setup)
    ));
    assert!(start.elapsed() >= Duration::from_millis(500));

    let after_action = next_status(&mut events).await;
    assert!(after_action.is_setup_in_progress());
    assert!(!after_action.can_start_setup());
    assert!(matches!(next_event(&mut events).await, TrackerEvent::PollingStarted));
    let polling_since = Instant::now();

    // First tick comes one interval after the post-action read, not before.
    let first_tick = next_status(&mut events).await;
    assert!(first_tick.is_setup_in_progress());
    assert!(polling_since.elapsed() >= Duration::from_millis(2000));

    let second_tick = next_status(&mut events).await;
    assert!(second_tick.is_setup_complete());
    assert!(matches!(next_event(&mut events).await, TrackerEvent::PollingStopped));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.fetches(), 4);
    assert_eq!(source.posts(), vec![ActionKind::Setup]);

    let model = ScreenModel::from_status(&handle.status());
    assert!(model.allows(ActionKind::Teardown));
    assert!(model.allows(ActionKind::RefreshQuestions));
    assert!(model.explore.is_enabled());
}

#[tokio::test(start_paused = true)]
async fn rapid_triggers_collapse_into_one_post() {
    let source = ScriptedSource::new(vec![Ok(not_setup()), Ok(complete())]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;

    let start = Instant::now();
    for _ in 0..3 {
        handle.trigger(ActionKind::Setup);
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    wait_for(&mut events, |e| matches!(e, TrackerEvent::ActionAccepted(_))).await;
    // Last trigger at 400 ms plus the 500 ms window.
    assert!(start.elapsed() >= Duration::from_millis(900));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.posts(), vec![ActionKind::Setup]);
    assert_eq!(source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn different_actions_are_not_coalesced() {
    let source = ScriptedSource::new(vec![Ok(complete())]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;

    handle.trigger(ActionKind::RefreshQuestions);
    handle.trigger(ActionKind::Teardown);
    handle.trigger(ActionKind::RefreshQuestions);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let mut posts = source.posts();
    posts.sort();
    assert_eq!(posts, vec![ActionKind::Teardown, ActionKind::RefreshQuestions]);
}

#[tokio::test(start_paused = true)]
async fn polling_continues_while_jobs_run() {
    let source = ScriptedSource::new(vec![Ok(not_setup()), Ok(setting_up())]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;
    handle.trigger(ActionKind::Setup);
    wait_for(&mut events, |e| matches!(e, TrackerEvent::PollingStarted)).await;

    for _ in 0..10 {
        match next_event(&mut events).await {
            TrackerEvent::StatusUpdated(status) => assert!(status.is_any_job_in_progress()),
            other => panic!("unexpected event {:?}", other),
        }
    }
    // mount + post-action read + ten ticks
    assert_eq!(source.fetches(), 12);
    assert!(handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn shutdown_while_polling_stops_all_fetches() {
    let source = ScriptedSource::new(vec![Ok(not_setup()), Ok(setting_up())]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;
    handle.trigger(ActionKind::Setup);
    wait_for(&mut events, |e| matches!(e, TrackerEvent::PollingStarted)).await;
    next_status(&mut events).await;
    let fetched = source.fetches();
    assert_eq!(fetched, 3);

    handle.shutdown();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.fetches(), fetched);

    // The event channel closes once the task is gone.
    while let Some(event) = events.recv().await {
        assert!(!matches!(event, TrackerEvent::StatusUpdated(_)));
    }
}

#[tokio::test(start_paused = true)]
async fn failed_poll_keeps_snapshot_and_keeps_polling() {
    let source = ScriptedSource::new(vec![
        Ok(not_setup()),
        Ok(setting_up()),
        Err("connection reset"),
        Ok(complete()),
    ]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;
    handle.trigger(ActionKind::Setup);
    wait_for(&mut events, |e| matches!(e, TrackerEvent::PollingStarted)).await;

    match next_event(&mut events).await {
        TrackerEvent::FetchFailed { during_poll, message } => {
            assert!(during_poll);
            assert!(message.contains("connection reset"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(handle.status().is_setup_in_progress());

    assert!(next_status(&mut events).await.is_setup_complete());
    assert!(matches!(next_event(&mut events).await, TrackerEvent::PollingStopped));
    assert_eq!(source.fetches(), 4);
}

#[tokio::test(start_paused = true)]
async fn refresh_hides_stale_teardown_error() {
    let stale = Some("org.avni.TeardownException: could not drop schema".to_string());
    let source = ScriptedSource::new(vec![
        Ok(SetupStatus::new(SetupPhase::SetupComplete, [], stale.clone())),
        Ok(SetupStatus::new(
            SetupPhase::RefreshInProgress,
            [JobKind::RefreshQuestions],
            stale,
        )),
        Ok(complete()),
    ]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());

    let mounted = next_status(&mut events).await;
    assert!(ScreenModel::from_status(&mounted).error.is_some());

    handle.trigger(ActionKind::RefreshQuestions);
    let refreshing = next_status(&mut events).await;
    assert!(refreshing.is_create_questions_in_progress());
    assert!(ScreenModel::from_status(&refreshing).error.is_none());

    let done = next_status(&mut events).await;
    assert!(!done.has_error_message());
}

#[tokio::test(start_paused = true)]
async fn job_running_at_mount_resumes_polling() {
    let source = ScriptedSource::new(vec![Ok(setting_up()), Ok(complete())]);
    let (_handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());

    assert!(next_status(&mut events).await.is_setup_in_progress());
    assert!(matches!(next_event(&mut events).await, TrackerEvent::PollingStarted));
    assert!(next_status(&mut events).await.is_setup_complete());
    assert!(matches!(next_event(&mut events).await, TrackerEvent::PollingStopped));
    assert!(source.posts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_action_does_not_poll() {
    let source = ScriptedSource::new(vec![Ok(not_setup())]).failing_posts();
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;

    handle.trigger(ActionKind::Setup);
    match next_event(&mut events).await {
        TrackerEvent::ActionFailed { action, message } => {
            assert_eq!(action, ActionKind::Setup);
            assert!(message.contains("500"));
        }
        other => panic!("unexpected event {:?}", other),
    }

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.fetches(), 1);
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn run_action_follows_job_to_completion() {
    let source = ScriptedSource::new(vec![Ok(not_setup()), Ok(setting_up()), Ok(complete())]);
    let finished = run_action(source.clone(), TrackerSettings::default(), ActionKind::Setup)
        .await
        .expect("setup should finish");
    assert!(finished.is_setup_complete());
    assert_eq!(source.posts(), vec![ActionKind::Setup]);
}

#[tokio::test(start_paused = true)]
async fn run_action_refuses_teardown_before_setup() {
    let source = ScriptedSource::new(vec![Ok(not_setup())]);
    let result = run_action(source.clone(), TrackerSettings::default(), ActionKind::Teardown).await;
    assert!(result.is_err());
    assert!(source.posts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn run_action_reports_job_failure() {
    let failed = SetupStatus::new(
        SetupPhase::NotSetup,
        [],
        Some("org.avni.SetupException: db missing\n\tat org.avni.Setup".into()),
    );
    let source = ScriptedSource::new(vec![Ok(not_setup()), Ok(setting_up()), Ok(failed)]);
    let err = run_action(source.clone(), TrackerSettings::default(), ActionKind::Setup)
        .await
        .unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("setup failed"), "{}", message);
    assert!(message.contains("db missing"), "{}", message);
    assert_eq!(source.posts(), vec![ActionKind::Setup]);
}

#[tokio::test(start_paused = true)]
async fn polling_stops_when_job_list_empties() {
    // Phase still says in progress, but the job list is already empty.
    let lagging = SetupStatus::new(SetupPhase::SetupInProgress, [], None);
    let source = ScriptedSource::new(vec![Ok(not_setup()), Ok(setting_up()), Ok(lagging)]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;
    handle.trigger(ActionKind::Setup);
    wait_for(&mut events, |e| matches!(e, TrackerEvent::PollingStarted)).await;

    let idle = next_status(&mut events).await;
    assert!(!idle.is_any_job_in_progress());
    assert!(matches!(next_event(&mut events).await, TrackerEvent::PollingStopped));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn accepted_action_polls_even_if_next_read_fails() {
    let source = ScriptedSource::new(vec![
        Ok(not_setup()),
        Err("connection reset"),
        Ok(setting_up()),
        Ok(complete()),
    ]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;
    handle.trigger(ActionKind::Setup);

    assert!(matches!(
        next_event(&mut events).await,
        TrackerEvent::ActionAccepted(ActionKind::Setup)
    ));
    match next_event(&mut events).await {
        TrackerEvent::FetchFailed { during_poll, message } => {
            assert!(!during_poll);
            assert!(message.contains("connection reset"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(handle.status().can_start_setup());
    assert!(matches!(next_event(&mut events).await, TrackerEvent::PollingStarted));

    assert!(next_status(&mut events).await.is_setup_in_progress());
    assert!(next_status(&mut events).await.is_setup_complete());
    assert!(matches!(next_event(&mut events).await, TrackerEvent::PollingStopped));
    assert_eq!(source.fetches(), 4);
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_reads_now_and_stops_polling_when_idle() {
    let source = ScriptedSource::new(vec![Ok(not_setup()), Ok(setting_up()), Ok(complete())]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;
    handle.trigger(ActionKind::Setup);
    wait_for(&mut events, |e| matches!(e, TrackerEvent::PollingStarted)).await;
    let polling_since = Instant::now();

    assert!(handle.refresh());
    let refreshed = next_status(&mut events).await;
    assert!(refreshed.is_setup_complete());
    // Read right away, not on the next tick.
    assert!(polling_since.elapsed() < Duration::from_millis(2000));
    assert!(matches!(next_event(&mut events).await, TrackerEvent::PollingStopped));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.fetches(), 3);
    assert_eq!(handle.status(), refreshed);
}

#[tokio::test(start_paused = true)]
async fn repeated_action_while_polling_restarts_the_single_timer() {
    let source = ScriptedSource::new(vec![
        Ok(not_setup()),
        Ok(setting_up()),
        Ok(setting_up()),
        Ok(complete()),
    ]);
    let (handle, mut events) = spawn_tracker(source.clone(), TrackerSettings::default());
    next_status(&mut events).await;
    handle.trigger(ActionKind::Setup);
    wait_for(&mut events, |e| matches!(e, TrackerEvent::PollingStarted)).await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.trigger(ActionKind::RefreshQuestions);
    assert!(matches!(
        next_event(&mut events).await,
        TrackerEvent::ActionAccepted(ActionKind::RefreshQuestions)
    ));
    assert!(next_status(&mut events).await.is_any_job_in_progress());
    let second_read = Instant::now();

    // No second PollingStarted: the running timer was moved, not duplicated.
    match next_event(&mut events).await {
        TrackerEvent::StatusUpdated(status) => assert!(status.is_setup_complete()),
        other => panic!("unexpected event {:?}", other),
    }
    assert!(second_read.elapsed() >= Duration::from_millis(2000));
    assert!(matches!(next_event(&mut events).await, TrackerEvent::PollingStopped));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.fetches(), 4);
    assert_eq!(
        source.posts(),
        vec![ActionKind::Setup, ActionKind::RefreshQuestions]
    );
}
