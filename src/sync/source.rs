// src/sync/source.rs

use async_trait::async_trait;

use super::messages::ActionKind;
use super::status::SetupStatus;
use crate::error::TrackerResult;

pub const STATUS_ENDPOINT: &str = "/web/metabase/status";

/// Transport to the reporting endpoints.
///
/// The tracker only ever talks to the server through this trait so the polling
/// logic can be driven by a scripted source under a paused clock.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Read and parse the current status. No side effects beyond the read.
    async fn fetch_status(&self) -> TrackerResult<SetupStatus>;

    /// Start the remote job for `action`. Only success or failure is observed.
    async fn post_action(&self, action: ActionKind) -> TrackerResult<()>;
}
