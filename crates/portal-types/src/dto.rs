//! Rows and outcomes exchanged between the scheduler client, the portal and the web layer.

use crate::JobState;
use serde::{Deserialize, Serialize};

/// One queued or running job as reported by the query CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub job_id: String,
    pub partition: String,
    pub name: String,
    /// Compact state code (`%t`), kept verbatim for display.
    pub state: String,
    pub time_used: String,
    pub nodes: String,
    /// Node list, or the pending reason for jobs not yet running.
    pub nodelist: String,
}

impl QueueEntry {
    /// Number of comma-separated fields in one `squeue` line.
    pub const FIELD_COUNT: usize = 7;

    /// Classified state.
    pub fn job_state(&self) -> JobState {
        JobState::from(self.state.as_str())
    }
}

/// A queue entry joined with the interface user who submitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRow {
    #[serde(flatten)]
    pub entry: QueueEntry,
    pub interface_user: String,
}

impl JobRow {
    pub fn job_id(&self) -> &str {
        &self.entry.job_id
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub job_id: String,
    /// Combined stdout/stderr of the submission CLI, trimmed.
    pub output: String,
}

fn default_code() -> i32 {
    200
}

/// Body of `GET /api/jobs`: the registered jobs, or `code`/`message` describing why the queue
/// could not be read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsResponse {
    #[serde(default = "default_code")]
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Vec<JobRow>>,
}
