//! Traits for the scheduler CLI, credential validation and the job-ownership registry.

use crate::{QueueEntry, SubmitOutcome};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

/// Batch scheduler abstraction (submit / query / node status / cancel).
#[async_trait]
pub trait BatchScheduler: Send + Sync {
    /// Submit a script file; returns the assigned job id and the CLI output.
    async fn submit(&self, script_path: &Path) -> Result<SubmitOutcome, SchedulerError>;

    /// List queued and running jobs.
    async fn queue(&self) -> Result<Vec<QueueEntry>, SchedulerError>;

    /// Free-form node status text.
    async fn node_status(&self) -> Result<String, SchedulerError>;

    /// Cancel a job by id.
    async fn cancel(&self, job_id: &str) -> Result<(), SchedulerError>;
}

/// Host credential validation.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns `Ok(true)` when the host accepts the pair, `Ok(false)` when it rejects it.
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, AuthError>;
}

/// Job id -> interface user who submitted it through the portal.
///
/// Not synchronized with the scheduler: entries outlive jobs that finish or are
/// cancelled outside the portal.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Record (or overwrite) the owner of a job.
    async fn record(&self, job_id: &str, owner: &str) -> Result<(), RegistryError>;

    /// Owner of a job, `Ok(None)` when the job was not submitted through the portal.
    async fn owner(&self, job_id: &str) -> Result<Option<String>, RegistryError>;

    /// Remove a job; returns the previous owner.
    async fn remove(&self, job_id: &str) -> Result<Option<String>, RegistryError>;

    /// Copy of the whole table.
    async fn snapshot(&self) -> Result<HashMap<String, String>, RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// Non-zero exit; `output` is what the command printed.
    #[error("{command} failed ({status}): {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },
    #[error("unexpected output from {command}: {output:?}")]
    UnexpectedOutput { command: String, output: String },
    #[error("invalid job id: {0:?}")]
    InvalidJobId(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication backend error: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("job registry error: {0}")]
    Other(String),
}
