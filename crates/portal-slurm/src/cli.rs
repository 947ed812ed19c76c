//! `BatchScheduler` over the Slurm command-line tools.

use crate::parser::{parse_job_id, parse_queue, QUEUE_FORMAT};
use async_trait::async_trait;
use portal_types::{BatchScheduler, QueueEntry, SchedulerError, SubmitOutcome};
use std::path::Path;
use std::process::Output;
use tokio::process::Command;

/// Binaries invoked for each scheduler operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlurmCommands {
    pub sbatch: String,
    pub squeue: String,
    pub sinfo: String,
    pub scancel: String,
}

impl Default for SlurmCommands {
    fn default() -> Self {
        Self {
            sbatch: "sbatch".to_string(),
            squeue: "squeue".to_string(),
            sinfo: "sinfo".to_string(),
            scancel: "scancel".to_string(),
        }
    }
}

impl SlurmCommands {
    /// Defaults overridden by `PORTAL_SBATCH`, `PORTAL_SQUEUE`, `PORTAL_SINFO`, `PORTAL_SCANCEL`
    /// as returned by `get`.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |name: &str, default: String| get(name).unwrap_or(default);
        Self {
            sbatch: var("PORTAL_SBATCH", defaults.sbatch),
            squeue: var("PORTAL_SQUEUE", defaults.squeue),
            sinfo: var("PORTAL_SINFO", defaults.sinfo),
            scancel: var("PORTAL_SCANCEL", defaults.scancel),
        }
    }
}

/// Scheduler client that shells out to `sbatch`, `squeue`, `sinfo` and `scancel`.
pub struct SlurmCli {
    commands: SlurmCommands,
}

impl SlurmCli {
    pub fn new(commands: SlurmCommands) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &SlurmCommands {
        &self.commands
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<Output, SchedulerError> {
        tracing::debug!(command = program, ?args, "running scheduler command");
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SchedulerError::Spawn {
                command: program.to_string(),
                source: e,
            })?;
        if !output.status.success() {
            let combined = combined_output(&output);
            tracing::warn!(command = program, status = %output.status, output = %combined, "scheduler command failed");
            return Err(SchedulerError::CommandFailed {
                command: program.to_string(),
                status: output.status.to_string(),
                output: combined,
            });
        }
        Ok(output)
    }
}

/// stdout followed by stderr, trimmed.
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text.trim().to_string()
}

#[async_trait]
impl BatchScheduler for SlurmCli {
    async fn submit(&self, script_path: &Path) -> Result<SubmitOutcome, SchedulerError> {
        let path = script_path.to_string_lossy();
        let output = self.run(&self.commands.sbatch, &[&*path]).await?;
        let text = combined_output(&output);
        let job_id = parse_job_id(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            SchedulerError::UnexpectedOutput {
                command: self.commands.sbatch.clone(),
                output: text.clone(),
            }
        })?;
        tracing::info!(job_id = %job_id, script = %path, "job submitted");
        Ok(SubmitOutcome {
            job_id,
            output: text,
        })
    }

    async fn queue(&self) -> Result<Vec<QueueEntry>, SchedulerError> {
        let output = self
            .run(&self.commands.squeue, &["-h", "-o", QUEUE_FORMAT])
            .await?;
        Ok(parse_queue(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn node_status(&self) -> Result<String, SchedulerError> {
        let output = self.run(&self.commands.sinfo, &[]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn cancel(&self, job_id: &str) -> Result<(), SchedulerError> {
        if job_id.is_empty() || job_id.starts_with('-') || job_id.contains(char::is_whitespace) {
            return Err(SchedulerError::InvalidJobId(job_id.to_string()));
        }
        self.run(&self.commands.scancel, &[job_id]).await?;
        tracing::info!(job_id, "job cancelled");
        Ok(())
    }
}
