//! Mock scheduler for tests: in-memory queue, no Slurm installation needed.

use async_trait::async_trait;
use portal_types::{BatchScheduler, QueueEntry, SchedulerError, SubmitOutcome};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MockState {
    next_id: u64,
    queue: Vec<QueueEntry>,
    scripts: Vec<String>,
    cancelled: Vec<String>,
    fail_submit: Option<String>,
    fail_queue: Option<String>,
    fail_nodes: Option<String>,
    fail_cancel: Option<String>,
}

/// Scheduler that keeps submitted jobs in a vector. Submissions get sequential ids from 1000
/// and appear in the queue as pending.
pub struct MockScheduler {
    state: Mutex<MockState>,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a job that was not submitted through the portal.
    pub fn push_entry(&self, entry: QueueEntry) {
        self.lock().queue.push(entry);
    }

    /// Contents of every submitted script, in submission order.
    pub fn submitted_scripts(&self) -> Vec<String> {
        self.lock().scripts.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.lock().cancelled.clone()
    }

    /// Make the next submissions fail with `output` until cleared with `None`.
    pub fn fail_submit(&self, output: Option<&str>) {
        self.lock().fail_submit = output.map(str::to_string);
    }

    pub fn fail_queue(&self, output: Option<&str>) {
        self.lock().fail_queue = output.map(str::to_string);
    }

    pub fn fail_nodes(&self, output: Option<&str>) {
        self.lock().fail_nodes = output.map(str::to_string);
    }

    pub fn fail_cancel(&self, output: Option<&str>) {
        self.lock().fail_cancel = output.map(str::to_string);
    }

    /// Queue entry as the mock reports a fresh submission.
    pub fn pending_entry(job_id: &str, name: &str) -> QueueEntry {
        QueueEntry {
            job_id: job_id.to_string(),
            partition: "batch".to_string(),
            name: name.to_string(),
            state: "PD".to_string(),
            time_used: "0:00".to_string(),
            nodes: "1".to_string(),
            nodelist: "(Priority)".to_string(),
        }
    }
}

impl Default for MockScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(command: &str, output: String) -> SchedulerError {
    SchedulerError::CommandFailed {
        command: command.to_string(),
        status: "exit status: 1".to_string(),
        output,
    }
}

fn job_name(script: &str) -> &str {
    script
        .lines()
        .find_map(|l| l.strip_prefix("#SBATCH --job-name="))
        .unwrap_or("script.sh")
}

#[async_trait]
impl BatchScheduler for MockScheduler {
    async fn submit(&self, script_path: &Path) -> Result<SubmitOutcome, SchedulerError> {
        let script = tokio::fs::read_to_string(script_path)
            .await
            .map_err(|e| SchedulerError::Spawn {
                command: "sbatch".to_string(),
                source: e,
            })?;
        let mut state = self.lock();
        if let Some(output) = state.fail_submit.clone() {
            return Err(failed("sbatch", output));
        }
        let job_id = state.next_id.to_string();
        state.next_id += 1;
        let entry = Self::pending_entry(&job_id, job_name(&script));
        state.queue.push(entry);
        state.scripts.push(script);
        Ok(SubmitOutcome {
            output: format!("Submitted batch job {}", job_id),
            job_id,
        })
    }

    async fn queue(&self) -> Result<Vec<QueueEntry>, SchedulerError> {
        let state = self.lock();
        match &state.fail_queue {
            Some(output) => Err(failed("squeue", output.clone())),
            None => Ok(state.queue.clone()),
        }
    }

    async fn node_status(&self) -> Result<String, SchedulerError> {
        let state = self.lock();
        match &state.fail_nodes {
            Some(output) => Err(failed("sinfo", output.clone())),
            None => Ok("PARTITION AVAIL  TIMELIMIT  NODES  STATE NODELIST\n\
                        batch*       up   infinite      2   idle node[01-02]\n"
                .to_string()),
        }
    }

    async fn cancel(&self, job_id: &str) -> Result<(), SchedulerError> {
        let mut state = self.lock();
        if let Some(output) = state.fail_cancel.clone() {
            return Err(failed("scancel", output));
        }
        state.queue.retain(|e| e.job_id != job_id);
        state.cancelled.push(job_id.to_string());
        Ok(())
    }
}
