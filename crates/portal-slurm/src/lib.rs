//! Slurm command-line client for the web portal.

mod cli;
#[cfg(feature = "test-util")]
pub mod mock;
mod parser;

pub use cli::{SlurmCli, SlurmCommands};
pub use parser::{parse_job_id, parse_queue, QUEUE_FORMAT};
pub use portal_types::{BatchScheduler, QueueEntry, SchedulerError, SubmitOutcome};

#[cfg(feature = "test-util")]
pub use mock::MockScheduler;
