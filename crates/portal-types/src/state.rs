//! Job state classification for the compact `%t` codes.

use serde::{Deserialize, Serialize};

/// Job state as reported by Slurm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Running,
    Suspended,
    Completing,
    Completed,
    Cancelled,
    Failed,
    Timeout,
    NodeFail,
    Preempted,
    OutOfMemory,
    Unknown(String),
}

impl From<&str> for JobState {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PENDING" | "PD" => JobState::Pending,
            "RUNNING" | "R" => JobState::Running,
            "SUSPENDED" | "S" => JobState::Suspended,
            "COMPLETING" | "CG" => JobState::Completing,
            "COMPLETED" | "CD" => JobState::Completed,
            "CANCELLED" | "CA" => JobState::Cancelled,
            "FAILED" | "F" => JobState::Failed,
            "TIMEOUT" | "TO" => JobState::Timeout,
            "NODE_FAIL" | "NF" => JobState::NodeFail,
            "PREEMPTED" | "PR" => JobState::Preempted,
            "OUT_OF_MEMORY" | "OOM" => JobState::OutOfMemory,
            other => JobState::Unknown(other.to_string()),
        }
    }
}

impl JobState {
    /// Human-readable label for tables.
    pub fn label(&self) -> &str {
        match self {
            JobState::Pending => "Pending",
            JobState::Running => "Running",
            JobState::Suspended => "Suspended",
            JobState::Completing => "Completing",
            JobState::Completed => "Completed",
            JobState::Cancelled => "Cancelled",
            JobState::Failed => "Failed",
            JobState::Timeout => "Timeout",
            JobState::NodeFail => "Node failure",
            JobState::Preempted => "Preempted",
            JobState::OutOfMemory => "Out of memory",
            JobState::Unknown(code) => code.as_str(),
        }
    }
}
