use portal_types::{RegistryError, SchedulerError};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("No job script was provided.")]
    NoScript,
    #[error("{0} must be a single line")]
    InvalidField(&'static str),
    #[error("Job was not submitted through the interface or was already removed.")]
    NotRegistered(String),
    #[error("You are not allowed to cancel this job (it is not yours).")]
    NotOwner(String),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to write job script {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PortalError {
    /// Text for the user: scheduler failures show what the command printed.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Scheduler(SchedulerError::CommandFailed { output, status, .. }) => {
                if output.is_empty() {
                    status.clone()
                } else {
                    output.clone()
                }
            }
            other => other.to_string(),
        }
    }
}
