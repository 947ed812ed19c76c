//! JobPortal: submit, list and cancel jobs on behalf of interface users.

use crate::script::{self, ScriptTemplate};
use crate::PortalError;
use portal_types::{BatchScheduler, JobRegistry, JobRow, QueueEntry, SubmitOutcome};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Deployment knobs for the portal.
#[derive(Debug, Clone)]
pub struct PortalSettings {
    /// Interface user allowed to see and cancel every registered job.
    pub admin_user: String,
    /// Directory submitted scripts are written to.
    pub script_dir: PathBuf,
    /// Working directory injected with `#SBATCH --chdir` when the script sets none.
    pub job_chdir: String,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            admin_user: "root".to_string(),
            script_dir: PathBuf::from("/tmp"),
            job_chdir: "/tmp".to_string(),
        }
    }
}

/// A submission as it arrives from the submit or template form.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub script: String,
    pub job_name: String,
    /// Used when `script` is blank (template form without the client-side preview).
    pub template: Option<ScriptTemplate>,
}

/// Composes the scheduler client and the ownership registry.
pub struct JobPortal {
    scheduler: Arc<dyn BatchScheduler>,
    registry: Arc<dyn JobRegistry>,
    settings: PortalSettings,
}

impl JobPortal {
    pub fn new(
        scheduler: Arc<dyn BatchScheduler>,
        registry: Arc<dyn JobRegistry>,
        settings: PortalSettings,
    ) -> Self {
        Self {
            scheduler,
            registry,
            settings,
        }
    }

    pub fn settings(&self) -> &PortalSettings {
        &self.settings
    }

    pub fn is_admin(&self, user: &str) -> bool {
        user == self.settings.admin_user
    }

    /// Final script text: template fallback, line endings, job name, working directory.
    pub fn prepare_script(&self, req: &SubmitRequest) -> Result<String, PortalError> {
        let raw = if !req.script.trim().is_empty() {
            req.script.clone()
        } else {
            match &req.template {
                Some(t) if t.has_commands() => t.render(&self.settings.job_chdir)?,
                _ => return Err(PortalError::NoScript),
            }
        };
        let mut text = script::normalize_line_endings(&raw);
        let job_name = req.job_name.trim();
        if !job_name.is_empty() {
            script::single_line("job name", job_name)?;
            text = script::set_job_name(&text, job_name);
        }
        Ok(script::ensure_chdir(&text, &self.settings.job_chdir))
    }

    async fn write_script(&self, text: &str) -> Result<PathBuf, PortalError> {
        let path = self
            .settings
            .script_dir
            .join(format!("portal-{}.sh", Uuid::new_v4()));
        let io_err = |source| PortalError::Io {
            path: path.clone(),
            source,
        };
        tokio::fs::write(&path, text).await.map_err(io_err)?;
        set_executable(&path).await.map_err(io_err)?;
        Ok(path)
    }

    /// Submit a script for `user` and record them as the job's owner.
    pub async fn submit(&self, user: &str, req: &SubmitRequest) -> Result<SubmitOutcome, PortalError> {
        let text = self.prepare_script(req)?;
        let path = self.write_script(&text).await?;
        tracing::debug!(user, script = %path.display(), "submitting job script");
        let outcome = self.scheduler.submit(&path).await?;
        self.registry.record(&outcome.job_id, user).await?;
        tracing::info!(user, job_id = %outcome.job_id, "job submitted through portal");
        Ok(outcome)
    }

    fn join_owned(queue: Vec<QueueEntry>, owners: &HashMap<String, String>) -> Vec<JobRow> {
        queue
            .into_iter()
            .filter_map(|entry| {
                let owner = owners.get(&entry.job_id)?.clone();
                Some(JobRow {
                    entry,
                    interface_user: owner,
                })
            })
            .collect()
    }

    /// Queued jobs that were submitted through the portal, with their interface user.
    pub async fn registered_jobs(&self) -> Result<Vec<JobRow>, PortalError> {
        let queue = self.scheduler.queue().await?;
        let owners = self.registry.snapshot().await?;
        Ok(Self::join_owned(queue, &owners))
    }

    /// Jobs `user` may cancel. `show_all` lists everyone's jobs and only applies to the admin.
    pub async fn cancellable_jobs(&self, user: &str, show_all: bool) -> Result<Vec<JobRow>, PortalError> {
        let all = show_all && self.is_admin(user);
        let rows = self.registered_jobs().await?;
        Ok(rows
            .into_iter()
            .filter(|r| all || r.interface_user == user)
            .collect())
    }

    /// Cancel a registered job. Non-admins may only cancel their own jobs; the registry entry is
    /// removed only when the scheduler accepts the cancellation.
    pub async fn cancel(&self, user: &str, job_id: &str) -> Result<(), PortalError> {
        let owner = self
            .registry
            .owner(job_id)
            .await?
            .ok_or_else(|| PortalError::NotRegistered(job_id.to_string()))?;
        if !self.is_admin(user) && owner != user {
            tracing::warn!(user, job_id, owner = %owner, "cancel refused, not the owner");
            return Err(PortalError::NotOwner(job_id.to_string()));
        }
        self.scheduler.cancel(job_id).await?;
        self.registry.remove(job_id).await?;
        tracing::info!(user, job_id, "job cancelled through portal");
        Ok(())
    }

    pub async fn node_status(&self) -> Result<String, PortalError> {
        Ok(self.scheduler.node_status().await?)
    }
}

#[cfg(unix)]
async fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn set_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
