//! In-memory registry: process lifetime only, no eviction.

use async_trait::async_trait;
use portal_types::{JobRegistry, RegistryError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Job id -> interface user, behind an async lock so concurrent handlers never race.
#[derive(Clone, Default)]
pub struct InMemoryJobRegistry {
    jobs: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn record(&self, job_id: &str, owner: &str) -> Result<(), RegistryError> {
        let previous = self
            .jobs
            .write()
            .await
            .insert(job_id.to_string(), owner.to_string());
        if let Some(previous) = previous {
            tracing::warn!(job_id, previous = %previous, owner, "job id reused, owner overwritten");
        } else {
            tracing::debug!(job_id, owner, "job registered");
        }
        Ok(())
    }

    async fn owner(&self, job_id: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn remove(&self, job_id: &str) -> Result<Option<String>, RegistryError> {
        let removed = self.jobs.write().await.remove(job_id);
        if removed.is_some() {
            tracing::debug!(job_id, "job unregistered");
        }
        Ok(removed)
    }

    async fn snapshot(&self) -> Result<HashMap<String, String>, RegistryError> {
        Ok(self.jobs.read().await.clone())
    }
}
