//! In-memory job registry with TTL-based cleanup
//!
//! Jobs live only for the server's lifetime. Readers get snapshots; writers
//! go through `update` so every mutation happens under one lock acquisition.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::Job;
use railbird_common::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id, job);
    }

    /// Snapshot of one job's current state
    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Mutate one job under the write lock, returning a snapshot of the
    /// updated state.
    pub async fn update<F>(&self, id: Uuid, f: F) -> Result<Job>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))?;
        f(job);
        Ok(job.clone())
    }

    /// Remove one job, returning it if it was present
    pub async fn remove(&self, id: Uuid) -> Option<Job> {
        self.jobs.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Number of jobs currently in a non-terminal state
    pub async fn active_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|j| !j.is_terminal())
            .count()
    }

    /// Drop every job older than the retention window. Returns how many were
    /// removed.
    pub async fn remove_expired(&self, retention_seconds: u64) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !job.is_expired(retention_seconds));
        let removed = before - jobs.len();
        if removed > 0 {
            tracing::info!(removed, remaining = jobs.len(), "Swept expired jobs");
        }
        removed
    }

    /// Start the periodic TTL sweeper. Runs until the server shuts down.
    pub fn spawn_sweeper(&self, retention_seconds: u64, sweep_interval: Duration) {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                registry.remove_expired(retention_seconds).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn test_insert_and_get() {
        let registry = JobRegistry::new();
        let job = Job::new(3);
        let id = job.id;
        registry.insert(job).await;

        let fetched = registry.get(id).await.expect("job present");
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.status, JobStatus::Pending);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let registry = JobRegistry::new();
        assert!(registry.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_update_mutates_and_snapshots() {
        let registry = JobRegistry::new();
        let job = Job::new(4);
        let id = job.id;
        registry.insert(job).await;

        let updated = registry
            .update(id, |j| {
                j.transition_to(JobStatus::Executing);
                j.update_progress(2, 1);
            })
            .await
            .expect("update");
        assert_eq!(updated.status, JobStatus::Executing);
        assert_eq!(updated.progress_percent, 50.0);

        let fetched = registry.get(id).await.expect("job present");
        assert_eq!(fetched.progress_percent, 50.0);
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let registry = JobRegistry::new();
        let result = registry.update(Uuid::new_v4(), |_| {}).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_expired_keeps_fresh_jobs() {
        let registry = JobRegistry::new();

        let fresh = Job::new(1);
        let fresh_id = fresh.id;
        registry.insert(fresh).await;

        let mut stale = Job::new(1);
        stale.created_at = Utc::now() - chrono::Duration::seconds(7200);
        let stale_id = stale.id;
        registry.insert(stale).await;

        let removed = registry.remove_expired(3600).await;
        assert_eq!(removed, 1);
        assert!(registry.get(fresh_id).await.is_some());
        assert!(registry.get(stale_id).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_returns_job() {
        let registry = JobRegistry::new();
        let job = Job::new(1);
        let id = job.id;
        registry.insert(job).await;

        let removed = registry.remove(id).await.expect("job present");
        assert_eq!(removed.id, id);
        assert!(registry.get(id).await.is_none());
        assert!(registry.remove(id).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_reads_see_consistent_snapshots() {
        let registry = JobRegistry::new();
        let mut job = Job::new(100);
        job.transition_to(JobStatus::Executing);
        let id = job.id;
        registry.insert(job).await;

        let writer_registry = registry.clone();
        let writer = tokio::spawn(async move {
            for i in 1..=100 {
                writer_registry
                    .update(id, |j| {
                        j.update_progress(i, i);
                    })
                    .await
                    .expect("update");
                tokio::task::yield_now().await;
            }
        });

        // Both counters move together inside one update closure, so a read
        // must never observe one advanced without the other
        for _ in 0..200 {
            let snapshot = registry.get(id).await.expect("job present");
            assert_eq!(snapshot.processed_segments, snapshot.hands_found);
            tokio::task::yield_now().await;
        }

        writer.await.expect("writer task");
    }

    #[tokio::test]
    async fn test_active_count_excludes_terminal() {
        let registry = JobRegistry::new();

        let running = Job::new(1);
        registry.insert(running).await;

        let mut done = Job::new(1);
        done.transition_to(JobStatus::Success);
        registry.insert(done).await;

        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.active_count().await, 1);
    }
}
