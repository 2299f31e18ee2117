//! Persistence boundary.
//!
//! Runs and jobs are stored as JSON documents; application attempts go to
//! an append-only JSONL file per job, matching their audit-trail contract.
//! [`MemoryStore`] backs tests and the offline demo.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::pipeline::{ApplicationAttempt, Job, Run};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn save_run(&self, run: &Run) -> Result<(), StoreError>;
    async fn load_run(&self, id: &str) -> Result<Option<Run>, StoreError>;
    /// Most recently started run, if any.
    async fn latest_run(&self) -> Result<Option<Run>, StoreError>;

    async fn save_job(&self, job: &Job) -> Result<(), StoreError>;
    async fn load_job(&self, id: &str) -> Result<Option<Job>, StoreError>;
    async fn jobs_for_run(&self, run_id: &str) -> Result<Vec<Job>, StoreError>;

    async fn append_attempt(&self, attempt: &ApplicationAttempt) -> Result<(), StoreError>;
    async fn attempts_for_job(&self, job_id: &str) -> Result<Vec<ApplicationAttempt>, StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    runs: HashMap<String, Run>,
    jobs: HashMap<String, Job>,
    attempts: Vec<ApplicationAttempt>,
}

/// In-memory repository for tests and the demo pipeline.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn save_run(&self, run: &Run) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn load_run(&self, id: &str) -> Result<Option<Run>, StoreError> {
        Ok(self.inner.lock().unwrap().runs.get(id).cloned())
    }

    async fn latest_run(&self) -> Result<Option<Run>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .runs
            .values()
            .max_by_key(|run| run.started_at)
            .cloned())
    }

    async fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn load_job(&self, id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.inner.lock().unwrap().jobs.get(id).cloned())
    }

    async fn jobs_for_run(&self, run_id: &str) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| job.run_id == run_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.discovered_at.cmp(&b.discovered_at));
        Ok(jobs)
    }

    async fn append_attempt(&self, attempt: &ApplicationAttempt) -> Result<(), StoreError> {
        self.inner.lock().unwrap().attempts.push(attempt.clone());
        Ok(())
    }

    async fn attempts_for_job(&self, job_id: &str) -> Result<Vec<ApplicationAttempt>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .attempts
            .iter()
            .filter(|attempt| attempt.job_id == job_id)
            .cloned()
            .collect())
    }
}

/// Filesystem repository rooted at a data directory
/// (`runs/`, `jobs/`, `attempts/`).
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for dir in ["runs", "jobs", "attempts"] {
            std::fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    fn run_path(&self, id: &str) -> PathBuf {
        self.root.join("runs").join(format!("{id}.json"))
    }

    fn job_path(&self, id: &str) -> PathBuf {
        self.root.join("jobs").join(format!("{id}.json"))
    }

    fn attempts_path(&self, job_id: &str) -> PathBuf {
        self.root.join("attempts").join(format!("{job_id}.jsonl"))
    }
}

#[async_trait]
impl Repository for JsonFileStore {
    async fn save_run(&self, run: &Run) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(run)?;
        tokio::fs::write(self.run_path(&run.id), bytes).await?;
        Ok(())
    }

    async fn load_run(&self, id: &str) -> Result<Option<Run>, StoreError> {
        match tokio::fs::read(self.run_path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn latest_run(&self) -> Result<Option<Run>, StoreError> {
        let mut latest: Option<Run> = None;
        let mut entries = tokio::fs::read_dir(self.root.join("runs")).await?;
        while let Some(entry) = entries.next_entry().await? {
            let bytes = tokio::fs::read(entry.path()).await?;
            let run: Run = serde_json::from_slice(&bytes)?;
            if latest
                .as_ref()
                .is_none_or(|current| run.started_at > current.started_at)
            {
                latest = Some(run);
            }
        }
        Ok(latest)
    }

    async fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(job)?;
        tokio::fs::write(self.job_path(&job.id), bytes).await?;
        Ok(())
    }

    async fn load_job(&self, id: &str) -> Result<Option<Job>, StoreError> {
        match tokio::fs::read(self.job_path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn jobs_for_run(&self, run_id: &str) -> Result<Vec<Job>, StoreError> {
        let mut jobs = Vec::new();
        let mut entries = tokio::fs::read_dir(self.root.join("jobs")).await?;
        while let Some(entry) = entries.next_entry().await? {
            let bytes = tokio::fs::read(entry.path()).await?;
            let job: Job = serde_json::from_slice(&bytes)?;
            if job.run_id == run_id {
                jobs.push(job);
            }
        }
        jobs.sort_by(|a, b| a.discovered_at.cmp(&b.discovered_at));
        Ok(jobs)
    }

    async fn append_attempt(&self, attempt: &ApplicationAttempt) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(attempt)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.attempts_path(&attempt.job_id))
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn attempts_for_job(&self, job_id: &str) -> Result<Vec<ApplicationAttempt>, StoreError> {
        let contents = match tokio::fs::read_to_string(self.attempts_path(job_id)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }
}
