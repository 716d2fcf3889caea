//! Persistence of research job records
//!
//! Redis layout: `job:{id}` holds the JSON record and the sorted set
//! `jobs:list` indexes ids by creation time in milliseconds.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::RedisClient;
use crate::config::AppConfig;
use crate::errors::ResearchError;
use crate::models::JobListing;
use crate::models::JobRecord;
use crate::models::JobStatus;
use crate::models::JobUpdate;
use crate::Result;

const JOBS_INDEX_KEY: &str = "jobs:list";

fn job_key(job_id: &str) -> String {
    format!("job:{job_id}")
}

#[async_trait]
pub trait JobBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert or overwrite a record
    async fn save(&self, record: &JobRecord) -> Result<()>;

    async fn load(&self, job_id: &str) -> Result<Option<JobRecord>>;

    /// Returns whether the record existed
    async fn remove(&self, job_id: &str) -> Result<bool>;

    /// All records, newest first
    async fn load_all(&self) -> Result<Vec<JobRecord>>;

    async fn is_connected(&self) -> bool;
}

#[derive(Default)]
pub struct MemoryJobBackend {
    jobs: DashMap<String, JobRecord>,
}

impl MemoryJobBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobBackend for MemoryJobBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, record: &JobRecord) -> Result<()> {
        self.jobs.insert(record.job_id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, job_id: &str) -> Result<Option<JobRecord>> {
        Ok(self.jobs.get(job_id).map(|entry| entry.value().clone()))
    }

    async fn remove(&self, job_id: &str) -> Result<bool> {
        Ok(self.jobs.remove(job_id).is_some())
    }

    async fn load_all(&self) -> Result<Vec<JobRecord>> {
        let mut records: Vec<JobRecord> = self.jobs.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn is_connected(&self) -> bool {
        true
    }
}

pub struct RedisJobBackend {
    redis: RedisClient,
}

impl RedisJobBackend {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl JobBackend for RedisJobBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn save(&self, record: &JobRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.redis.set(&job_key(&record.job_id), &json).await?;
        self.redis
            .zadd(
                JOBS_INDEX_KEY,
                &record.job_id,
                record.created_at.timestamp_millis() as f64,
            )
            .await
    }

    async fn load(&self, job_id: &str) -> Result<Option<JobRecord>> {
        match self.redis.get(&job_key(job_id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, job_id: &str) -> Result<bool> {
        let removed = self.redis.del(&[job_key(job_id)]).await?;
        self.redis.zrem(JOBS_INDEX_KEY, job_id).await?;
        Ok(removed > 0)
    }

    async fn load_all(&self) -> Result<Vec<JobRecord>> {
        let ids = self.redis.zrevrange_all(JOBS_INDEX_KEY).await?;
        let mut records = Vec::with_capacity(ids.len());

        for id in ids {
            match self.load(&id).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!("Job {} indexed but missing", id),
                Err(e) => warn!("Skipping unreadable job {}: {}", id, e),
            }
        }
        Ok(records)
    }

    async fn is_connected(&self) -> bool {
        self.redis.ping().await.is_ok()
    }
}

/// Job records shared between the API handlers and background runners
pub struct JobStore {
    backend: Arc<dyn JobBackend>,
    // Serializes read-modify-write updates
    update_lock: Mutex<()>,
}

impl JobStore {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self {
            backend,
            update_lock: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryJobBackend::new()))
    }

    /// Probe Redis once; fall back to memory when unreachable
    pub async fn connect(config: &AppConfig) -> Self {
        match RedisClient::connect(&config.redis) {
            Ok(redis) => match redis.ping().await {
                Ok(()) => {
                    info!("✅ Job store using Redis at {}", redis.display_url());
                    return Self::new(Arc::new(RedisJobBackend::new(redis)));
                }
                Err(e) => warn!("⚠️  Redis unavailable for jobs: {}", e),
            },
            Err(e) => warn!("⚠️  Invalid Redis configuration for jobs: {}", e),
        }

        warn!("Falling back to in-memory job storage; jobs will not survive a restart");
        Self::in_memory()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn is_connected(&self) -> bool {
        self.backend.is_connected().await
    }

    pub async fn create(&self, record: JobRecord) -> Result<()> {
        self.backend.save(&record).await?;
        debug!("Created job {}", record.job_id);
        Ok(())
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.backend.load(job_id).await
    }

    /// Apply a partial update; `None` when the job does not exist
    pub async fn update(&self, job_id: &str, update: JobUpdate) -> Result<Option<JobRecord>> {
        let _guard = self.update_lock.lock().await;

        let Some(mut record) = self.backend.load(job_id).await? else {
            warn!("Job {} not found for update", job_id);
            return Ok(None);
        };

        if let Some(next) = update.status {
            if !record.status.can_transition_to(next) {
                return Err(ResearchError::InvalidTransition {
                    job_id: job_id.to_string(),
                    from: record.status.to_string(),
                    to: next.to_string(),
                });
            }
        }

        update.apply_to(&mut record);
        self.backend.save(&record).await?;
        debug!("Updated job {} ({})", job_id, record.status);
        Ok(Some(record))
    }

    pub async fn delete(&self, job_id: &str) -> Result<bool> {
        let _guard = self.update_lock.lock().await;
        let removed = self.backend.remove(job_id).await?;
        if removed {
            debug!("Deleted job {}", job_id);
        }
        Ok(removed)
    }

    /// Newest first, optionally filtered by status, then truncated to `limit`
    pub async fn list(&self, limit: usize, status: Option<JobStatus>) -> Result<JobListing> {
        let records = self.backend.load_all().await?;
        let total = records.len();

        let matching: Vec<&JobRecord> = records
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect();
        let filtered = matching.len();

        Ok(JobListing {
            total,
            filtered,
            jobs: matching
                .into_iter()
                .take(limit)
                .map(JobRecord::listing_entry)
                .collect(),
        })
    }
}
