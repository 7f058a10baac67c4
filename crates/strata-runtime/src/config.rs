use std::thread;

use serde::Deserialize;

use crate::SchedulerError;

/// Worker cap used when none is configured: all cores but two, at least one.
pub fn default_worker_cap() -> usize {
    let cpus = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cpus.saturating_sub(2).max(1)
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of chunks processed at once. `None` picks `default_worker_cap()`.
    pub max_workers: Option<usize>,
    /// Jobs that may wait for a free worker. `None` matches the worker cap.
    pub job_queue_capacity: Option<usize>,
    pub thread_name_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            job_queue_capacity: None,
            thread_name_prefix: "strata-chunk".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    pub fn with_job_queue_capacity(mut self, capacity: usize) -> Self {
        self.job_queue_capacity = Some(capacity);
        self
    }

    #[inline]
    pub fn worker_cap(&self) -> usize {
        self.max_workers.unwrap_or_else(default_worker_cap)
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.job_queue_capacity.unwrap_or_else(|| self.worker_cap())
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.max_workers == Some(0) {
            return Err(SchedulerError::InvalidConfig(
                "max_workers must be at least 1".into(),
            ));
        }
        if self.job_queue_capacity == Some(0) {
            return Err(SchedulerError::InvalidConfig(
                "job_queue_capacity must be at least 1".into(),
            ));
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err(SchedulerError::InvalidConfig(
                "thread_name_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}
