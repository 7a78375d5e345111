//! Host state
//!
//! Holds the [`Service`] and a registry of every export job the host has
//! started, so job status can be queried after the events went out.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use crate::api::Service;
use crate::config::AppConfig;
use crate::error::ErrorKind;
use crate::export::{JobEvent, JobId, JobState};

/// Last known state of one export job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: JobId,
    pub state: JobState,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl JobStatus {
    fn running(job_id: JobId) -> Self {
        Self {
            job_id,
            state: JobState::Running,
            progress: 0.0,
            output_path: None,
            error_code: None,
        }
    }
}

pub struct AppState {
    pub service: Service,
    pub config: AppConfig,
    jobs: DashMap<JobId, JobStatus>,
    shutdown: AtomicBool,
}

impl AppState {
    pub fn new(service: Service, config: AppConfig) -> Self {
        Self {
            service,
            config,
            jobs: DashMap::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn register_job(&self, job_id: JobId) {
        self.jobs.insert(job_id, JobStatus::running(job_id));
    }

    /// Fold one event into the job's status.
    pub fn record_event(&self, job_id: JobId, event: &JobEvent) {
        let mut status = self
            .jobs
            .entry(job_id)
            .or_insert_with(|| JobStatus::running(job_id));
        match event {
            JobEvent::Progress(p) => status.progress = status.progress.max(*p),
            JobEvent::Completed { output_path } => {
                status.progress = 1.0;
                status.output_path = Some(output_path.clone());
            }
            JobEvent::Failed { kind, .. } => status.error_code = Some(kind.code()),
            JobEvent::Cancelled => status.error_code = Some(ErrorKind::ExportCancelled.code()),
        }
        status.state = event.state();
    }

    pub fn job_status(&self, job_id: JobId) -> Option<JobStatus> {
        self.jobs.get(&job_id).map(|s| s.clone())
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
