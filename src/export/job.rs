//! Export job identity, lifecycle and the per-job worker context.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorKind, Result, SubburnError};
use crate::export::progress::ProgressCell;
use crate::subtitle::{StyleConfig, SubtitleCue};

/// Unique identifier of one export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for JobId {
    type Err = SubburnError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(JobId)
            .map_err(|e| SubburnError::InvalidArguments(format!("jobId {:?}: {}", s, e)))
    }
}

/// Lifecycle of an export job. Terminal states have no way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Pending, JobState::Failed)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::Failed)
                | (JobState::Running, JobState::Cancelled)
        )
    }
}

/// Everything sent to the caller about one job. Zero or more `Progress`
/// events, then exactly one terminal event.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress(f64),
    Completed { output_path: PathBuf },
    Failed { kind: ErrorKind, message: String },
    Cancelled,
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress(_))
    }

    /// Terminal event describing `err`.
    pub fn from_error(err: &SubburnError) -> Self {
        match err {
            SubburnError::Cancelled => JobEvent::Cancelled,
            other => JobEvent::Failed {
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }

    /// State a job ends up in after this event.
    pub fn state(&self) -> JobState {
        match self {
            JobEvent::Progress(_) => JobState::Running,
            JobEvent::Completed { .. } => JobState::Completed,
            JobEvent::Failed { .. } => JobState::Failed,
            JobEvent::Cancelled => JobState::Cancelled,
        }
    }
}

/// Input of one burn-in export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub video_path: PathBuf,
    pub output_path: PathBuf,
    pub cues: Vec<SubtitleCue>,
    pub style: StyleConfig,
}

impl ExportRequest {
    /// Check the request without touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.video_path.as_os_str().is_empty() {
            return Err(SubburnError::InvalidArguments(
                "videoPath must not be empty".to_string(),
            ));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(SubburnError::InvalidArguments(
                "outputPath must not be empty".to_string(),
            ));
        }
        if self.output_path == self.video_path {
            return Err(SubburnError::InvalidArguments(
                "outputPath must differ from videoPath".to_string(),
            ));
        }
        for (i, cue) in self.cues.iter().enumerate() {
            cue.validate(i)?;
        }
        self.style.validate()
    }
}

/// Handed to the export worker: where to report progress and how to learn
/// about cancellation.
#[derive(Debug, Clone)]
pub struct ExportContext {
    progress: Arc<ProgressCell>,
    cancel: Arc<AtomicBool>,
}

impl ExportContext {
    pub fn new(progress: Arc<ProgressCell>, cancel: Arc<AtomicBool>) -> Self {
        Self { progress, cancel }
    }

    /// Context with its own progress cell and cancel flag.
    pub fn detached() -> Self {
        Self::new(Arc::new(ProgressCell::new()), Arc::new(AtomicBool::new(false)))
    }

    pub fn report_progress(&self, value: f64) {
        self.progress.advance(value);
    }

    pub fn progress(&self) -> f64 {
        self.progress.get()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SubburnError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ExportRequest {
        ExportRequest {
            video_path: PathBuf::from("/videos/in.mov"),
            output_path: PathBuf::from("/videos/out.mp4"),
            cues: vec![SubtitleCue::new("hi", 0.0, 1.0)],
            style: StyleConfig::default(),
        }
    }

    #[test]
    fn test_state_machine() {
        assert!(JobState::Pending.can_transition_to(JobState::Running));
        assert!(JobState::Running.can_transition_to(JobState::Cancelled));
        assert!(!JobState::Pending.can_transition_to(JobState::Cancelled));
        for terminal in [JobState::Completed, JobState::Failed, JobState::Cancelled] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(JobState::Running));
            assert!(!terminal.can_transition_to(JobState::Failed));
        }
    }

    #[test]
    fn test_job_id_parse() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        let err = "not-a-uuid".parse::<JobId>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    }

    #[test]
    fn test_event_from_error() {
        assert_eq!(JobEvent::from_error(&SubburnError::Cancelled), JobEvent::Cancelled);
        match JobEvent::from_error(&SubburnError::NoVideoTrack) {
            JobEvent::Failed { kind, .. } => assert_eq!(kind, ErrorKind::NoVideoTrack),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!JobEvent::Progress(0.5).is_terminal());
        assert!(JobEvent::Cancelled.is_terminal());
    }

    #[test]
    fn test_request_validation() {
        assert!(request().validate().is_ok());

        let mut r = request();
        r.output_path = PathBuf::new();
        assert_eq!(r.validate().unwrap_err().kind(), ErrorKind::InvalidArguments);

        let mut r = request();
        r.cues.push(SubtitleCue::new("bad", -1.0, 2.0));
        assert_eq!(r.validate().unwrap_err().kind(), ErrorKind::InvalidArguments);

        let mut r = request();
        r.output_path = r.video_path.clone();
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_context_cancel() {
        let ctx = ExportContext::detached();
        assert!(ctx.check_cancelled().is_ok());
        ctx.cancel();
        assert!(matches!(ctx.check_cancelled(), Err(SubburnError::Cancelled)));
    }
}
