use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::ExportConfig;
use crate::error::{ErrorKind, Result, SubburnError};
use crate::export::backend::ExportBackend;
use crate::export::job::{ExportContext, ExportRequest, JobEvent, JobId, JobState};
use crate::export::progress::ProgressCell;

struct ActiveJob {
    id: JobId,
    state: JobState,
    cancel: Arc<AtomicBool>,
}

type ActiveSlot = Arc<Mutex<Option<ActiveJob>>>;

/// Caller side of a running job.
pub struct JobHandle {
    id: JobId,
    events: mpsc::UnboundedReceiver<JobEvent>,
    cancel: Arc<AtomicBool>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Request cancellation. The job still ends with exactly one terminal event.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Next event, or `None` after the terminal event was received.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }

    /// Wait for the terminal event, discarding progress.
    pub async fn wait(mut self) -> JobEvent {
        while let Some(event) = self.events.recv().await {
            if event.is_terminal() {
                return event;
            }
        }
        JobEvent::Failed {
            kind: ErrorKind::ExportUnknown,
            message: "job ended without a result".to_string(),
        }
    }
}

/// Runs at most one export at a time.
pub struct ExportController {
    backend: Arc<dyn ExportBackend>,
    progress_interval: Duration,
    active: ActiveSlot,
}

impl ExportController {
    pub fn new(backend: Arc<dyn ExportBackend>, config: &ExportConfig) -> Self {
        Self {
            backend,
            progress_interval: config.progress_interval(),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Validate `request` and start exporting it in the background.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// `JobAlreadyRunning` while another job holds the slot.
    pub fn start(&self, request: ExportRequest) -> Result<JobHandle> {
        request.validate()?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SubburnError::ExportUnknown(format!("no async runtime: {}", e)))?;

        let id = JobId::new();
        let cancel = Arc::new(AtomicBool::new(false));
        {
            let mut slot = self.active.lock();
            if let Some(job) = slot.as_ref() {
                return Err(SubburnError::JobAlreadyRunning(job.id.to_string()));
            }
            *slot = Some(ActiveJob {
                id,
                state: JobState::Pending,
                cancel: cancel.clone(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let driver = JobDriver {
            id,
            backend: self.backend.clone(),
            cancel: cancel.clone(),
            interval: self.progress_interval,
            active: self.active.clone(),
            events: tx,
        };
        runtime.spawn(driver.run(request));

        Ok(JobHandle {
            id,
            events: rx,
            cancel,
        })
    }

    /// Request cancellation of `id`. Returns false if it is not the active job.
    pub fn cancel(&self, id: JobId) -> bool {
        let slot = self.active.lock();
        match slot.as_ref() {
            Some(job) if job.id == id && !job.state.is_terminal() => {
                job.cancel.store(true, Ordering::Release);
                tracing::info!(job_id = %id, "export cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// The job currently holding the slot, if any.
    pub fn active_job(&self) -> Option<(JobId, JobState)> {
        self.active.lock().as_ref().map(|job| (job.id, job.state))
    }
}

struct JobDriver {
    id: JobId,
    backend: Arc<dyn ExportBackend>,
    cancel: Arc<AtomicBool>,
    interval: Duration,
    active: ActiveSlot,
    events: mpsc::UnboundedSender<JobEvent>,
}

impl JobDriver {
    async fn run(self, request: ExportRequest) {
        let started = Instant::now();
        self.set_state(JobState::Running);
        tracing::info!(
            job_id = %self.id,
            backend = self.backend.name(),
            input = %request.video_path.display(),
            output = %request.output_path.display(),
            cues = request.cues.len(),
            "export started"
        );

        let progress = Arc::new(ProgressCell::new());
        let ctx = ExportContext::new(progress.clone(), self.cancel.clone());
        let backend = self.backend.clone();
        let mut worker = tokio::task::spawn_blocking(move || backend.render(&request, &ctx));

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_sent = f64::NEG_INFINITY;

        let outcome = loop {
            tokio::select! {
                joined = &mut worker => break joined,
                _ = ticker.tick() => {
                    if self.cancel.load(Ordering::Acquire) {
                        continue;
                    }
                    let value = progress.get();
                    if value > last_sent {
                        last_sent = value;
                        let _ = self.events.send(JobEvent::Progress(value));
                    }
                }
            }
        };
        drop(ticker);

        let terminal = match outcome {
            Ok(Ok(output_path)) => {
                if last_sent < 1.0 {
                    let _ = self.events.send(JobEvent::Progress(1.0));
                }
                JobEvent::Completed { output_path }
            }
            Ok(Err(err)) => JobEvent::from_error(&err),
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    "export worker panicked".to_string()
                } else {
                    join_err.to_string()
                };
                JobEvent::Failed {
                    kind: ErrorKind::ExportUnknown,
                    message,
                }
            }
        };

        match &terminal {
            JobEvent::Completed { output_path } => tracing::info!(
                job_id = %self.id,
                output = %output_path.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "export completed"
            ),
            JobEvent::Cancelled => tracing::info!(job_id = %self.id, "export cancelled"),
            JobEvent::Failed { kind, message } => tracing::error!(
                job_id = %self.id,
                code = kind.code(),
                error = %message,
                "export failed"
            ),
            JobEvent::Progress(_) => {}
        }

        self.finish(terminal);
    }

    fn set_state(&self, next: JobState) {
        let mut slot = self.active.lock();
        if let Some(job) = slot.as_mut().filter(|job| job.id == self.id) {
            if job.state.can_transition_to(next) {
                job.state = next;
            }
        }
    }

    /// Deliver the terminal event, then free the slot. Both happen under the
    /// slot lock so a caller reacting to the event sees the slot cleared.
    fn finish(&self, terminal: JobEvent) {
        let mut slot = self.active.lock();
        if let Some(job) = slot.as_mut().filter(|job| job.id == self.id) {
            job.state = terminal.state();
        }
        let _ = self.events.send(terminal);
        if slot.as_ref().map(|job| job.id) == Some(self.id) {
            *slot = None;
        }
    }
}
