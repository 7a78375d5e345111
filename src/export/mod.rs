//! Asynchronous export jobs
//!
//! The [`ExportController`] owns a single active-job slot, runs an
//! [`ExportBackend`] on the blocking pool and turns its progress and outcome
//! into a stream of [`JobEvent`]s.

pub mod backend;
pub mod controller;
pub mod job;
pub mod progress;

pub use backend::ExportBackend;
pub use controller::{ExportController, JobHandle};
pub use job::{ExportContext, ExportRequest, JobEvent, JobId, JobState};
pub use progress::ProgressCell;
