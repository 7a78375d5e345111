//! Request handlers for the stdio host.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::protocol::{ErrorBody, Event, Request, Response};
use super::Outbox;
use crate::api::{CancelExportParams, ExtractAudioParams, MergeStarted, MergeSubtitlesParams};
use crate::error::{ErrorKind, Result, SubburnError};
use crate::export::{JobEvent, JobHandle, JobId};
use crate::state::AppState;

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JobStatusParams {
    job_id: Option<String>,
}

fn send<T: Serialize>(outbox: &Outbox, message: &T) {
    match serde_json::to_string(message) {
        Ok(line) => {
            if outbox.send(line).is_err() {
                tracing::debug!("host writer closed, dropping message");
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize message"),
    }
}

fn reply<T: Serialize>(outbox: &Outbox, id: Value, result: Result<T>) {
    let response = match result.and_then(|value| {
        serde_json::to_value(value)
            .map_err(|e| SubburnError::ExportUnknown(format!("serialize result: {}", e)))
    }) {
        Ok(result) => Response::Ok { id, result },
        Err(e) => {
            tracing::warn!(code = e.code(), error = %e, "request failed");
            Response::Err {
                id,
                error: ErrorBody::from(&e),
            }
        }
    };
    send(outbox, &response);
}

fn params<T: DeserializeOwned + Default>(value: Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| SubburnError::InvalidArguments(e.to_string()))
}

/// Handle one request line. For `mergeSubtitles` this keeps running until the
/// job's terminal event has been forwarded.
pub async fn handle_line(state: Arc<AppState>, line: String, outbox: Outbox) {
    let request: Request = match serde_json::from_str(&line) {
        Ok(request) => request,
        Err(e) => {
            reply::<()>(
                &outbox,
                Value::Null,
                Err(SubburnError::InvalidArguments(format!("malformed request: {}", e))),
            );
            return;
        }
    };

    tracing::debug!(method = %request.method, id = %request.id, "request");
    let Request { id, method, params: raw } = request;

    match method.as_str() {
        "extractAudio" => {
            let result = match params::<ExtractAudioParams>(raw) {
                Ok(p) => state.service.extract_audio(p).await,
                Err(e) => Err(e),
            };
            reply(&outbox, id, result);
        }
        "mergeSubtitles" => {
            let started = params::<MergeSubtitlesParams>(raw)
                .and_then(|p| state.service.merge_subtitles(p));
            match started {
                Ok(handle) => {
                    let job_id = handle.id();
                    state.register_job(job_id);
                    reply(&outbox, id, Ok(MergeStarted { job_id }));
                    forward_events(&state, handle, &outbox).await;
                }
                Err(e) => reply::<()>(&outbox, id, Err(e)),
            }
        }
        "cancelExport" => {
            let result =
                params::<CancelExportParams>(raw).and_then(|p| state.service.cancel_export(p));
            reply(&outbox, id, result);
        }
        "jobStatus" => {
            let result = params::<JobStatusParams>(raw).and_then(|p| {
                let job_id: JobId = p
                    .job_id
                    .ok_or_else(|| SubburnError::InvalidArguments("jobId is required".to_string()))?
                    .parse()?;
                state
                    .job_status(job_id)
                    .ok_or_else(|| SubburnError::InvalidArguments(format!("unknown job {}", job_id)))
            });
            reply(&outbox, id, result);
        }
        other => reply::<()>(
            &outbox,
            id,
            Err(SubburnError::InvalidArguments(format!("unknown method {:?}", other))),
        ),
    }
}

async fn forward_events(state: &AppState, mut handle: JobHandle, outbox: &Outbox) {
    let job_id = handle.id();
    while let Some(event) = handle.next_event().await {
        state.record_event(job_id, &event);
        send(outbox, &Event::from_job_event(job_id, &event));
        if event.is_terminal() {
            return;
        }
    }
    tracing::error!(job_id = %job_id, "job channel closed without a terminal event");
    let lost = JobEvent::Failed {
        kind: ErrorKind::ExportUnknown,
        message: "job ended without reporting an outcome".to_string(),
    };
    state.record_event(job_id, &lost);
    send(outbox, &Event::from_job_event(job_id, &lost));
}
