//! Line-delimited JSON messages exchanged with the host process.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, SubburnError};
use crate::export::{JobEvent, JobId};

/// One request line: `{"id", "method", "params"}`.
#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<&SubburnError> for ErrorBody {
    fn from(err: &SubburnError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Reply to a request, matched by `id`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok { id: Value, result: Value },
    Err { id: Value, error: ErrorBody },
}

/// Unsolicited job notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    Progress { job_id: JobId, progress: f64 },
    #[serde(rename_all = "camelCase")]
    Result { job_id: JobId, output_path: PathBuf },
    #[serde(rename_all = "camelCase")]
    Error {
        job_id: JobId,
        code: &'static str,
        message: String,
    },
}

impl Event {
    pub fn from_job_event(job_id: JobId, event: &JobEvent) -> Self {
        match event {
            JobEvent::Progress(progress) => Event::Progress {
                job_id,
                progress: *progress,
            },
            JobEvent::Completed { output_path } => Event::Result {
                job_id,
                output_path: output_path.clone(),
            },
            JobEvent::Failed { kind, message } => Event::Error {
                job_id,
                code: kind.code(),
                message: message.clone(),
            },
            JobEvent::Cancelled => Event::Error {
                job_id,
                code: ErrorKind::ExportCancelled.code(),
                message: "Export was cancelled".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req: Request = serde_json::from_str(r#"{"method":"cancelExport"}"#).unwrap();
        assert_eq!(req.id, Value::Null);
        assert_eq!(req.params, Value::Null);
    }

    #[test]
    fn test_response_shapes() {
        let ok = Response::Ok {
            id: json!(1),
            result: json!({"outputPath": "/a.wav"}),
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"id": 1, "result": {"outputPath": "/a.wav"}})
        );

        let err = Response::Err {
            id: json!("x"),
            error: ErrorBody::from(&SubburnError::NoAudioTrack),
        };
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["error"]["code"], "NO_AUDIO");
    }

    #[test]
    fn test_event_shapes() {
        let id = JobId::new();
        let progress = serde_json::to_value(Event::from_job_event(id, &JobEvent::Progress(0.5))).unwrap();
        assert_eq!(progress, json!({"event": "progress", "jobId": id.to_string(), "progress": 0.5}));

        let done = serde_json::to_value(Event::from_job_event(
            id,
            &JobEvent::Completed {
                output_path: PathBuf::from("/out.mp4"),
            },
        ))
        .unwrap();
        assert_eq!(done["event"], "result");
        assert_eq!(done["outputPath"], "/out.mp4");

        let cancelled = serde_json::to_value(Event::from_job_event(id, &JobEvent::Cancelled)).unwrap();
        assert_eq!(cancelled["event"], "error");
        assert_eq!(cancelled["code"], "EXPORT_CANCELLED");
    }
}
