//! Request-level operations, independent of any transport.
//!
//! [`Service`] validates arguments before touching the filesystem, runs audio
//! extraction off the async executor and hands burn-in jobs to the
//! [`ExportController`].

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audio;
use crate::compose::FfmpegExportBackend;
use crate::config::AppConfig;
use crate::error::{Result, SubburnError};
use crate::export::{ExportBackend, ExportController, ExportRequest, JobHandle, JobId};
use crate::subtitle::{FontResolver, StyleConfig, SubtitleCue};

/// Parameters of `extractAudio`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractAudioParams {
    pub video_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractAudioResult {
    pub output_path: PathBuf,
}

/// Parameters of `mergeSubtitles`. `subtitles` and `fontConfig` are the
/// older names of `cues` and `styleConfig`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeSubtitlesParams {
    pub video_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    #[serde(alias = "subtitles")]
    pub cues: Option<Vec<SubtitleCue>>,
    #[serde(alias = "fontConfig")]
    pub style_config: Option<StyleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStarted {
    pub job_id: JobId,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CancelExportParams {
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelExportResult {
    pub cancelled: bool,
}

fn required(value: Option<PathBuf>, name: &str) -> Result<PathBuf> {
    match value {
        Some(path) if !path.as_os_str().is_empty() => Ok(path),
        _ => Err(SubburnError::InvalidArguments(format!("{} is required", name))),
    }
}

/// The operations a host exposes.
pub struct Service {
    controller: ExportController,
}

impl Service {
    /// Service exporting through FFmpeg. Initializes FFmpeg.
    pub fn new(config: &AppConfig) -> Result<Self> {
        crate::ffmpeg_utils::init()?;
        let fonts = Arc::new(FontResolver::new(config.fonts.clone()));
        let backend = Arc::new(FfmpegExportBackend::new(config.export.clone(), fonts));
        Ok(Self::with_backend(config, backend))
    }

    /// Service exporting through `backend`.
    pub fn with_backend(config: &AppConfig, backend: Arc<dyn ExportBackend>) -> Self {
        Self {
            controller: ExportController::new(backend, &config.export),
        }
    }

    /// Extract the first audio track to a 16 kHz mono WAV file.
    pub async fn extract_audio(&self, params: ExtractAudioParams) -> Result<ExtractAudioResult> {
        let video_path = required(params.video_path, "videoPath")?;
        let output_path = required(params.output_path, "outputPath")?;

        let output_path = tokio::task::spawn_blocking(move || {
            audio::extract_audio(&video_path, &output_path)
        })
        .await
        .map_err(|e| SubburnError::Decode(format!("extraction worker failed: {}", e)))??;

        Ok(ExtractAudioResult { output_path })
    }

    /// Start burning `cues` into the video. Progress and the outcome arrive
    /// through the returned handle.
    pub fn merge_subtitles(&self, params: MergeSubtitlesParams) -> Result<JobHandle> {
        let video_path = required(params.video_path, "videoPath")?;
        let output_path = required(params.output_path, "outputPath")?;
        let cues = params
            .cues
            .ok_or_else(|| SubburnError::InvalidArguments("subtitles are required".to_string()))?;

        self.controller.start(ExportRequest {
            video_path,
            output_path,
            cues,
            style: params.style_config.unwrap_or_default(),
        })
    }

    /// Cancel the running export `job_id`. False if it is not running.
    pub fn cancel_export(&self, params: CancelExportParams) -> Result<CancelExportResult> {
        let job_id: JobId = params
            .job_id
            .ok_or_else(|| SubburnError::InvalidArguments("jobId is required".to_string()))?
            .parse()?;
        Ok(CancelExportResult {
            cancelled: self.controller.cancel(job_id),
        })
    }

    pub fn controller(&self) -> &ExportController {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::export::{ExportContext, JobEvent};
    use crate::subtitle::Position;

    struct EchoBackend;

    impl ExportBackend for EchoBackend {
        fn render(&self, request: &ExportRequest, _ctx: &ExportContext) -> Result<PathBuf> {
            Ok(request.output_path.clone())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn service() -> Service {
        Service::with_backend(&AppConfig::default(), Arc::new(EchoBackend))
    }

    #[test]
    fn test_legacy_merge_params() {
        let params: MergeSubtitlesParams = serde_json::from_str(
            r#"{"videoPath":"/a.mov","outputPath":"/b.mp4",
                "subtitles":[{"text":"hi","startTime":0,"endTime":1}],
                "fontConfig":{"fontSize":30,"position":1}}"#,
        )
        .unwrap();
        assert_eq!(params.cues.as_ref().map(|c| c.len()), Some(1));
        let style = params.style_config.unwrap();
        assert_eq!(style.font_size_pt, 30.0);
        assert_eq!(style.position, Position::Center);
    }

    #[tokio::test]
    async fn test_extract_requires_paths() {
        let err = service()
            .extract_audio(ExtractAudioParams {
                video_path: Some(PathBuf::from("/in.mp4")),
                output_path: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn test_merge_requires_cues() {
        let err = service()
            .merge_subtitles(MergeSubtitlesParams {
                video_path: Some(PathBuf::from("/in.mp4")),
                output_path: Some(PathBuf::from("/out.mp4")),
                cues: None,
                style_config: None,
            })
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn test_merge_runs_with_default_style() {
        let handle = service()
            .merge_subtitles(MergeSubtitlesParams {
                video_path: Some(PathBuf::from("/in.mp4")),
                output_path: Some(PathBuf::from("/out.mp4")),
                cues: Some(vec![]),
                style_config: None,
            })
            .unwrap();
        assert_eq!(
            handle.wait().await,
            JobEvent::Completed {
                output_path: PathBuf::from("/out.mp4")
            }
        );
    }

    #[test]
    fn test_cancel_unknown_job() {
        let svc = service();
        let result = svc
            .cancel_export(CancelExportParams {
                job_id: Some(JobId::new().to_string()),
            })
            .unwrap();
        assert!(!result.cancelled);

        let err = svc
            .cancel_export(CancelExportParams {
                job_id: Some("nope".to_string()),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    }
}
