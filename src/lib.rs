//! subburn
//!
//! Burns styled subtitle cues into a video with FFmpeg, and extracts the
//! first audio track of a video as 16 kHz mono 16-bit WAV for transcription.
//!
//! [`Service`] is the transport-independent entry point; [`host`] serves it
//! as line-delimited JSON over stdin/stdout.

pub mod api;
pub mod audio;
pub mod compose;
pub mod config;
pub mod config_file;
pub mod error;
pub mod export;
pub mod ffmpeg_utils;
pub mod host;
pub mod media;
pub mod output;
pub mod state;
pub mod subtitle;
pub mod wav;

#[cfg(test)]
pub(crate) mod tests;

pub use api::*;
pub use error::{ErrorKind, FfmpegError, Result, SubburnError};
pub use ffmpeg_utils::{init, install_log_filter, version_info as ffmpeg_version_info};
