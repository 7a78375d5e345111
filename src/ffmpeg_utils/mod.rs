//! FFmpeg module - initialization, log routing and safe FFI accessors
//!
//! This module handles:
//! - FFmpeg initialization
//! - Routing libav* log output into `tracing`
//! - Codec-parameter and side-data accessors `ffmpeg-next` doesn't expose

pub mod helpers;

pub use ffmpeg_next as ffmpeg;

/// Initialize the FFmpeg library.
///
/// Call once at startup before opening any media. Safe to call more than
/// once; later calls are no-ops inside libavformat.
pub fn init() -> Result<(), crate::error::FfmpegError> {
    ffmpeg::init().map_err(|e| {
        crate::error::FfmpegError::InitFailed(format!("ffmpeg::init() failed: {}", e))
    })?;

    tracing::info!("FFmpeg initialized");

    Ok(())
}

/// Install a log callback that forwards FFmpeg messages to `tracing` and
/// drops known-noisy ones.
///
/// **Ordering:** must be called after `init()` and before any worker thread
/// starts decoding, because the global log callback is not thread-safe to swap.
pub fn install_log_filter() {
    // SAFETY: both functions modify global FFmpeg state and are safe to call
    // after `ffmpeg::init()`. They are called exactly once at startup.
    unsafe {
        ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_WARNING as i32);
        ffmpeg_next::ffi::av_log_set_callback(Some(ffmpeg_log_callback));
    }
}

/// Messages that are benign for whole-file decode/re-encode and should be suppressed.
const SUPPRESSED_MESSAGES: &[&str] = &[
    "deprecated pixel format used",
    "No accelerated colorspace conversion found",
    "Could not update timestamps for skipped samples",
    "Could not update timestamps for discarded samples",
    "Estimating duration from bitrate",
];

unsafe extern "C" fn ffmpeg_log_callback(
    avcl: *mut std::ffi::c_void,
    level: std::ffi::c_int,
    fmt: *const std::ffi::c_char,
    vl: ffmpeg_next::ffi::va_list,
) {
    use std::ffi::CStr;

    if level > unsafe { ffmpeg_next::ffi::av_log_get_level() } {
        return;
    }

    let mut buf = [0 as std::ffi::c_char; 1024];
    let mut print_prefix: std::ffi::c_int = 1;
    ffmpeg_next::ffi::av_log_format_line(
        avcl,
        level,
        fmt,
        vl,
        buf.as_mut_ptr(),
        buf.len() as std::ffi::c_int,
        &mut print_prefix,
    );

    let msg = CStr::from_ptr(buf.as_ptr()).to_string_lossy();
    let msg = msg.trim_end();
    if msg.is_empty() {
        return;
    }

    for suppressed in SUPPRESSED_MESSAGES {
        if msg.contains(suppressed) {
            return;
        }
    }

    if level <= ffmpeg_next::ffi::AV_LOG_ERROR as std::ffi::c_int {
        tracing::error!(target: "ffmpeg", "{}", msg);
    } else if level <= ffmpeg_next::ffi::AV_LOG_WARNING as std::ffi::c_int {
        tracing::warn!(target: "ffmpeg", "{}", msg);
    } else {
        tracing::debug!(target: "ffmpeg", "{}", msg);
    }
}

/// Version string of the linked libavformat, for startup logs.
pub fn version_info() -> String {
    // SAFETY: `avformat_version` only reads a compile-time constant.
    let v = unsafe { ffmpeg_next::ffi::avformat_version() };
    format!("libavformat {}.{}.{}", v >> 16, (v >> 8) & 0xff, v & 0xff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        init().unwrap();
        init().unwrap();
    }

    #[test]
    fn test_version_info_names_libavformat() {
        assert!(version_info().starts_with("libavformat "));
    }
}
