use serde::Serialize;
use thiserror::Error;

/// Failure categories surfaced across the request boundary.
///
/// Every [`SubburnError`] maps onto exactly one kind, and every kind has a
/// stable wire code that callers can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidArguments,
    NoSuchFile,
    UnsupportedFormat,
    NoVideoTrack,
    NoAudioTrack,
    DecodeError,
    CompositionError,
    ExportFailed,
    ExportCancelled,
    ExportUnknown,
    ExportBusy,
    Io,
}

impl ErrorKind {
    /// Stable error code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArguments => "INVALID_ARGS",
            ErrorKind::NoSuchFile => "NO_SUCH_FILE",
            ErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorKind::NoVideoTrack => "NO_VIDEO",
            ErrorKind::NoAudioTrack => "NO_AUDIO",
            ErrorKind::DecodeError => "DECODE_ERROR",
            ErrorKind::CompositionError => "COMPOSITION_ERROR",
            ErrorKind::ExportFailed => "EXPORT_FAILED",
            ErrorKind::ExportCancelled => "EXPORT_CANCELLED",
            ErrorKind::ExportUnknown => "EXPORT_UNKNOWN",
            ErrorKind::ExportBusy => "EXPORT_BUSY",
            ErrorKind::Io => "IO_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Main error type for subtitle burn-in and audio extraction
#[derive(Error, Debug)]
pub enum SubburnError {
    /// An error originating from the underlying FFmpeg library
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] FfmpegError),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was missing a field or carried an invalid value
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The input path does not exist
    #[error("No such file: {0}")]
    NoSuchFile(String),

    /// The input exists but could not be opened as a media container
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The media file does not contain a video track
    #[error("No video track found in source file")]
    NoVideoTrack,

    /// The media file does not contain an audio track
    #[error("No audio track found in source file")]
    NoAudioTrack,

    /// Reading or decoding samples failed
    #[error("Decode error: {0}")]
    Decode(String),

    /// The output timeline or overlay pass could not be assembled
    #[error("Composition error: {0}")]
    Composition(String),

    /// The export backend failed; message passed through
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// The export was cancelled before it finished
    #[error("Export cancelled")]
    Cancelled,

    /// The export ended in a state the controller does not recognize
    #[error("Export ended in an unknown state: {0}")]
    ExportUnknown(String),

    /// Another export job is already running on this controller
    #[error("An export job is already running: {0}")]
    JobAlreadyRunning(String),
}

impl SubburnError {
    /// Classify this error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubburnError::Ffmpeg(e) => e.kind(),
            SubburnError::Io(_) => ErrorKind::Io,
            SubburnError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            SubburnError::NoSuchFile(_) => ErrorKind::NoSuchFile,
            SubburnError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            SubburnError::NoVideoTrack => ErrorKind::NoVideoTrack,
            SubburnError::NoAudioTrack => ErrorKind::NoAudioTrack,
            SubburnError::Decode(_) => ErrorKind::DecodeError,
            SubburnError::Composition(_) => ErrorKind::CompositionError,
            SubburnError::ExportFailed(_) => ErrorKind::ExportFailed,
            SubburnError::Cancelled => ErrorKind::ExportCancelled,
            SubburnError::ExportUnknown(_) => ErrorKind::ExportUnknown,
            SubburnError::JobAlreadyRunning(_) => ErrorKind::ExportBusy,
        }
    }

    /// Wire code for this error, shorthand for `self.kind().code()`.
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

/// FFmpeg-specific errors
#[derive(Error, Debug)]
pub enum FfmpegError {
    /// Failure during global FFmpeg initialization
    #[error("FFmpeg initialization failed: {0}")]
    InitFailed(String),

    /// Failure opening an input media file
    #[error("Failed to open input file: {0}")]
    OpenInput(String),

    /// The requested decoder for a specific codec ID was not found
    #[error("Failed to find decoder: {0}")]
    DecoderNotFound(String),

    /// No usable encoder for the output video stream
    #[error("Failed to find encoder: {0}")]
    EncoderNotFound(String),

    /// Failure opening or configuring an encoder
    #[error("Failed to create encoder: {0}")]
    EncoderCreate(String),

    /// Failure creating an audio resampler
    #[error("Failed to create resampler: {0}")]
    ResamplerCreate(String),

    /// Failure creating a pixel format converter
    #[error("Failed to create scaler: {0}")]
    ScalerCreate(String),

    /// Failure creating an output format muxer
    #[error("Failed to create muxer: {0}")]
    MuxerCreate(String),

    /// Failure writing the container header
    #[error("Failed to write header: {0}")]
    WriteHeader(String),

    /// Failure writing a media packet to the container
    #[error("Failed to write packet: {0}")]
    WritePacket(String),

    /// Failure writing the container trailer
    #[error("Failed to write trailer: {0}")]
    WriteTrailer(String),

    /// Failure decoding a single packet into a frame
    #[error("Failed to decode packet: {0}")]
    DecodePacket(String),

    /// Failure encoding a single frame into a packet
    #[error("Failed to encode frame: {0}")]
    EncodeFrame(String),

    /// Failure reading a packet from the input context
    #[error("Failed to read frame: {0}")]
    ReadFrame(String),

    /// Failure converting decoded samples to the target layout
    #[error("Resampling failed: {0}")]
    Resample(String),

    /// Failure converting pixels between formats
    #[error("Conversion failed: {0}")]
    Convert(String),
}

impl FfmpegError {
    /// Reader and decoder failures are decode errors; output setup failures
    /// mean the timeline could not be assembled; anything raised while
    /// producing output is an export failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FfmpegError::OpenInput(_) => ErrorKind::UnsupportedFormat,
            FfmpegError::InitFailed(_)
            | FfmpegError::DecoderNotFound(_)
            | FfmpegError::ResamplerCreate(_)
            | FfmpegError::Resample(_)
            | FfmpegError::DecodePacket(_)
            | FfmpegError::ReadFrame(_) => ErrorKind::DecodeError,
            FfmpegError::EncoderNotFound(_)
            | FfmpegError::EncoderCreate(_)
            | FfmpegError::ScalerCreate(_)
            | FfmpegError::MuxerCreate(_) => ErrorKind::CompositionError,
            FfmpegError::WriteHeader(_)
            | FfmpegError::WritePacket(_)
            | FfmpegError::WriteTrailer(_)
            | FfmpegError::EncodeFrame(_)
            | FfmpegError::Convert(_) => ErrorKind::ExportFailed,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SubburnError>;
