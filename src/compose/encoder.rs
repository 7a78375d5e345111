//! Output video encoder selection.
//!
//! Tries libx264 with CRF and preset first, then whatever H.264 encoder the
//! FFmpeg build has, then MPEG-4 Part 2. The last two run at a fixed bitrate.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::codec;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::Rational;

use crate::config::ExportConfig;
use crate::error::{FfmpegError, Result, SubburnError};
use crate::media::Size;

/// Pixel format fed to every encoder.
pub const OUTPUT_PIXEL_FORMAT: Pixel = Pixel::YUV420P;

/// MPEG-4 Part 2 cannot express time base denominators above this.
const MAX_MPEG4_TIME_BASE_DEN: i32 = 65_535;

/// Everything the encoder needs to know about the stream it produces.
#[derive(Debug, Clone, Copy)]
pub struct VideoEncoderSettings {
    pub size: Size,
    pub time_base: Rational,
    pub frame_rate: Rational,
    /// Set when the muxer wants codec extradata in the container header.
    pub global_header: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    X264,
    AnyH264,
    Mpeg4,
}

impl Candidate {
    const ALL: [Candidate; 3] = [Candidate::X264, Candidate::AnyH264, Candidate::Mpeg4];

    fn find(&self) -> Option<ffmpeg::Codec> {
        match self {
            Candidate::X264 => codec::encoder::find_by_name("libx264"),
            Candidate::AnyH264 => codec::encoder::find(codec::Id::H264),
            Candidate::Mpeg4 => codec::encoder::find(codec::Id::MPEG4),
        }
    }

    fn uses_crf(&self) -> bool {
        matches!(self, Candidate::X264)
    }
}

/// An opened encoder plus what was picked.
pub struct OpenedEncoder {
    pub encoder: ffmpeg::encoder::Video,
    pub codec: ffmpeg::Codec,
    pub time_base: Rational,
}

impl OpenedEncoder {
    pub fn name(&self) -> &str {
        self.codec.name()
    }
}

/// Open the best available video encoder for `settings`.
pub fn open_video_encoder(settings: &VideoEncoderSettings, config: &ExportConfig) -> Result<OpenedEncoder> {
    let mut tried: Vec<String> = Vec::new();
    let mut last_error: Option<ffmpeg::Error> = None;

    for candidate in Candidate::ALL {
        let Some(codec) = candidate.find() else {
            continue;
        };
        let name = codec.name().to_string();
        if tried.contains(&name) {
            continue;
        }

        let time_base = match candidate {
            Candidate::Mpeg4 => mpeg4_time_base(settings.time_base),
            _ => settings.time_base,
        };

        match try_open(codec, candidate, settings, time_base, config) {
            Ok(encoder) => {
                tracing::info!(
                    encoder = %name,
                    width = settings.size.width,
                    height = settings.size.height,
                    time_base = %time_base,
                    "opened video encoder"
                );
                return Ok(OpenedEncoder {
                    encoder,
                    codec,
                    time_base,
                });
            }
            Err(e) => {
                tracing::warn!(encoder = %name, error = %e, "video encoder failed to open, trying next");
                last_error = Some(e);
            }
        }
        tried.push(name);
    }

    Err(match last_error {
        Some(e) => SubburnError::Ffmpeg(FfmpegError::EncoderCreate(format!(
            "no usable video encoder (tried {}): {}",
            tried.join(", "),
            e
        ))),
        None => SubburnError::Ffmpeg(FfmpegError::EncoderNotFound(
            "no H.264 or MPEG-4 encoder in this FFmpeg build".to_string(),
        )),
    })
}

fn try_open(
    codec: ffmpeg::Codec,
    candidate: Candidate,
    settings: &VideoEncoderSettings,
    time_base: Rational,
    config: &ExportConfig,
) -> std::result::Result<ffmpeg::encoder::Video, ffmpeg::Error> {
    let mut video = codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()?;

    video.set_width(settings.size.width);
    video.set_height(settings.size.height);
    video.set_format(OUTPUT_PIXEL_FORMAT);
    video.set_time_base(time_base);
    video.set_frame_rate(Some(settings.frame_rate));
    video.set_aspect_ratio(Rational::new(1, 1));
    if settings.global_header {
        video.set_flags(codec::Flags::GLOBAL_HEADER);
    }

    let mut options = ffmpeg::Dictionary::new();
    if candidate.uses_crf() {
        options.set("crf", &config.crf.to_string());
        options.set("preset", &config.preset);
        video.set_bit_rate(0);
    } else {
        video.set_bit_rate(config.fallback_bitrate);
        video.set_max_bit_rate(config.fallback_bitrate * 2);
    }

    video.open_as_with(codec, options)
}

/// A time base MPEG-4 Part 2 accepts; finer ones are replaced by milliseconds.
fn mpeg4_time_base(source: Rational) -> Rational {
    if source.numerator() > 0 && source.denominator() > 0 && source.denominator() <= MAX_MPEG4_TIME_BASE_DEN {
        source
    } else {
        Rational::new(1, 1000)
    }
}

/// Whether any supported encoder exists in this FFmpeg build.
pub fn encoder_available() -> bool {
    Candidate::ALL.iter().any(|c| c.find().is_some())
}
