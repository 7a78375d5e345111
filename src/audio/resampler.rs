//! Audio resampler
//!
//! Converts decoded PCM frames of any layout/rate/format to the packed
//! signed 16-bit mono 16 kHz stream written into the WAV file.

use crate::error::{FfmpegError, Result, SubburnError};
use crate::ffmpeg_utils::helpers;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::software::resampling;
use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::util::format::sample::{Sample, Type};

/// Target sample rate for transcription audio
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
/// Target channel layout
pub const TARGET_CHANNEL_LAYOUT: ChannelLayout = ChannelLayout::MONO;
/// Packed signed 16-bit, little-endian on every platform FFmpeg supports here
pub const TARGET_SAMPLE_FORMAT: Sample = Sample::I16(Type::Packed);

/// Resampler wrapping FFmpeg's `SwrContext`
pub struct PcmResampler {
    context: resampling::Context,
}

impl PcmResampler {
    /// Create a resampler for frames shaped like `src_frame`.
    pub fn new(src_frame: &ffmpeg::util::frame::Audio) -> Result<Self> {
        let src_layout = if src_frame.channel_layout().bits() == 0 {
            // No channel layout set; fall back based on channel count
            match src_frame.channels() {
                1 => ChannelLayout::MONO,
                n => ChannelLayout::default(n as i32),
            }
        } else {
            src_frame.channel_layout()
        };

        let context = resampling::Context::get(
            src_frame.format(),
            src_layout,
            src_frame.rate(),
            TARGET_SAMPLE_FORMAT,
            TARGET_CHANNEL_LAYOUT,
            TARGET_SAMPLE_RATE,
        )
        .map_err(|e| {
            SubburnError::Ffmpeg(FfmpegError::ResamplerCreate(format!(
                "{:?}/{}Hz/{}ch -> s16/16000Hz/mono: {}",
                src_frame.format(),
                src_frame.rate(),
                src_frame.channels(),
                e
            )))
        })?;

        Ok(Self { context })
    }

    /// Convert one decoded frame and append the resulting PCM bytes to `out`.
    pub fn convert_into(
        &mut self,
        frame: &ffmpeg::util::frame::Audio,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        // The output frame must be empty; swr allocates it from the context config.
        let mut converted = ffmpeg::util::frame::Audio::empty();
        self.context.run(frame, &mut converted).map_err(|e| {
            SubburnError::Ffmpeg(FfmpegError::Resample(e.to_string()))
        })?;

        if converted.samples() > 0 {
            out.extend_from_slice(helpers::packed_audio_bytes(&converted));
        }
        Ok(())
    }

    /// Drain samples still buffered in the resampler into `out`.
    ///
    /// The flush frame is allocated up front because swr refuses to fill an
    /// unconfigured frame. A passthrough context has nothing buffered.
    pub fn flush_into(&mut self, out: &mut Vec<u8>) -> Result<()> {
        loop {
            let pending = self
                .context
                .delay()
                .map(|d| d.output.max(0) as usize)
                .unwrap_or(0);
            if pending == 0 {
                return Ok(());
            }

            let mut converted =
                ffmpeg::util::frame::Audio::new(TARGET_SAMPLE_FORMAT, pending + 32, TARGET_CHANNEL_LAYOUT);
            if let Err(e) = self.context.flush(&mut converted) {
                tracing::debug!("resampler flush returned non-fatal error: {}", e);
                return Ok(());
            }
            if converted.samples() == 0 {
                return Ok(());
            }
            out.extend_from_slice(helpers::packed_audio_bytes(&converted));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_format_is_speech_pcm() {
        assert_eq!(TARGET_SAMPLE_RATE, crate::wav::PcmFormat::SPEECH.sample_rate);
        assert_eq!(TARGET_SAMPLE_FORMAT.bytes() * 8, 16);
        assert!(!TARGET_SAMPLE_FORMAT.is_planar());
    }

    #[test]
    fn test_downmix_stereo_48k_to_mono_16k() {
        ffmpeg::init().unwrap();
        let mut frame = ffmpeg::util::frame::Audio::new(
            Sample::I16(Type::Packed),
            4800,
            ChannelLayout::STEREO,
        );
        frame.set_rate(48_000);
        frame.data_mut(0).fill(0);

        let mut resampler = PcmResampler::new(&frame).unwrap();
        let mut pcm = Vec::new();
        resampler.convert_into(&frame, &mut pcm).unwrap();
        resampler.flush_into(&mut pcm).unwrap();

        // 0.1 s of audio at 16 kHz, 2 bytes per sample, give or take filter delay
        assert!(pcm.len() % 2 == 0);
        assert!(pcm.len() > 2_800 && pcm.len() <= 3_400, "got {}", pcm.len());
        assert!(pcm.iter().all(|b| *b == 0));
    }
}
