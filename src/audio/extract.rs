//! Whole-track audio extraction to a speech WAV file.

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;

use crate::audio::decoder::AudioDecoder;
use crate::audio::resampler::PcmResampler;
use crate::error::{FfmpegError, Result, SubburnError};
use crate::media::MediaAsset;
use crate::output::{remove_existing, write_atomic};
use crate::wav::{self, PcmFormat};

/// Force a `.wav` extension, replacing any existing one.
pub fn wav_output_path(output_path: &Path) -> PathBuf {
    let mut path = output_path.to_path_buf();
    path.set_extension("wav");
    path
}

/// Decode the first audio track of `video_path` to 16 kHz mono s16le and
/// write it as a WAV file next to `output_path`. Returns the path written.
pub fn extract_audio(video_path: &Path, output_path: &Path) -> Result<PathBuf> {
    let wav_path = wav_output_path(output_path);

    let mut asset = MediaAsset::open(video_path)?;
    let track = asset.audio_track().ok_or(SubburnError::NoAudioTrack)?;
    track.ensure_decodable()?;
    let stream_index = track.stream_index;

    let started = std::time::Instant::now();
    let pcm = decode_track(&mut asset, stream_index)?;

    let format = PcmFormat::SPEECH;
    let bytes = wav::encode(
        &pcm,
        format.sample_rate,
        format.channels,
        format.bits_per_sample,
    )?;

    remove_existing(&wav_path)?;
    write_atomic(&wav_path, &bytes)?;

    tracing::info!(
        input = %video_path.display(),
        output = %wav_path.display(),
        pcm_bytes = pcm.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "audio extracted"
    );

    Ok(wav_path)
}

/// Decode every packet of `stream_index` and return the resampled PCM.
fn decode_track(asset: &mut MediaAsset, stream_index: usize) -> Result<Vec<u8>> {
    let input = asset.input_mut();
    let mut decoder = {
        let stream = input.stream(stream_index).ok_or_else(|| {
            SubburnError::Decode(format!("audio stream {} disappeared", stream_index))
        })?;
        AudioDecoder::open(&stream)?
    };

    let mut resampler: Option<PcmResampler> = None;
    let mut pcm = Vec::new();

    loop {
        let mut packet = ffmpeg::codec::packet::Packet::empty();
        match packet.read(input) {
            Ok(()) => {}
            Err(ffmpeg::Error::Eof) => break,
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => continue,
            Err(e) => {
                return Err(SubburnError::Ffmpeg(FfmpegError::ReadFrame(format!(
                    "reading audio stream {}: {}",
                    stream_index, e
                ))))
            }
        }
        if packet.stream() != stream_index {
            continue;
        }

        decoder.send_packet(&packet)?;
        drain_decoder(&mut decoder, &mut resampler, &mut pcm)?;
    }

    decoder.send_eof()?;
    drain_decoder(&mut decoder, &mut resampler, &mut pcm)?;

    if let Some(rsmp) = resampler.as_mut() {
        rsmp.flush_into(&mut pcm)?;
    }

    Ok(pcm)
}

fn drain_decoder(
    decoder: &mut AudioDecoder,
    resampler: &mut Option<PcmResampler>,
    pcm: &mut Vec<u8>,
) -> Result<()> {
    while let Some(frame) = decoder.receive_frame()? {
        if resampler.is_none() {
            tracing::debug!(
                sample_rate = frame.rate(),
                channels = frame.channels(),
                format = ?frame.format(),
                "creating resampler from first frame"
            );
            *resampler = Some(PcmResampler::new(&frame)?);
        }
        if let Some(rsmp) = resampler.as_mut() {
            rsmp.convert_into(&frame, pcm)?;
        }
    }
    Ok(())
}
