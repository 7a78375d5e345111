//! Audio decoder
//!
//! Wraps an FFmpeg `AVCodecContext` that turns compressed audio packets
//! (AAC, MP3, Opus, AC-3, …) into raw PCM frames.

use crate::error::{FfmpegError, Result, SubburnError};
use ffmpeg_next as ffmpeg;

/// Audio decoder backed by a FFmpeg codec context
pub struct AudioDecoder {
    decoder: ffmpeg::decoder::Audio,
    stream_index: usize,
}

impl AudioDecoder {
    /// Open a decoder from the stream's own codec parameters.
    pub fn open(stream: &ffmpeg::format::stream::Stream) -> Result<Self> {
        let stream_index = stream.index();
        let context =
            ffmpeg::codec::Context::from_parameters(stream.parameters()).map_err(|e| {
                SubburnError::Ffmpeg(FfmpegError::DecoderNotFound(format!(
                    "codec context for audio stream {}: {}",
                    stream_index, e
                )))
            })?;

        let decoder = context.decoder().audio().map_err(|e| {
            SubburnError::Ffmpeg(FfmpegError::DecoderNotFound(format!(
                "audio decoder for stream {}: {}",
                stream_index, e
            )))
        })?;

        Ok(Self {
            decoder,
            stream_index,
        })
    }

    /// Send a compressed packet to the decoder.
    ///
    /// Unlike a seeking segmenter, whole-file extraction has no pre-roll, so
    /// every rejected packet is a real decode failure.
    pub fn send_packet(&mut self, packet: &ffmpeg::codec::packet::Packet) -> Result<()> {
        self.decoder.send_packet(packet).map_err(|e| {
            SubburnError::Ffmpeg(FfmpegError::DecodePacket(format!(
                "send_packet on audio stream {}: {}",
                self.stream_index, e
            )))
        })
    }

    /// Send EOF to flush the decoder's internal buffers.
    ///
    /// EAGAIN and EOF mean the decoder has nothing buffered or is already
    /// drained.
    pub fn send_eof(&mut self) -> Result<()> {
        match self.decoder.send_eof() {
            Ok(()) => Ok(()),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(()),
            Err(ffmpeg::Error::Eof) => Ok(()),
            Err(e) => Err(SubburnError::Ffmpeg(FfmpegError::DecodePacket(format!(
                "send_eof on audio stream {}: {}",
                self.stream_index, e
            )))),
        }
    }

    /// Receive one decoded frame, or `None` if the decoder needs more input.
    pub fn receive_frame(&mut self) -> Result<Option<ffmpeg::util::frame::Audio>> {
        let mut frame = ffmpeg::util::frame::Audio::empty();
        match self.decoder.receive_frame(&mut frame) {
            Ok(()) => Ok(Some(frame)),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(None),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(SubburnError::Ffmpeg(FfmpegError::DecodePacket(format!(
                "receive_frame on audio stream {}: {}",
                self.stream_index, e
            )))),
        }
    }
}
