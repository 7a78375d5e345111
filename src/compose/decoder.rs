//! Video decoder for the burn-in pipeline.

use crate::error::{FfmpegError, Result, SubburnError};
use crate::ffmpeg_utils::helpers;
use ffmpeg_next as ffmpeg;

/// Video decoder backed by a FFmpeg codec context
pub struct VideoDecoder {
    decoder: ffmpeg::decoder::Video,
    stream_index: usize,
}

impl VideoDecoder {
    /// Open a decoder from the stream's own codec parameters.
    pub fn open(stream: &ffmpeg::format::stream::Stream) -> Result<Self> {
        let stream_index = stream.index();
        let mut context =
            ffmpeg::codec::Context::from_parameters(stream.parameters()).map_err(|e| {
                SubburnError::Ffmpeg(FfmpegError::DecoderNotFound(format!(
                    "codec context for video stream {}: {}",
                    stream_index, e
                )))
            })?;
        helpers::codec_context_set_packet_time_base(&mut context, stream.time_base());

        let decoder = context.decoder().video().map_err(|e| {
            SubburnError::Ffmpeg(FfmpegError::DecoderNotFound(format!(
                "video decoder for stream {}: {}",
                stream_index, e
            )))
        })?;

        Ok(Self {
            decoder,
            stream_index,
        })
    }

    pub fn send_packet(&mut self, packet: &ffmpeg::codec::packet::Packet) -> Result<()> {
        self.decoder.send_packet(packet).map_err(|e| {
            SubburnError::Ffmpeg(FfmpegError::DecodePacket(format!(
                "send_packet on video stream {}: {}",
                self.stream_index, e
            )))
        })
    }

    pub fn send_eof(&mut self) -> Result<()> {
        match self.decoder.send_eof() {
            Ok(()) => Ok(()),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(()),
            Err(ffmpeg::Error::Eof) => Ok(()),
            Err(e) => Err(SubburnError::Ffmpeg(FfmpegError::DecodePacket(format!(
                "send_eof on video stream {}: {}",
                self.stream_index, e
            )))),
        }
    }

    /// Receive one decoded frame, or `None` if the decoder needs more input.
    pub fn receive_frame(&mut self) -> Result<Option<ffmpeg::util::frame::Video>> {
        let mut frame = ffmpeg::util::frame::Video::empty();
        match self.decoder.receive_frame(&mut frame) {
            Ok(()) => Ok(Some(frame)),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(None),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(SubburnError::Ffmpeg(FfmpegError::DecodePacket(format!(
                "receive_frame on video stream {}: {}",
                self.stream_index, e
            )))),
        }
    }
}
