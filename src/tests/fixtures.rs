//! Synthesized media files for end-to-end tests
//!
//! Encodes a moving luma ramp (or a flat grey still) with MPEG-4 Part 2 and a 440 Hz stereo tone
//! with AAC, both of which ship with every FFmpeg build.

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use ffmpeg_next::codec;
use ffmpeg_next::format::{self, Pixel, Sample};
use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::Rational;

use crate::ffmpeg_utils::helpers;

pub const AUDIO_SAMPLE_RATE: i32 = 44_100;

/// Display matrix rotating the picture 90° clockwise.
pub const ROTATE_90: [i32; 9] = [0, 65536, 0, -65536, 0, 0, 0, 0, 1 << 30];

/// Description of a file to synthesize.
#[derive(Debug, Clone)]
pub struct SyntheticMedia {
    pub file_name: &'static str,
    pub video: Option<(u32, u32)>,
    pub fps: i32,
    pub duration_secs: f64,
    pub audio: bool,
    pub display_matrix: Option<[i32; 9]>,
    /// Every frame flat mid grey instead of a moving ramp.
    pub still: bool,
}

impl SyntheticMedia {
    /// 64x48 video at 10 fps with a stereo AAC track.
    pub fn video_with_audio() -> Self {
        Self {
            file_name: "av.mp4",
            video: Some((64, 48)),
            fps: 10,
            duration_secs: 1.0,
            audio: true,
            display_matrix: None,
            still: false,
        }
    }

    /// 320x240 flat grey, no audio. Large enough for a readable overlay.
    pub fn grey_still() -> Self {
        Self {
            file_name: "grey.mp4",
            video: Some((320, 240)),
            audio: false,
            still: true,
            ..Self::video_with_audio()
        }
    }

    pub fn video_only() -> Self {
        Self {
            file_name: "silent.mp4",
            audio: false,
            ..Self::video_with_audio()
        }
    }

    pub fn audio_only() -> Self {
        Self {
            file_name: "tone.m4a",
            video: None,
            ..Self::video_with_audio()
        }
    }

    /// Landscape pixels displayed as portrait.
    pub fn rotated() -> Self {
        Self {
            file_name: "rotated.mp4",
            display_matrix: Some(ROTATE_90),
            ..Self::video_with_audio()
        }
    }

    /// Write the file into `dir` and return its path.
    pub fn write(&self, dir: &Path) -> PathBuf {
        let path = dir.join(self.file_name);
        let mut octx = format::output(&path).unwrap();
        let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

        let mut video = self
            .video
            .map(|(w, h)| self.add_video(&mut octx, w, h, global_header));
        let mut audio = if self.audio {
            Some(add_audio(&mut octx, global_header))
        } else {
            None
        };

        octx.write_header().unwrap();

        if let Some((encoder, index)) = video.as_mut() {
            let frames = (self.duration_secs * self.fps as f64).round() as i64;
            let enc_tb = Rational::new(1, self.fps);
            let (w, h) = (encoder.width(), encoder.height());
            for i in 0..frames {
                let mut frame = if self.still {
                    grey_frame(w, h)
                } else {
                    ramp_frame(w, h, i)
                };
                frame.set_pts(Some(i));
                encoder.send_frame(&frame).unwrap();
                drain(encoder, &mut octx, *index, enc_tb);
            }
            encoder.send_eof().unwrap();
            drain(encoder, &mut octx, *index, enc_tb);
        }

        if let Some((encoder, index)) = audio.as_mut() {
            let frame_size = match encoder.frame_size() {
                0 => 1024,
                n => n as usize,
            };
            let total = (self.duration_secs * AUDIO_SAMPLE_RATE as f64) as usize;
            let enc_tb = Rational::new(1, AUDIO_SAMPLE_RATE);
            let mut written = 0usize;
            while written + frame_size <= total {
                let frame = tone_frame(frame_size, written);
                encoder.send_frame(&frame).unwrap();
                drain_audio(encoder, &mut octx, *index, enc_tb);
                written += frame_size;
            }
            encoder.send_eof().unwrap();
            drain_audio(encoder, &mut octx, *index, enc_tb);
        }

        octx.write_trailer().unwrap();
        path
    }

    fn add_video(
        &self,
        octx: &mut format::context::Output,
        width: u32,
        height: u32,
        global_header: bool,
    ) -> (ffmpeg::encoder::Video, usize) {
        let codec = codec::encoder::find(codec::Id::MPEG4).unwrap();
        let mut video = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        video.set_width(width);
        video.set_height(height);
        video.set_format(Pixel::YUV420P);
        video.set_time_base(Rational::new(1, self.fps));
        video.set_frame_rate(Some(Rational::new(self.fps, 1)));
        video.set_bit_rate(400_000);
        if global_header {
            video.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let encoder = video.open_as(codec).unwrap();

        let mut ost = octx.add_stream(codec).unwrap();
        ost.set_parameters(&encoder);
        ost.set_time_base(Rational::new(1, self.fps));
        if let Some(matrix) = self.display_matrix {
            assert!(helpers::stream_set_display_matrix(&mut ost, matrix));
        }
        (encoder, ost.index())
    }
}

fn add_audio(octx: &mut format::context::Output, global_header: bool) -> (ffmpeg::encoder::Audio, usize) {
    let codec = codec::encoder::find(codec::Id::AAC).unwrap();
    let mut context = codec::Context::new_with_codec(codec);
    context.set_time_base(Rational::new(1, AUDIO_SAMPLE_RATE));
    let mut audio = context.encoder().audio().unwrap();
    audio.set_rate(AUDIO_SAMPLE_RATE);
    audio.set_format(Sample::F32(format::sample::Type::Planar));
    audio.set_channel_layout(ChannelLayout::STEREO);
    audio.set_bit_rate(96_000);
    if global_header {
        audio.set_flags(codec::Flags::GLOBAL_HEADER);
    }
    let encoder = audio.open_as(codec).unwrap();

    let mut ost = octx.add_stream(codec).unwrap();
    ost.set_parameters(&encoder);
    ost.set_time_base(Rational::new(1, AUDIO_SAMPLE_RATE));
    (encoder, ost.index())
}

/// Luma ramp shifted by `index` so consecutive frames differ.
fn ramp_frame(width: u32, height: u32, index: i64) -> ffmpeg::util::frame::Video {
    let mut frame = ffmpeg::util::frame::Video::new(Pixel::YUV420P, width, height);
    let stride = frame.stride(0);
    let luma = frame.data_mut(0);
    for y in 0..height as usize {
        for x in 0..width as usize {
            luma[y * stride + x] = ((x + y) as i64 * 3 + index * 8).rem_euclid(220) as u8 + 16;
        }
    }
    for plane in 1..3 {
        frame.data_mut(plane).fill(128);
    }
    frame
}

fn grey_frame(width: u32, height: u32) -> ffmpeg::util::frame::Video {
    let mut frame = ffmpeg::util::frame::Video::new(Pixel::YUV420P, width, height);
    for plane in 0..3 {
        frame.data_mut(plane).fill(128);
    }
    frame
}

fn tone_frame(samples: usize, offset: usize) -> ffmpeg::util::frame::Audio {
    let mut frame = ffmpeg::util::frame::Audio::new(
        Sample::F32(format::sample::Type::Planar),
        samples,
        ChannelLayout::STEREO,
    );
    frame.set_rate(AUDIO_SAMPLE_RATE as u32);
    frame.set_pts(Some(offset as i64));
    for ch in 0..2 {
        let plane = frame.data_mut(ch);
        for i in 0..samples {
            let t = (offset + i) as f32 / AUDIO_SAMPLE_RATE as f32;
            let v = (t * 440.0 * std::f32::consts::TAU).sin() * 0.4;
            plane[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
    }
    frame
}

fn drain(
    encoder: &mut ffmpeg::encoder::Video,
    octx: &mut format::context::Output,
    index: usize,
    enc_tb: Rational,
) {
    let out_tb = octx.stream(index).unwrap().time_base();
    let mut packet = ffmpeg::Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(index);
        packet.rescale_ts(enc_tb, out_tb);
        packet.write_interleaved(octx).unwrap();
    }
}

fn drain_audio(
    encoder: &mut ffmpeg::encoder::Audio,
    octx: &mut format::context::Output,
    index: usize,
    enc_tb: Rational,
) {
    let out_tb = octx.stream(index).unwrap().time_base();
    let mut packet = ffmpeg::Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(index);
        packet.rescale_ts(enc_tb, out_tb);
        packet.write_interleaved(octx).unwrap();
    }
}

/// Initialize FFmpeg and report whether the fixture encoders exist.
pub fn fixtures_available() -> bool {
    ffmpeg::init().unwrap();
    codec::encoder::find(codec::Id::MPEG4).is_some() && codec::encoder::find(codec::Id::AAC).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaAsset;

    #[test]
    fn test_synthesized_tracks() {
        if !fixtures_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();

        let av = MediaAsset::open(&SyntheticMedia::video_with_audio().write(dir.path())).unwrap();
        assert!(av.video_track().is_some());
        assert_eq!(av.audio_track().map(|t| t.sample_rate), Some(AUDIO_SAMPLE_RATE as u32));
        assert!((av.duration() - 1.0).abs() < 0.2);

        let tone = MediaAsset::open(&SyntheticMedia::audio_only().write(dir.path())).unwrap();
        assert!(tone.video_track().is_none());

        let rotated = MediaAsset::open(&SyntheticMedia::rotated().write(dir.path())).unwrap();
        assert_eq!(rotated.natural_size().width, 64);
        assert_eq!(rotated.render_size().width, 48);
        assert_eq!(rotated.render_size().height, 64);
    }
}
