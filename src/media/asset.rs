use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use ffmpeg_next::Rescale;

use crate::error::{Result, SubburnError};
use crate::ffmpeg_utils::helpers;
use crate::media::transform::{DisplayTransform, Size};

/// Kind of an elementary stream we care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// One usable track of a [`MediaAsset`], identified by its container stream.
#[derive(Debug, Clone)]
pub struct Track {
    pub kind: TrackKind,
    pub stream_index: usize,
    pub codec_id: ffmpeg::codec::Id,
    pub time_base: ffmpeg::Rational,
    /// First timestamp in `time_base` units, 0 when unknown
    pub start_time: i64,
    /// Average frame rate (video only, may be 0/0)
    pub frame_rate: ffmpeg::Rational,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Track {
    /// Fail with `UnsupportedFormat` if this FFmpeg build cannot decode the track.
    pub fn ensure_decodable(&self) -> Result<()> {
        if helpers::decoder_exists(self.codec_id) {
            Ok(())
        } else {
            Err(SubburnError::UnsupportedFormat(format!(
                "no decoder for {:?} stream {}",
                self.codec_id, self.stream_index
            )))
        }
    }
}

/// An opened source file.
///
/// Holds the demuxer for the lifetime of one extraction or merge request.
/// Track metadata is read once on open and never changes.
pub struct MediaAsset {
    path: PathBuf,
    input: ffmpeg::format::context::Input,
    duration_us: i64,
    tracks: Vec<Track>,
    natural_size: Size,
    transform: DisplayTransform,
}

impl MediaAsset {
    /// Open `path` and read its track layout.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SubburnError::NoSuchFile(path.display().to_string()));
        }

        let input = ffmpeg::format::input(&path).map_err(|e| {
            SubburnError::UnsupportedFormat(format!("{}: {}", path.display(), e))
        })?;

        let mut tracks = Vec::new();
        let mut natural_size = Size::new(0, 0);
        let mut transform = DisplayTransform::IDENTITY;
        let mut longest_stream_us = 0i64;

        for stream in input.streams() {
            let params = stream.parameters();
            let time_base = stream.time_base();

            if stream.duration() > 0 && time_base.denominator() != 0 {
                let us = stream.duration().rescale(time_base, ffmpeg::Rational(1, 1_000_000));
                longest_stream_us = longest_stream_us.max(us);
            }

            let kind = match params.medium() {
                ffmpeg::media::Type::Video => {
                    // Cover art is muxed as a one-frame video stream
                    if stream
                        .disposition()
                        .contains(ffmpeg::format::stream::Disposition::ATTACHED_PIC)
                    {
                        continue;
                    }
                    TrackKind::Video
                }
                ffmpeg::media::Type::Audio => TrackKind::Audio,
                _ => continue,
            };

            if kind == TrackKind::Video && !tracks.iter().any(|t: &Track| t.kind == TrackKind::Video) {
                natural_size = Size::new(
                    helpers::codec_params_width(&params),
                    helpers::codec_params_height(&params),
                );
                if let Some(matrix) = helpers::stream_display_matrix(&stream) {
                    transform = DisplayTransform::from_display_matrix(&matrix);
                }
            }

            let start_time = match stream.start_time() {
                ts if ts == ffmpeg::ffi::AV_NOPTS_VALUE => 0,
                ts => ts,
            };

            tracks.push(Track {
                kind,
                stream_index: stream.index(),
                codec_id: params.id(),
                time_base,
                start_time,
                frame_rate: stream.avg_frame_rate(),
                sample_rate: helpers::codec_params_sample_rate(&params),
                channels: helpers::codec_params_channels(&params),
            });
        }

        let duration_us = if input.duration() > 0 {
            input.duration()
        } else {
            longest_stream_us
        };

        tracing::debug!(
            path = %path.display(),
            tracks = tracks.len(),
            duration_us,
            width = natural_size.width,
            height = natural_size.height,
            "opened media asset"
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            duration_us,
            tracks,
            natural_size,
            transform,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First video track, if any.
    pub fn video_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Video)
    }

    /// First audio track, if any.
    pub fn audio_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Audio)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration_us as f64 / 1_000_000.0
    }

    /// Duration in microseconds.
    pub fn duration_us(&self) -> i64 {
        self.duration_us
    }

    /// Coded size of the video track, before the display transform.
    pub fn natural_size(&self) -> Size {
        self.natural_size
    }

    pub fn display_transform(&self) -> DisplayTransform {
        self.transform
    }

    /// Size the video is displayed at; all overlay layout uses this.
    pub fn render_size(&self) -> Size {
        self.transform.apply(self.natural_size)
    }

    /// Demuxer access for pipelines that read packets.
    pub fn input_mut(&mut self) -> &mut ffmpeg::format::context::Input {
        &mut self.input
    }

    pub fn input(&self) -> &ffmpeg::format::context::Input {
        &self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_no_such_file() {
        ffmpeg::init().unwrap();
        let err = MediaAsset::open(Path::new("/nonexistent/clip.mp4")).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::NoSuchFile);
    }

    #[test]
    fn test_garbage_file_is_unsupported() {
        ffmpeg::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.mp4");
        std::fs::write(&path, b"definitely not a movie").unwrap();

        let err = MediaAsset::open(&path).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedFormat);
    }
}
