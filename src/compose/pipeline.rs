//! Burn-in export backed by FFmpeg.
//!
//! One pass over the source: video packets are decoded, converted to RGBA,
//! turned upright, overlaid with the visible subtitle sprites, converted to
//! 4:2:0 and re-encoded. Audio packets are copied into the output unchanged.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::Video as VideoFrame;
use ffmpeg_next::{codec, Rational, Rescale};

use crate::compose::compositor::Compositor;
use crate::compose::decoder::VideoDecoder;
use crate::compose::encoder::{self, VideoEncoderSettings, OUTPUT_PIXEL_FORMAT};
use crate::compose::frame;
use crate::config::ExportConfig;
use crate::error::{FfmpegError, Result, SubburnError};
use crate::export::{ExportBackend, ExportContext, ExportRequest};
use crate::ffmpeg_utils::helpers;
use crate::media::{MediaAsset, Orientation, Size, Track};
use crate::output::{remove_existing, remove_partial};
use crate::subtitle::{layout, rasterize, FontResolver};

/// Container used when the output path has no extension.
const DEFAULT_CONTAINER: &str = "mp4";

/// Exports by decoding and re-encoding the video track in-process.
pub struct FfmpegExportBackend {
    config: ExportConfig,
    fonts: Arc<FontResolver>,
}

struct ExportStats {
    encoder: String,
    frames: u64,
    overlays: usize,
    audio_packets: u64,
}

impl FfmpegExportBackend {
    pub fn new(config: ExportConfig, fonts: Arc<FontResolver>) -> Self {
        Self { config, fonts }
    }

    fn export(&self, request: &ExportRequest, ctx: &ExportContext) -> Result<ExportStats> {
        let mut asset = MediaAsset::open(&request.video_path)?;
        let video = asset.video_track().cloned().ok_or(SubburnError::NoVideoTrack)?;
        video.ensure_decodable()?;
        let audio = asset.audio_track().cloned();
        let duration = asset.duration();

        let natural = asset.natural_size();
        if natural.width == 0 || natural.height == 0 {
            return Err(SubburnError::Decode("video track reports no dimensions".to_string()));
        }
        let transform = asset.display_transform();
        let (orientation, canvas) = match transform.orientation() {
            Some(orientation) => (orientation, asset.render_size()),
            None => {
                tracing::warn!(?transform, "display matrix is not axis-aligned, ignoring it");
                (Orientation::Normal, natural)
            }
        };
        let output_size = canvas.even();

        ctx.check_cancelled()?;
        let compositor = self.build_overlays(request, canvas, duration)?;
        ctx.check_cancelled()?;

        let mut octx = open_output(&request.output_path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let frame_rate = if video.frame_rate.numerator() > 0 && video.frame_rate.denominator() > 0 {
            video.frame_rate
        } else {
            Rational::new(self.config.default_frame_rate.max(1) as i32, 1)
        };
        let opened = encoder::open_video_encoder(
            &VideoEncoderSettings {
                size: output_size,
                time_base: video.time_base,
                frame_rate,
                global_header,
            },
            &self.config,
        )?;
        let encoder_name = opened.name().to_string();

        let video_out_index = {
            let mut ost = octx.add_stream(opened.codec).map_err(|e| {
                SubburnError::Ffmpeg(FfmpegError::MuxerCreate(format!("add video stream: {}", e)))
            })?;
            ost.set_parameters(&opened.encoder);
            ost.set_time_base(opened.time_base);
            ost.index()
        };

        let mut audio_copy = match &audio {
            Some(track) => Some(AudioCopy::add(&asset, track, &video, &mut octx)?),
            None => None,
        };

        write_header(&mut octx)?;

        let video_out_time_base = stream_time_base(&octx, video_out_index)?;
        if let Some(copy) = audio_copy.as_mut() {
            copy.out_time_base = stream_time_base(&octx, copy.out_index)?;
        }

        let decoder = {
            let stream = asset.input().stream(video.stream_index).ok_or_else(|| {
                SubburnError::Decode(format!("video stream {} disappeared", video.stream_index))
            })?;
            VideoDecoder::open(&stream)?
        };

        let mut stage = VideoStage {
            decoder,
            encoder: opened.encoder,
            encoder_time_base: opened.time_base,
            out_index: video_out_index,
            out_time_base: video_out_time_base,
            in_time_base: video.time_base,
            start_time: video.start_time,
            frame_step: 1i64.rescale(frame_rate.invert(), opened.time_base).max(1),
            orientation,
            compositor: &compositor,
            natural,
            output_size,
            to_rgba: None,
            to_output: None,
            canvas_frame: frame::new_rgba_frame(canvas.width, canvas.height),
            last_pts: None,
            duration,
            frames: 0,
        };

        let input = asset.input_mut();
        let mut audio_packets = 0u64;
        loop {
            ctx.check_cancelled()?;
            let mut packet = ffmpeg::codec::packet::Packet::empty();
            match packet.read(input) {
                Ok(()) => {}
                Err(ffmpeg::Error::Eof) => break,
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => continue,
                Err(e) => {
                    return Err(SubburnError::Ffmpeg(FfmpegError::ReadFrame(format!(
                        "reading {}: {}",
                        request.video_path.display(),
                        e
                    ))))
                }
            }

            if packet.stream() == video.stream_index {
                stage.decoder.send_packet(&packet)?;
                stage.drain_decoder(&mut octx, ctx)?;
            } else if let Some(copy) = audio_copy.as_ref().filter(|c| c.in_index == packet.stream()) {
                copy.write(packet, &mut octx)?;
                audio_packets += 1;
            }
        }

        stage.decoder.send_eof()?;
        stage.drain_decoder(&mut octx, ctx)?;
        stage.flush_encoder(&mut octx)?;

        octx.write_trailer().map_err(|e| {
            SubburnError::Ffmpeg(FfmpegError::WriteTrailer(e.to_string()))
        })?;

        Ok(ExportStats {
            encoder: encoder_name,
            frames: stage.frames,
            overlays: compositor.len(),
            audio_packets,
        })
    }

    /// Lay out and rasterize every cue that can ever be visible.
    fn build_overlays(&self, request: &ExportRequest, canvas: Size, duration: f64) -> Result<Compositor> {
        if request.cues.is_empty() {
            return Ok(Compositor::default());
        }
        let face = self
            .fonts
            .resolve(&request.style.font_family, request.style.bold)?;
        let layers = layout::build(&request.cues, &request.style, canvas, duration, face.as_ref());
        let sprites = layers
            .iter()
            .filter(|layer| !layer.schedule.is_never_visible())
            .map(|layer| rasterize(layer, &request.style, &face, canvas))
            .collect();
        let compositor = Compositor::new(sprites);
        tracing::debug!(
            cues = request.cues.len(),
            visible = compositor.len(),
            font = %face.path().display(),
            default_font = request.style.uses_default_font(),
            "overlays rasterized"
        );
        Ok(compositor)
    }
}

impl ExportBackend for FfmpegExportBackend {
    fn render(&self, request: &ExportRequest, ctx: &ExportContext) -> Result<PathBuf> {
        let started = Instant::now();
        remove_existing(&request.output_path)?;

        match self.export(request, ctx) {
            Ok(stats) => {
                tracing::info!(
                    output = %request.output_path.display(),
                    encoder = %stats.encoder,
                    frames = stats.frames,
                    overlays = stats.overlays,
                    audio_packets = stats.audio_packets,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "burn-in export finished"
                );
                Ok(request.output_path.clone())
            }
            Err(e) => {
                remove_partial(&request.output_path);
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Decode → RGBA → orient → overlay → YUV → encode for one video stream.
struct VideoStage<'a> {
    decoder: VideoDecoder,
    encoder: ffmpeg::encoder::Video,
    encoder_time_base: Rational,
    out_index: usize,
    out_time_base: Rational,
    in_time_base: Rational,
    start_time: i64,
    /// One frame interval in encoder time base units
    frame_step: i64,
    orientation: Orientation,
    compositor: &'a Compositor,
    natural: Size,
    output_size: Size,
    to_rgba: Option<InputScaler>,
    to_output: Option<scaling::Context>,
    canvas_frame: VideoFrame,
    last_pts: Option<i64>,
    duration: f64,
    frames: u64,
}

/// RGBA converter for decoded frames, rebuilt if the decoder's output changes.
struct InputScaler {
    format: Pixel,
    width: u32,
    height: u32,
    context: scaling::Context,
}

impl VideoStage<'_> {
    fn drain_decoder(&mut self, octx: &mut ffmpeg::format::context::Output, ctx: &ExportContext) -> Result<()> {
        while let Some(decoded) = self.decoder.receive_frame()? {
            ctx.check_cancelled()?;
            self.process(&decoded, octx, ctx)?;
        }
        Ok(())
    }

    fn process(
        &mut self,
        decoded: &VideoFrame,
        octx: &mut ffmpeg::format::context::Output,
        ctx: &ExportContext,
    ) -> Result<()> {
        let pts = self.next_pts(decoded);
        let seconds = pts as f64 * f64::from(self.encoder_time_base);
        let t = if self.duration > 0.0 {
            seconds / self.duration
        } else {
            0.0
        };

        let rgba = self.convert_to_rgba(decoded)?;
        let mut image = self.orientation.apply(frame::rgba_frame_to_image(&rgba)?);
        self.compositor.apply(&mut image, t);
        frame::image_into_rgba_frame(&image, &mut self.canvas_frame)?;

        self.ensure_output_scaler()?;
        let mut yuv = VideoFrame::empty();
        if let Some(scaler) = self.to_output.as_mut() {
            scaler.run(&self.canvas_frame, &mut yuv).map_err(|e| {
                SubburnError::Ffmpeg(FfmpegError::Convert(format!("RGBA to YUV: {}", e)))
            })?;
        }
        yuv.set_pts(Some(pts));

        self.encoder.send_frame(&yuv).map_err(|e| {
            SubburnError::Ffmpeg(FfmpegError::EncodeFrame(format!("send_frame: {}", e)))
        })?;
        self.write_packets(octx)?;

        self.frames += 1;
        ctx.report_progress(t);
        Ok(())
    }

    /// Encoder timestamp for `decoded`, relative to the stream start and
    /// strictly increasing.
    fn next_pts(&mut self, decoded: &VideoFrame) -> i64 {
        let candidate = match decoded.timestamp().or_else(|| decoded.pts()) {
            Some(ts) => (ts - self.start_time)
                .max(0)
                .rescale(self.in_time_base, self.encoder_time_base),
            None => self.last_pts.map(|p| p + self.frame_step).unwrap_or(0),
        };
        let pts = match self.last_pts {
            Some(last) if candidate <= last => last + 1,
            _ => candidate,
        };
        self.last_pts = Some(pts);
        pts
    }

    fn convert_to_rgba(&mut self, decoded: &VideoFrame) -> Result<VideoFrame> {
        let (format, width, height) = (decoded.format(), decoded.width(), decoded.height());
        let stale = self
            .to_rgba
            .as_ref()
            .map(|s| s.format != format || s.width != width || s.height != height)
            .unwrap_or(true);
        if stale {
            tracing::debug!(?format, width, height, "creating RGBA converter");
            let context = scaling::Context::get(
                format,
                width,
                height,
                Pixel::RGBA,
                self.natural.width,
                self.natural.height,
                scaling::Flags::BICUBIC,
            )
            .map_err(|e| SubburnError::Ffmpeg(FfmpegError::ScalerCreate(format!("to RGBA: {}", e))))?;
            self.to_rgba = Some(InputScaler {
                format,
                width,
                height,
                context,
            });
        }

        let mut rgba = VideoFrame::empty();
        if let Some(scaler) = self.to_rgba.as_mut() {
            scaler.context.run(decoded, &mut rgba).map_err(|e| {
                SubburnError::Ffmpeg(FfmpegError::Convert(format!("to RGBA: {}", e)))
            })?;
        }
        Ok(rgba)
    }

    fn ensure_output_scaler(&mut self) -> Result<()> {
        if self.to_output.is_some() {
            return Ok(());
        }
        let context = scaling::Context::get(
            Pixel::RGBA,
            self.canvas_frame.width(),
            self.canvas_frame.height(),
            OUTPUT_PIXEL_FORMAT,
            self.output_size.width,
            self.output_size.height,
            scaling::Flags::BICUBIC,
        )
        .map_err(|e| SubburnError::Ffmpeg(FfmpegError::ScalerCreate(format!("to YUV: {}", e))))?;
        self.to_output = Some(context);
        Ok(())
    }

    fn write_packets(&mut self, octx: &mut ffmpeg::format::context::Output) -> Result<()> {
        loop {
            let mut packet = ffmpeg::codec::packet::Packet::empty();
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => {
                    packet.set_stream(self.out_index);
                    packet.rescale_ts(self.encoder_time_base, self.out_time_base);
                    packet.write_interleaved(octx).map_err(|e| {
                        SubburnError::Ffmpeg(FfmpegError::WritePacket(format!("video: {}", e)))
                    })?;
                }
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => return Ok(()),
                Err(ffmpeg::Error::Eof) => return Ok(()),
                Err(e) => {
                    return Err(SubburnError::Ffmpeg(FfmpegError::EncodeFrame(format!(
                        "receive_packet: {}",
                        e
                    ))))
                }
            }
        }
    }

    fn flush_encoder(&mut self, octx: &mut ffmpeg::format::context::Output) -> Result<()> {
        match self.encoder.send_eof() {
            Ok(()) | Err(ffmpeg::Error::Eof) => {}
            Err(e) => {
                return Err(SubburnError::Ffmpeg(FfmpegError::EncodeFrame(format!(
                    "send_eof: {}",
                    e
                ))))
            }
        }
        self.write_packets(octx)
    }
}

/// Copies one audio stream's packets into the output untouched.
struct AudioCopy {
    in_index: usize,
    out_index: usize,
    in_time_base: Rational,
    out_time_base: Rational,
    /// Video start time in this stream's time base, so audio stays in sync
    /// with the re-based video timestamps
    offset: i64,
}

impl AudioCopy {
    fn add(
        asset: &MediaAsset,
        track: &Track,
        video: &Track,
        octx: &mut ffmpeg::format::context::Output,
    ) -> Result<Self> {
        let stream = asset.input().stream(track.stream_index).ok_or_else(|| {
            SubburnError::Decode(format!("audio stream {} disappeared", track.stream_index))
        })?;

        let mut ost = octx.add_stream(ffmpeg::encoder::find(codec::Id::None)).map_err(|e| {
            SubburnError::Ffmpeg(FfmpegError::MuxerCreate(format!("add audio stream: {}", e)))
        })?;
        ost.set_parameters(stream.parameters());
        helpers::stream_reset_codec_tag(&mut ost);

        Ok(Self {
            in_index: track.stream_index,
            out_index: ost.index(),
            in_time_base: track.time_base,
            out_time_base: track.time_base,
            offset: video.start_time.rescale(video.time_base, track.time_base),
        })
    }

    fn write(&self, mut packet: ffmpeg::codec::packet::Packet, octx: &mut ffmpeg::format::context::Output) -> Result<()> {
        if let Some(pts) = packet.pts() {
            packet.set_pts(Some(pts - self.offset));
        }
        if let Some(dts) = packet.dts() {
            packet.set_dts(Some(dts - self.offset));
        }
        packet.rescale_ts(self.in_time_base, self.out_time_base);
        packet.set_position(-1);
        packet.set_stream(self.out_index);
        packet.write_interleaved(octx).map_err(|e| {
            SubburnError::Ffmpeg(FfmpegError::WritePacket(format!("audio: {}", e)))
        })
    }
}

/// Open the output muxer, picking the container from the extension.
fn open_output(path: &Path) -> Result<ffmpeg::format::context::Output> {
    let result = if path.extension().is_some() {
        ffmpeg::format::output(&path)
    } else {
        ffmpeg::format::output_as(&path, DEFAULT_CONTAINER)
    };
    result.map_err(|e| {
        SubburnError::Ffmpeg(FfmpegError::MuxerCreate(format!("{}: {}", path.display(), e)))
    })
}

/// Write the container header; MP4/MOV get their index moved to the front.
fn write_header(octx: &mut ffmpeg::format::context::Output) -> Result<()> {
    let name = octx.format().name().to_string();
    let mut options = ffmpeg::Dictionary::new();
    if name.split(',').any(|n| n == "mp4" || n == "mov") {
        options.set("movflags", "+faststart");
    }
    octx.write_header_with(options)
        .map(|_| ())
        .map_err(|e| SubburnError::Ffmpeg(FfmpegError::WriteHeader(format!("{}: {}", name, e))))
}

fn stream_time_base(octx: &ffmpeg::format::context::Output, index: usize) -> Result<Rational> {
    octx.stream(index)
        .map(|s| s.time_base())
        .ok_or_else(|| SubburnError::Composition(format!("output stream {} missing", index)))
}
