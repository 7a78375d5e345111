//! Overlay geometry for each cue.
//!
//! Pure functions of the cues, the style, the render size and the duration.
//! Text measurement goes through [`TextMeasurer`] so geometry can be tested
//! without fonts. All rectangles use a bottom-left origin, y growing upward.

use serde::Serialize;

use crate::media::Size;
use crate::subtitle::cue::SubtitleCue;
use crate::subtitle::schedule::VisibilitySchedule;
use crate::subtitle::style::{Position, StyleConfig};

/// Preview height the style values were authored against.
pub const REFERENCE_HEIGHT: f64 = 400.0;
/// Applied to the measured text height to get the box's content height.
pub const LINE_HEIGHT_MULTIPLIER: f64 = 1.2;
/// Horizontal padding between the text and the box edge, before scaling.
pub const HORIZONTAL_PADDING: f64 = 16.0;
/// Total horizontal space kept free beside the widest line, before scaling.
pub const SIDE_INSET: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Distance from the top edge of a `parent_height` tall parent.
    pub fn top_in(&self, parent_height: f64) -> f64 {
        parent_height - self.y - self.height
    }
}

/// Size of a block of text after wrapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
}

/// Measures text wrapped to a maximum width.
pub trait TextMeasurer {
    /// Size of `text` at `font_size` pixels, wrapped at `max_width`.
    /// Embedded `\n` always break the line.
    fn measure(&self, text: &str, font_size: f64, max_width: f64) -> TextMetrics;
}

/// Background box plus text for one cue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayLayer {
    pub text: String,
    /// Box in canvas coordinates.
    pub container: Rect,
    /// Text block relative to the box.
    pub text_rect: Rect,
    /// Scaled font size in pixels.
    pub font_size: f64,
    /// Width the text was wrapped to.
    pub wrap_width: f64,
    /// Scaled corner radius.
    pub corner_radius: f64,
    pub schedule: VisibilitySchedule,
}

/// Lay out every cue, in input order. The index of a layer is its z-order.
pub fn build(
    cues: &[SubtitleCue],
    style: &StyleConfig,
    render_size: Size,
    duration: f64,
    measurer: &dyn TextMeasurer,
) -> Vec<OverlayLayer> {
    cues.iter()
        .map(|cue| build_layer(cue, style, render_size, duration, measurer))
        .collect()
}

pub fn build_layer(
    cue: &SubtitleCue,
    style: &StyleConfig,
    render_size: Size,
    duration: f64,
    measurer: &dyn TextMeasurer,
) -> OverlayLayer {
    let canvas_w = render_size.width as f64;
    let canvas_h = render_size.height as f64;
    let scale = canvas_h / REFERENCE_HEIGHT;

    let font_size = style.font_size_pt * scale;
    let wrap_width = (canvas_w - SIDE_INSET * scale).max(0.0);
    let metrics = measurer.measure(&cue.text, font_size, wrap_width);

    let adjusted_text_height = metrics.height * LINE_HEIGHT_MULTIPLIER;
    let horizontal_padding = HORIZONTAL_PADDING * scale;
    let vertical_padding = style.background_padding * scale;

    let container_width = metrics.width + 2.0 * horizontal_padding;
    let container_height = adjusted_text_height + 2.0 * vertical_padding;

    let margin = canvas_h * style.margin_percent / 100.0;
    let container_y = match style.position {
        Position::Top => canvas_h - margin - container_height,
        Position::Center => (canvas_h - container_height) / 2.0,
        Position::Bottom => margin,
    };
    let container_x = (canvas_w - container_width) / 2.0;

    let text_y = vertical_padding + (adjusted_text_height - metrics.height) / 2.0;

    OverlayLayer {
        text: cue.text.clone(),
        container: Rect::new(container_x, container_y, container_width, container_height),
        text_rect: Rect::new(horizontal_padding, text_y, metrics.width, metrics.height),
        font_size,
        wrap_width,
        corner_radius: style.background_corner_radius * scale,
        schedule: VisibilitySchedule::for_cue(cue.start_time, cue.end_time, duration),
    }
}
