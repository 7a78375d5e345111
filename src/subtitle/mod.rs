//! Subtitle overlays
//!
//! Turns caller cues plus one style into drawable overlays:
//! - Cue and style types as they arrive over the host protocol
//! - Visibility schedules on the normalized timeline
//! - Box and text geometry scaled to the render size
//! - Font lookup, measurement and wrapping
//! - Rasterization into RGBA sprites

pub mod cue;
pub mod layout;
pub mod raster;
pub mod schedule;
pub mod style;
pub mod text;

pub use cue::SubtitleCue;
pub use layout::{OverlayLayer, Rect, TextMeasurer, TextMetrics};
pub use raster::{rasterize, OverlaySprite};
pub use schedule::VisibilitySchedule;
pub use style::{Argb, Position, StyleConfig};
pub use text::{FontFace, FontResolver};
