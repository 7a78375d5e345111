//! Subtitle burn-in
//!
//! Decodes the source video, blends the rasterized overlays over every frame
//! in display orientation and re-encodes it, copying audio through. The
//! [`FfmpegExportBackend`] is what the export controller runs.

pub mod compositor;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod pipeline;

pub use compositor::Compositor;
pub use pipeline::FfmpegExportBackend;
