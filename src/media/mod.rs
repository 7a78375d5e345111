//! Source media loading
//!
//! [`MediaAsset`] opens a container and exposes its video/audio tracks,
//! duration, natural size and display transform. Both the audio extraction
//! and the burn-in pipelines start here.

pub mod asset;
pub mod transform;

pub use asset::{MediaAsset, Track, TrackKind};
pub use transform::{DisplayTransform, Orientation, Size};
