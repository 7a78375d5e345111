//! Cross-module tests that run the real FFmpeg pipelines on synthesized media.

pub mod fixtures;
