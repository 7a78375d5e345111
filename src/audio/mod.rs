//! Audio extraction pipeline
//!
//! `AudioDecoder` → `PcmResampler` → [`crate::wav`] turns the first audio
//! track of any supported container into a 16 kHz mono 16-bit WAV file.

pub mod decoder;
pub mod extract;
pub mod resampler;

pub use extract::{extract_audio, wav_output_path};
