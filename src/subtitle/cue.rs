use serde::{Deserialize, Serialize};

use crate::error::{Result, SubburnError};

/// A single timed subtitle entry. Times are seconds from the start of the video.
///
/// `end_time <= start_time` is allowed: such a cue is simply never shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleCue {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl SubtitleCue {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
        }
    }

    /// Reject values no schedule can be built from. `index` is used in the message.
    pub fn validate(&self, index: usize) -> Result<()> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(SubburnError::InvalidArguments(format!(
                "subtitles[{}]: startTime and endTime must be finite",
                index
            )));
        }
        if self.start_time < 0.0 {
            return Err(SubburnError::InvalidArguments(format!(
                "subtitles[{}]: startTime must not be negative",
                index
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case() {
        let cue: SubtitleCue =
            serde_json::from_str(r#"{"text":"Hello\nworld","startTime":1.5,"endTime":3}"#).unwrap();
        assert_eq!(cue, SubtitleCue::new("Hello\nworld", 1.5, 3.0));
    }

    #[test]
    fn test_degenerate_cue_is_valid() {
        assert!(SubtitleCue::new("x", 5.0, 2.0).validate(0).is_ok());
        assert!(SubtitleCue::new("x", 5.0, 5.0).validate(0).is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_and_nan() {
        let err = SubtitleCue::new("x", -1.0, 2.0).validate(3).unwrap_err();
        assert!(err.to_string().contains("subtitles[3]"));
        assert!(SubtitleCue::new("x", 0.0, f64::NAN).validate(0).is_err());
    }
}
