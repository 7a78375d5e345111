//! Subtitle style configuration as received from callers.

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SubburnError};

/// Family name that selects the configured default font.
pub const SYSTEM_DEFAULT_FAMILY: &str = "System Default";

/// Vertical placement of the subtitle box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PositionRepr", into = "i64")]
pub enum Position {
    Top,
    Center,
    #[default]
    Bottom,
}

impl From<i64> for Position {
    /// 0 = top, 1 = center, anything else = bottom.
    fn from(index: i64) -> Self {
        match index {
            0 => Position::Top,
            1 => Position::Center,
            _ => Position::Bottom,
        }
    }
}

impl From<Position> for i64 {
    fn from(position: Position) -> Self {
        match position {
            Position::Top => 0,
            Position::Center => 1,
            Position::Bottom => 2,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PositionRepr {
    Index(i64),
    Name(String),
}

impl TryFrom<PositionRepr> for Position {
    type Error = String;

    fn try_from(repr: PositionRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            PositionRepr::Index(i) => Ok(Position::from(i)),
            PositionRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "top" => Ok(Position::Top),
                "center" | "middle" => Ok(Position::Center),
                "bottom" => Ok(Position::Bottom),
                other => Err(format!("unknown position {:?}", other)),
            },
        }
    }
}

/// A packed `0xAARRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Argb(pub u32);

impl Argb {
    pub fn alpha(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(&self) -> u8 {
        self.0 as u8
    }

    /// As an RGBA pixel, keeping the packed alpha.
    pub fn to_rgba(&self) -> Rgba<u8> {
        Rgba([self.red(), self.green(), self.blue(), self.alpha()])
    }

    /// As an RGBA pixel, ignoring the packed alpha in favor of `opacity`.
    pub fn to_rgba_with_opacity(&self, opacity: f64) -> Rgba<u8> {
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([self.red(), self.green(), self.blue(), alpha])
    }
}

/// How every cue of one export is drawn.
///
/// Accepts both the current field names and the older `fontSize` /
/// `isBold` / `fontColor` spellings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleConfig {
    pub font_family: String,
    #[serde(alias = "fontSize")]
    pub font_size_pt: f64,
    #[serde(alias = "isBold")]
    pub bold: bool,
    #[serde(alias = "fontColor")]
    pub text_color: Argb,
    /// `0xRRGGBB`; alpha comes from `background_opacity`
    pub background_color: Argb,
    pub background_padding: f64,
    pub background_corner_radius: f64,
    pub background_opacity: f64,
    pub position: Position,
    pub margin_percent: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_family: SYSTEM_DEFAULT_FAMILY.to_string(),
            font_size_pt: 24.0,
            bold: false,
            text_color: Argb(0xFFFF_FFFF),
            background_color: Argb(0x0000_0000),
            background_padding: 4.0,
            background_corner_radius: 4.0,
            background_opacity: 0.54,
            position: Position::Bottom,
            margin_percent: 5.0,
        }
    }
}

impl StyleConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SubburnError::InvalidArguments(format!("styleConfig: {}", msg)));

        if !(self.font_size_pt.is_finite() && self.font_size_pt > 0.0) {
            return invalid("fontSizePt must be positive");
        }
        if !(self.background_padding.is_finite() && self.background_padding >= 0.0) {
            return invalid("backgroundPadding must not be negative");
        }
        if !(self.background_corner_radius.is_finite() && self.background_corner_radius >= 0.0) {
            return invalid("backgroundCornerRadius must not be negative");
        }
        if !(0.0..=1.0).contains(&self.background_opacity) {
            return invalid("backgroundOpacity must be within [0, 1]");
        }
        if !(0.0..=100.0).contains(&self.margin_percent) {
            return invalid("marginPercent must be within [0, 100]");
        }
        Ok(())
    }

    pub fn uses_default_font(&self) -> bool {
        self.font_family.is_empty() || self.font_family == SYSTEM_DEFAULT_FAMILY
    }

    pub fn background_rgba(&self) -> Rgba<u8> {
        self.background_color.to_rgba_with_opacity(self.background_opacity)
    }
}
