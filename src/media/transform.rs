//! Display transforms (rotation/flip) and render-size math.

use image::{imageops, RgbaImage};
use serde::Serialize;

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Largest even size not exceeding this one, as required by 4:2:0 encoders.
    pub fn even(&self) -> Self {
        Self {
            width: (self.width & !1).max(2),
            height: (self.height & !1).max(2),
        }
    }
}

/// Affine part of a display matrix: a point `(x, y)` maps to
/// `(a·x + c·y, b·x + d·y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for DisplayTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl DisplayTransform {
    pub const IDENTITY: DisplayTransform = DisplayTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
    };

    /// Build from a raw `AV_PKT_DATA_DISPLAYMATRIX` payload (16.16 fixed point).
    pub fn from_display_matrix(matrix: &[i32; 9]) -> Self {
        let fixed = |v: i32| v as f64 / 65536.0;
        Self {
            a: fixed(matrix[0]),
            b: fixed(matrix[1]),
            c: fixed(matrix[3]),
            d: fixed(matrix[4]),
        }
    }

    /// Size of `natural` once the transform is applied: `|natural × transform|`.
    pub fn apply(&self, natural: Size) -> Size {
        let w = natural.width as f64;
        let h = natural.height as f64;
        let x = self.a * w + self.c * h;
        let y = self.b * w + self.d * h;
        Size::new(x.abs().round() as u32, y.abs().round() as u32)
    }

    /// Classify as one of the eight axis-aligned orientations, if it is one.
    pub fn orientation(&self) -> Option<Orientation> {
        let snap = |v: f64| -> Option<i8> {
            if (v - 1.0).abs() < 1e-3 {
                Some(1)
            } else if (v + 1.0).abs() < 1e-3 {
                Some(-1)
            } else if v.abs() < 1e-3 {
                Some(0)
            } else {
                None
            }
        };
        let key = (snap(self.a)?, snap(self.b)?, snap(self.c)?, snap(self.d)?);
        let orientation = match key {
            (1, 0, 0, 1) => Orientation::Normal,
            (0, 1, -1, 0) => Orientation::Rotate90,
            (-1, 0, 0, -1) => Orientation::Rotate180,
            (0, -1, 1, 0) => Orientation::Rotate270,
            (-1, 0, 0, 1) => Orientation::FlipHorizontal,
            (1, 0, 0, -1) => Orientation::FlipVertical,
            (0, 1, 1, 0) => Orientation::Transpose,
            (0, -1, -1, 0) => Orientation::Transverse,
            _ => return None,
        };
        Some(orientation)
    }
}

/// Axis-aligned orientations a display matrix can describe.
///
/// Rotations are clockwise as seen by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Orientation {
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
    /// Rotate 90° then mirror horizontally.
    Transpose,
    /// Rotate 270° then mirror horizontally.
    Transverse,
}

impl Orientation {
    /// Whether width and height swap.
    pub fn swaps_axes(&self) -> bool {
        matches!(
            self,
            Orientation::Rotate90
                | Orientation::Rotate270
                | Orientation::Transpose
                | Orientation::Transverse
        )
    }

    /// Re-orient a decoded frame into display orientation.
    pub fn apply(&self, image: RgbaImage) -> RgbaImage {
        match self {
            Orientation::Normal => image,
            Orientation::Rotate90 => imageops::rotate90(&image),
            Orientation::Rotate180 => imageops::rotate180(&image),
            Orientation::Rotate270 => imageops::rotate270(&image),
            Orientation::FlipHorizontal => imageops::flip_horizontal(&image),
            Orientation::FlipVertical => imageops::flip_vertical(&image),
            Orientation::Transpose => imageops::flip_horizontal(&imageops::rotate90(&image)),
            Orientation::Transverse => imageops::flip_horizontal(&imageops::rotate270(&image)),
        }
    }
}
