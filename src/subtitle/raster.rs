//! Rasterize overlay layers into RGBA sprites.
//!
//! Each layer is drawn once per export: a rounded background box with the
//! wrapped, centered text on top. Frames then only blend finished sprites.

use image::{Pixel, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect as PixelRect;
use rusttype::{point, Scale};

use crate::media::Size;
use crate::subtitle::layout::OverlayLayer;
use crate::subtitle::schedule::VisibilitySchedule;
use crate::subtitle::style::StyleConfig;
use crate::subtitle::text::FontFace;

/// A pre-rendered layer and where it goes on the canvas (top-left origin).
#[derive(Debug, Clone)]
pub struct OverlaySprite {
    pub image: RgbaImage,
    pub x: i64,
    pub y: i64,
    pub schedule: VisibilitySchedule,
}

pub fn rasterize(
    layer: &OverlayLayer,
    style: &StyleConfig,
    face: &FontFace,
    canvas: Size,
) -> OverlaySprite {
    let width = layer.container.width.ceil().max(1.0) as u32;
    let height = layer.container.height.ceil().max(1.0) as u32;
    let mut image = RgbaImage::new(width, height);

    let radius = layer
        .corner_radius
        .min(width as f64 / 2.0)
        .min(height as f64 / 2.0)
        .max(0.0);
    fill_rounded_rect(&mut image, radius.floor() as u32, style.background_rgba());

    draw_text(&mut image, layer, face, style.text_color.to_rgba());

    let top = layer.container.top_in(canvas.height as f64);
    OverlaySprite {
        image,
        x: layer.container.x.round() as i64,
        y: top.round() as i64,
        schedule: layer.schedule,
    }
}

/// Fill the whole image with `color`, leaving corners of `radius` transparent.
fn fill_rounded_rect(image: &mut RgbaImage, radius: u32, color: Rgba<u8>) {
    let (w, h) = image.dimensions();
    if radius == 0 {
        draw_filled_rect_mut(image, PixelRect::at(0, 0).of_size(w, h), color);
        return;
    }

    if w > 2 * radius {
        draw_filled_rect_mut(image, PixelRect::at(radius as i32, 0).of_size(w - 2 * radius, h), color);
    }
    if h > 2 * radius {
        draw_filled_rect_mut(image, PixelRect::at(0, radius as i32).of_size(w, h - 2 * radius), color);
    }

    let r = radius as i32;
    let right = w as i32 - 1 - r;
    let bottom = h as i32 - 1 - r;
    for center in [(r, r), (right, r), (r, bottom), (right, bottom)] {
        draw_filled_circle_mut(image, center, r, color);
    }
}

fn draw_text(image: &mut RgbaImage, layer: &OverlayLayer, face: &FontFace, color: Rgba<u8>) {
    let px = layer.font_size;
    let scale = Scale::uniform(px as f32);
    let line_height = face.line_height(px);
    let ascent = face.ascent(px);
    let text_top = layer.text_rect.top_in(layer.container.height);
    let (w, h) = image.dimensions();

    for (i, line) in face.wrap(&layer.text, px, layer.wrap_width).iter().enumerate() {
        let line_width = face.line_width(line, px);
        let x = layer.text_rect.x + (layer.text_rect.width - line_width) / 2.0;
        let baseline = text_top + i as f64 * line_height + ascent;

        for glyph in face.font().layout(line, scale, point(x as f32, baseline as f32)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let cx = bb.min.x + gx as i32;
                let cy = bb.min.y + gy as i32;
                if cx < 0 || cy < 0 || cx as u32 >= w || cy as u32 >= h {
                    return;
                }
                let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32).round() as u8;
                if alpha == 0 {
                    return;
                }
                let src = Rgba([color[0], color[1], color[2], alpha]);
                image.get_pixel_mut(cx as u32, cy as u32).blend(&src);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::layout::{Rect, TextMeasurer};
    use crate::subtitle::text::tests::any_font;

    fn box_only_layer(width: f64, height: f64, radius: f64) -> OverlayLayer {
        OverlayLayer {
            text: String::new(),
            container: Rect::new(10.0, 20.0, width, height),
            text_rect: Rect::new(0.0, 0.0, 0.0, 0.0),
            font_size: 12.0,
            wrap_width: width,
            corner_radius: radius,
            schedule: VisibilitySchedule::for_cue(0.0, 1.0, 1.0),
        }
    }

    #[test]
    fn test_rounded_corners_are_transparent() {
        let mut image = RgbaImage::new(40, 20);
        let color = Rgba([0, 0, 0, 138]);
        fill_rounded_rect(&mut image, 6, color);

        assert_eq!(image.get_pixel(0, 0)[3], 0);
        assert_eq!(image.get_pixel(39, 19)[3], 0);
        assert_eq!(image.get_pixel(20, 0), &color);
        assert_eq!(image.get_pixel(0, 10), &color);
        assert_eq!(image.get_pixel(20, 10), &color);
    }

    #[test]
    fn test_square_box_without_radius() {
        let mut image = RgbaImage::new(8, 4);
        fill_rounded_rect(&mut image, 0, Rgba([1, 2, 3, 4]));
        assert!(image.pixels().all(|p| *p == Rgba([1, 2, 3, 4])));
    }

    #[test]
    fn test_sprite_position_flips_to_top_left() {
        let Some(face) = any_font() else { return };
        let layer = box_only_layer(100.0, 30.0, 4.0);
        let sprite = rasterize(&layer, &StyleConfig::default(), &face, Size::new(640, 400));
        assert_eq!(sprite.image.dimensions(), (100, 30));
        assert_eq!(sprite.x, 10);
        // 400 - 20 - 30
        assert_eq!(sprite.y, 350);
    }

    #[test]
    fn test_text_pixels_drawn_inside_box() {
        let Some(face) = any_font() else { return };
        let style = StyleConfig::default();
        let canvas = Size::new(640, 400);
        let cue = crate::subtitle::SubtitleCue::new("Hello", 0.0, 5.0);
        let layer = crate::subtitle::layout::build_layer(&cue, &style, canvas, 10.0, &*face as &dyn TextMeasurer);

        let sprite = rasterize(&layer, &style, &face, canvas);
        // Text is white over a translucent black box
        let bright = sprite
            .image
            .pixels()
            .filter(|p| p[0] > 200 && p[3] > 200)
            .count();
        assert!(bright > 10, "expected glyph pixels, found {}", bright);
    }
}
