use image::{imageops, RgbaImage};

use crate::subtitle::OverlaySprite;

/// Blends pre-rendered overlay sprites over decoded frames.
///
/// Sprites are drawn in the order given, so later cues end up on top.
#[derive(Debug, Default)]
pub struct Compositor {
    sprites: Vec<OverlaySprite>,
}

impl Compositor {
    /// Sprites whose schedule never shows them are dropped up front.
    pub fn new(sprites: Vec<OverlaySprite>) -> Self {
        let sprites = sprites
            .into_iter()
            .filter(|s| !s.schedule.is_never_visible())
            .collect();
        Self { sprites }
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Draw every sprite visible at normalized time `t` onto `canvas`.
    /// Returns how many were drawn.
    pub fn apply(&self, canvas: &mut RgbaImage, t: f64) -> usize {
        let mut drawn = 0;
        for sprite in self.sprites.iter().filter(|s| s.schedule.is_visible_at(t)) {
            imageops::overlay(canvas, &sprite.image, sprite.x, sprite.y);
            drawn += 1;
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::VisibilitySchedule;
    use image::Rgba;

    fn sprite(color: Rgba<u8>, x: i64, y: i64, start: f64, end: f64) -> OverlaySprite {
        OverlaySprite {
            image: RgbaImage::from_pixel(4, 4, color),
            x,
            y,
            schedule: VisibilitySchedule::for_cue(start, end, 10.0),
        }
    }

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn test_only_visible_sprites_are_drawn() {
        let compositor = Compositor::new(vec![sprite(RED, 0, 0, 1.0, 3.0)]);

        let mut before = RgbaImage::from_pixel(8, 8, BLACK);
        assert_eq!(compositor.apply(&mut before, 0.05), 0);
        assert_eq!(before.get_pixel(1, 1), &BLACK);

        let mut during = RgbaImage::from_pixel(8, 8, BLACK);
        assert_eq!(compositor.apply(&mut during, 0.2), 1);
        assert_eq!(during.get_pixel(1, 1), &RED);
        assert_eq!(during.get_pixel(6, 6), &BLACK);

        let mut after = RgbaImage::from_pixel(8, 8, BLACK);
        assert_eq!(compositor.apply(&mut after, 0.3), 0);
    }

    #[test]
    fn test_later_sprites_draw_on_top() {
        let compositor = Compositor::new(vec![
            sprite(RED, 0, 0, 0.0, 10.0),
            sprite(BLUE, 2, 2, 0.0, 10.0),
        ]);
        let mut canvas = RgbaImage::from_pixel(8, 8, BLACK);
        assert_eq!(compositor.apply(&mut canvas, 0.5), 2);
        assert_eq!(canvas.get_pixel(0, 0), &RED);
        assert_eq!(canvas.get_pixel(3, 3), &BLUE);
    }

    #[test]
    fn test_never_visible_dropped_and_offcanvas_clipped() {
        let compositor = Compositor::new(vec![
            sprite(RED, 0, 0, 20.0, 30.0),
            sprite(BLUE, 6, -2, 0.0, 10.0),
        ]);
        assert_eq!(compositor.len(), 1);

        let mut canvas = RgbaImage::from_pixel(8, 8, BLACK);
        compositor.apply(&mut canvas, 0.5);
        assert_eq!(canvas.get_pixel(7, 0), &BLUE);
        assert_eq!(canvas.get_pixel(7, 2), &BLACK);
    }

    #[test]
    fn test_translucent_box_blends() {
        let half_black = Rgba([0, 0, 0, 128]);
        let compositor = Compositor::new(vec![sprite(half_black, 0, 0, 0.0, 10.0)]);
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 255]));
        compositor.apply(&mut canvas, 0.5);
        let p = canvas.get_pixel(0, 0);
        assert!(p[0] > 80 && p[0] < 120, "{:?}", p);
        assert_eq!(p[3], 255);
    }
}
