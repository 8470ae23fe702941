//! Raster drawing surface backed by `image::RgbImage`

use super::font;
use crate::error::Result;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, Rgb, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const DARK_GRAY: Rgb<u8> = Rgb([64, 64, 64]);
pub const LIGHT_GRAY: Rgb<u8> = Rgb([220, 220, 220]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// Font scale, colour and anchoring of a text run
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub scale: u32,
    pub color: Rgb<u8>,
    pub h_align: HAlign,
    pub v_align: VAlign,
}

impl TextStyle {
    pub fn new(scale: u32) -> Self {
        Self {
            scale: scale.max(1),
            color: BLACK,
            h_align: HAlign::Left,
            v_align: VAlign::Top,
        }
    }

    pub fn align(mut self, h_align: HAlign, v_align: VAlign) -> Self {
        self.h_align = h_align;
        self.v_align = v_align;
        self
    }

    pub fn color(mut self, color: Rgb<u8>) -> Self {
        self.color = color;
        self
    }
}

pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb<u8>) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, background),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Set a pixel; coordinates outside the image are ignored.
    #[inline]
    pub fn put_pixel(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u64) < self.width() as u64 && (y as u64) < self.height() as u64 {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, width: i64, height: i64, color: Rgb<u8>) {
        for yy in y.max(0)..(y + height).min(self.height() as i64) {
            for xx in x.max(0)..(x + width).min(self.width() as i64) {
                self.image.put_pixel(xx as u32, yy as u32, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, x: i64, y: i64, width: i64, height: i64, color: Rgb<u8>) {
        let (x1, y1) = (x + width - 1, y + height - 1);
        self.draw_line(x as f64, y as f64, x1 as f64, y as f64, color, 1);
        self.draw_line(x as f64, y1 as f64, x1 as f64, y1 as f64, color, 1);
        self.draw_line(x as f64, y as f64, x as f64, y1 as f64, color, 1);
        self.draw_line(x1 as f64, y as f64, x1 as f64, y1 as f64, color, 1);
    }

    /// Straight line with square pen of `thickness` pixels (DDA stepping).
    pub fn draw_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgb<u8>, thickness: u32) {
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
        let half = thickness.max(1) as i64 / 2;
        let odd_extra = (thickness.max(1) as i64 + 1) / 2;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = (x0 + (x1 - x0) * t).round() as i64;
            let y = (y0 + (y1 - y0) * t).round() as i64;
            for dy in -half..odd_extra {
                for dx in -half..odd_extra {
                    self.put_pixel(x + dx, y + dy, color);
                }
            }
        }
    }

    pub fn draw_polyline(&mut self, points: &[(f64, f64)], color: Rgb<u8>, thickness: u32) {
        for pair in points.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            if x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite() {
                self.draw_line(x0, y0, x1, y1, color, thickness);
            }
        }
    }

    pub fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgb<u8>) {
        let r2 = radius * radius;
        let (x_min, x_max) = ((cx - radius).floor() as i64, (cx + radius).ceil() as i64);
        let (y_min, y_max) = ((cy - radius).floor() as i64, (cy + radius).ceil() as i64);
        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                if dx * dx + dy * dy <= r2 {
                    self.put_pixel(x, y, color);
                }
            }
        }
    }

    pub fn stroke_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgb<u8>, thickness: u32) {
        let segments = ((radius * std::f64::consts::TAU).ceil() as usize).max(16);
        let points: Vec<(f64, f64)> = (0..=segments)
            .map(|i| {
                let a = i as f64 / segments as f64 * std::f64::consts::TAU;
                (cx + radius * a.cos(), cy + radius * a.sin())
            })
            .collect();
        self.draw_polyline(&points, color, thickness);
    }

    /// Horizontal text anchored at (`x`, `y`) according to `style`.
    pub fn draw_text(&mut self, x: i64, y: i64, text: &str, style: TextStyle) {
        let scale = style.scale as i64;
        let width = font::text_width(text, style.scale) as i64;
        let height = font::text_height(style.scale) as i64;
        let left = match style.h_align {
            HAlign::Left => x,
            HAlign::Center => x - width / 2,
            HAlign::Right => x - width,
        };
        let top = match style.v_align {
            VAlign::Top => y,
            VAlign::Middle => y - height / 2,
            VAlign::Bottom => y - height,
        };

        for (i, c) in text.chars().enumerate() {
            let glyph = font::glyph(c);
            let origin_x = left + i as i64 * font::ADVANCE as i64 * scale;
            for row in 0..font::GLYPH_HEIGHT {
                for col in 0..font::GLYPH_WIDTH {
                    if font::pixel(glyph, col, row) {
                        self.fill_rect(
                            origin_x + col as i64 * scale,
                            top + row as i64 * scale,
                            scale,
                            scale,
                            style.color,
                        );
                    }
                }
            }
        }
    }

    /// Text rotated 90° counter-clockwise (reads bottom to top), centred on
    /// (`cx`, `cy`).
    pub fn draw_text_vertical(&mut self, cx: i64, cy: i64, text: &str, style: TextStyle) {
        let scale = style.scale as i64;
        let length = font::text_width(text, style.scale) as i64;
        let thickness = font::text_height(style.scale) as i64;
        // Baseline runs upwards from the bottom of the text run
        let bottom = cy + length / 2;
        let left = cx - thickness / 2;

        for (i, c) in text.chars().enumerate() {
            let glyph = font::glyph(c);
            let along = i as i64 * font::ADVANCE as i64 * scale;
            for row in 0..font::GLYPH_HEIGHT {
                for col in 0..font::GLYPH_WIDTH {
                    if font::pixel(glyph, col, row) {
                        self.fill_rect(
                            left + row as i64 * scale,
                            bottom - along - (col as i64 + 1) * scale,
                            scale,
                            scale,
                            style.color,
                        );
                    }
                }
            }
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        let encoder =
            PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
        encoder.write_image(
            self.image.as_raw(),
            self.width(),
            self.height(),
            image::ExtendedColorType::Rgb8,
        )?;
        log::debug!("Wrote {}x{} PNG to {}", self.width(), self.height(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(canvas: &Canvas, color: Rgb<u8>) -> usize {
        canvas.image().pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn test_clipped_drawing() {
        let mut canvas = Canvas::new(10, 10, WHITE);
        canvas.put_pixel(-1, 3, BLACK);
        canvas.put_pixel(3, 10, BLACK);
        assert_eq!(count(&canvas, BLACK), 0);
        canvas.fill_rect(-5, -5, 8, 8, BLACK);
        assert_eq!(count(&canvas, BLACK), 9);
    }

    #[test]
    fn test_lines() {
        let mut canvas = Canvas::new(20, 20, WHITE);
        canvas.draw_line(0.0, 5.0, 19.0, 5.0, BLACK, 1);
        assert_eq!(count(&canvas, BLACK), 20);

        let mut canvas = Canvas::new(20, 20, WHITE);
        canvas.draw_line(0.0, 5.0, 19.0, 5.0, BLACK, 3);
        assert_eq!(count(&canvas, BLACK), 60);

        let mut canvas = Canvas::new(10, 10, WHITE);
        canvas.stroke_rect(0, 0, 10, 10, BLACK);
        assert_eq!(count(&canvas, BLACK), 36);
    }

    #[test]
    fn test_circle() {
        let mut canvas = Canvas::new(21, 21, WHITE);
        canvas.fill_circle(10.0, 10.0, 5.0, BLACK);
        let filled = count(&canvas, BLACK) as f64;
        assert!((filled - 78.5).abs() < 10.0);
        assert_eq!(*canvas.image().get_pixel(10, 10), BLACK);
        assert_eq!(*canvas.image().get_pixel(0, 0), WHITE);
    }

    #[test]
    fn test_text_alignment() {
        let mut canvas = Canvas::new(40, 20, WHITE);
        canvas.draw_text(20, 10, "I", TextStyle::new(1).align(HAlign::Center, VAlign::Middle));
        // 'I' has its full top bar at columns 1..=3 of the glyph
        let left = 20 - 5 / 2;
        assert_eq!(*canvas.image().get_pixel(left as u32 + 2, 10 - 3), BLACK);
        assert_eq!(count(&canvas, BLACK), 11);
    }

    #[test]
    fn test_vertical_text_is_rotated() {
        let mut canvas = Canvas::new(30, 30, WHITE);
        canvas.draw_text_vertical(15, 15, "-", TextStyle::new(1));
        // A horizontal dash becomes a vertical stroke
        let marked: Vec<(u32, u32)> = canvas
            .image()
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == BLACK)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(marked.len(), 5);
        assert!(marked.iter().all(|&(x, _)| x == marked[0].0));
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut canvas = Canvas::new(8, 4, WHITE);
        canvas.put_pixel(1, 1, BLACK);
        canvas.save_png(&path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(*decoded.get_pixel(1, 1), BLACK);
    }
}
