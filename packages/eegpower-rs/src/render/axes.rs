//! Plot frames, tick generation and colorbars

use super::canvas::{Canvas, HAlign, TextStyle, VAlign, BLACK, LIGHT_GRAY};
use super::colormap::Colormap;
use super::font;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> i64 {
        self.x + self.width / 2
    }

    pub fn center_y(&self) -> i64 {
        self.y + self.height / 2
    }
}

/// Roughly `target` evenly spaced values on a 1/2/5 × 10ⁿ grid within `[min, max]`.
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }
    if max <= min {
        return vec![min];
    }
    let step = nice_step((max - min) / target.max(1) as f64);
    let first = (min / step).ceil() as i64;
    let last = (max / step + 1e-9).floor() as i64;
    (first..=last)
        .map(|i| {
            let v = i as f64 * step;
            if v == 0.0 {
                0.0
            } else {
                v
            }
        })
        .collect()
}

fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Tick label with just enough decimals for the tick spacing
pub fn format_tick(value: f64, step: f64) -> String {
    let magnitude = value.abs().max(step.abs());
    if magnitude != 0.0 && (magnitude >= 1e5 || step.abs() < 1e-4) {
        return format!("{:.1e}", value);
    }
    let decimals = if step > 0.0 {
        (-step.log10().floor()).clamp(0.0, 6.0) as usize
    } else {
        0
    };
    format!("{:.*}", decimals, value)
}

fn tick_step(ticks: &[f64]) -> f64 {
    match ticks {
        [a, b, ..] => b - a,
        [a] => a.abs(),
        [] => 1.0,
    }
}

/// Data-to-pixel mapping for a rectangular plot area
#[derive(Debug, Clone, Copy)]
pub struct Axes {
    pub area: Rect,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl Axes {
    pub fn new(area: Rect, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            area,
            x_range,
            y_range,
        }
    }

    pub fn x_to_px(&self, x: f64) -> f64 {
        let (lo, hi) = self.x_range;
        let span = if hi > lo { hi - lo } else { 1.0 };
        self.area.x as f64 + (x - lo) / span * (self.area.width - 1) as f64
    }

    /// Larger values map higher up (smaller pixel rows)
    pub fn y_to_px(&self, y: f64) -> f64 {
        let (lo, hi) = self.y_range;
        let span = if hi > lo { hi - lo } else { 1.0 };
        (self.area.bottom() - 1) as f64 - (y - lo) / span * (self.area.height - 1) as f64
    }

    pub fn draw_frame(&self, canvas: &mut Canvas) {
        let a = self.area;
        canvas.stroke_rect(a.x - 1, a.y - 1, a.width + 2, a.height + 2, BLACK);
    }

    pub fn draw_grid(&self, canvas: &mut Canvas, x_ticks: &[f64], y_ticks: &[f64]) {
        let a = self.area;
        for &t in x_ticks {
            let px = self.x_to_px(t);
            canvas.draw_line(px, a.y as f64, px, (a.bottom() - 1) as f64, LIGHT_GRAY, 1);
        }
        for &t in y_ticks {
            let py = self.y_to_px(t);
            canvas.draw_line(a.x as f64, py, (a.right() - 1) as f64, py, LIGHT_GRAY, 1);
        }
    }

    pub fn draw_x_ticks(&self, canvas: &mut Canvas, ticks: &[f64], scale: u32) {
        let step = tick_step(ticks);
        let labels: Vec<(f64, String)> = ticks.iter().map(|&t| (t, format_tick(t, step))).collect();
        self.draw_x_tick_labels(canvas, &labels, scale);
    }

    /// Ticks at arbitrary positions with caller-supplied labels
    pub fn draw_x_tick_labels(&self, canvas: &mut Canvas, ticks: &[(f64, String)], scale: u32) {
        let y0 = self.area.bottom() as f64;
        let tick_len = (3 * scale) as f64;
        for (t, label) in ticks {
            let px = self.x_to_px(*t);
            canvas.draw_line(px, y0, px, y0 + tick_len, BLACK, 1);
            canvas.draw_text(
                px.round() as i64,
                (y0 + tick_len) as i64 + 2 * scale as i64,
                label,
                TextStyle::new(scale).align(HAlign::Center, VAlign::Top),
            );
        }
    }

    pub fn draw_y_ticks(&self, canvas: &mut Canvas, ticks: &[f64], scale: u32) {
        let step = tick_step(ticks);
        let labels: Vec<(f64, String)> = ticks.iter().map(|&t| (t, format_tick(t, step))).collect();
        self.draw_y_tick_labels(canvas, &labels, scale);
    }

    pub fn draw_y_tick_labels(&self, canvas: &mut Canvas, ticks: &[(f64, String)], scale: u32) {
        let x0 = (self.area.x - 1) as f64;
        let tick_len = (3 * scale) as f64;
        for (t, label) in ticks {
            let py = self.y_to_px(*t);
            canvas.draw_line(x0 - tick_len, py, x0, py, BLACK, 1);
            canvas.draw_text(
                (x0 - tick_len) as i64 - 2 * scale as i64,
                py.round() as i64,
                label,
                TextStyle::new(scale).align(HAlign::Right, VAlign::Middle),
            );
        }
    }

    /// Title above the area, x label below the tick labels, y label rotated
    /// left of the area at `y_label_x`.
    pub fn draw_labels(
        &self,
        canvas: &mut Canvas,
        title: &str,
        x_label: &str,
        y_label: &str,
        y_label_x: i64,
        scale: u32,
    ) {
        let a = self.area;
        let gap = 4 * scale as i64;
        canvas.draw_text(
            a.center_x(),
            a.y - gap,
            title,
            TextStyle::new(scale + 1).align(HAlign::Center, VAlign::Bottom),
        );
        let tick_block = 5 * scale as i64 + font::text_height(scale) as i64;
        canvas.draw_text(
            a.center_x(),
            a.bottom() + tick_block + gap,
            x_label,
            TextStyle::new(scale).align(HAlign::Center, VAlign::Top),
        );
        canvas.draw_text_vertical(y_label_x, a.center_y(), y_label, TextStyle::new(scale));
    }
}

/// Vertical colour scale with ticks and a rotated label on its right
#[derive(Debug, Clone)]
pub struct Colorbar {
    pub area: Rect,
    pub vmin: f64,
    pub vmax: f64,
    pub colormap: Colormap,
    pub label: String,
}

impl Colorbar {
    pub fn draw(&self, canvas: &mut Canvas, scale: u32) {
        let a = self.area;
        for row in 0..a.height {
            let t = if a.height > 1 {
                1.0 - row as f64 / (a.height - 1) as f64
            } else {
                0.5
            };
            let color = self.colormap.color(t);
            canvas.fill_rect(a.x, a.y + row, a.width, 1, color);
        }
        canvas.stroke_rect(a.x - 1, a.y - 1, a.width + 2, a.height + 2, BLACK);

        let axes = Axes::new(a, (0.0, 1.0), (self.vmin, self.vmax));
        let ticks = nice_ticks(self.vmin, self.vmax, 5);
        let step = tick_step(&ticks);
        let x0 = a.right() as f64;
        let tick_len = (3 * scale) as f64;
        let mut widest = 0;
        for &t in &ticks {
            let py = axes.y_to_px(t);
            canvas.draw_line(x0, py, x0 + tick_len, py, BLACK, 1);
            let label = format_tick(t, step);
            widest = widest.max(font::text_width(&label, scale) as i64);
            canvas.draw_text(
                (x0 + tick_len) as i64 + 2 * scale as i64,
                py.round() as i64,
                &label,
                TextStyle::new(scale).align(HAlign::Left, VAlign::Middle),
            );
        }

        if !self.label.is_empty() {
            let label_x = a.right()
                + tick_len as i64
                + 4 * scale as i64
                + widest
                + font::text_height(scale) as i64;
            canvas.draw_text_vertical(label_x, a.center_y(), &self.label, TextStyle::new(scale));
        }
    }
}
