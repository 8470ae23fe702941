//! Scalp topography: interpolated field over the head disc with contours,
//! head outline, sensor markers and an optional colorbar.

use super::axes::{Colorbar, Rect};
use super::canvas::{Canvas, HAlign, TextStyle, VAlign, BLACK, DARK_GRAY, WHITE};
use super::colormap::Colormap;
use super::interpolate::Interpolator;
use super::FigureSize;
use crate::error::{EegError, Result};
use crate::montage::SensorLayout;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Ear outline for a unit head radius, traced from front to back
const EAR_X: [f64; 10] = [
    0.994, 1.020, 1.036, 1.060, 1.084, 1.080, 1.094, 1.064, 1.020, 0.978,
];
const EAR_Y: [f64; 10] = [
    0.111, 0.155, 0.157, 0.149, 0.111, -0.011, -0.186, -0.263, -0.277, -0.240,
];
const NOSE_TIP: f64 = 1.15;
const NOSE_HALF_WIDTH: f64 = 0.1;
/// Grid spacing (pixels) for contour tracing
const CONTOUR_STEP: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopomapStyle {
    #[serde(default = "default_size")]
    pub size: FigureSize,
    #[serde(default)]
    pub colormap: Colormap,
    #[serde(default = "default_contours")]
    pub contours: usize,
    /// Draw a colorbar right of the head (off by default)
    #[serde(default)]
    pub colorbar: bool,
    #[serde(default = "default_colorbar_label")]
    pub colorbar_label: String,
    #[serde(default = "default_true")]
    pub show_sensors: bool,
}

fn default_size() -> FigureSize {
    FigureSize::new(600, 600)
}

fn default_contours() -> usize {
    6
}

fn default_true() -> bool {
    true
}

fn default_colorbar_label() -> String {
    "uV".to_string()
}

impl Default for TopomapStyle {
    fn default() -> Self {
        Self {
            size: default_size(),
            colormap: Colormap::Viridis,
            contours: default_contours(),
            colorbar: false,
            colorbar_label: default_colorbar_label(),
            show_sensors: true,
        }
    }
}

/// `[0, max]` for non-negative data, otherwise symmetric around zero.
pub fn color_limits(values: &[f64]) -> (f64, f64) {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let max_abs = finite.clone().fold(0.0f64, |m, v| m.max(v.abs()));
    let has_negative = finite.clone().any(|v| v < 0.0);
    if has_negative {
        (-max_abs, max_abs)
    } else {
        (0.0, max_abs)
    }
}

/// Pixel geometry of the head disc
#[derive(Debug, Clone, Copy)]
struct HeadFrame {
    cx: f64,
    cy: f64,
    px_per_unit: f64,
}

impl HeadFrame {
    fn to_px(&self, p: [f64; 2]) -> (f64, f64) {
        (self.cx + p[0] * self.px_per_unit, self.cy - p[1] * self.px_per_unit)
    }

    fn to_unit(&self, x: f64, y: f64) -> [f64; 2] {
        [(x - self.cx) / self.px_per_unit, (self.cy - y) / self.px_per_unit]
    }
}

pub fn render_topomap(
    values: &[f64],
    layout: &SensorLayout,
    title: &str,
    style: &TopomapStyle,
) -> Result<Canvas> {
    if values.len() != layout.len() {
        return Err(EegError::RenderError(format!(
            "{} values for {} sensors",
            values.len(),
            layout.len()
        )));
    }
    if layout.is_empty() {
        return Err(EegError::NoChannels("topomap needs at least one sensor".to_string()));
    }

    let (width, height) = (style.size.width as i64, style.size.height as i64);
    let scale = style.size.text_scale();
    let mut canvas = Canvas::new(style.size.width, style.size.height, WHITE);

    let title_band = 12 * scale as i64 + 10;
    let bar_band = if style.colorbar { 20 * scale as i64 + 50 } else { 0 };
    let plot_w = width - bar_band;
    let plot_h = height - title_band;
    let field_radius = layout.max_radius().max(1.0);
    let extent = field_radius.max(NOSE_TIP) + 0.05;
    let frame = HeadFrame {
        cx: plot_w as f64 / 2.0,
        cy: title_band as f64 + plot_h as f64 / 2.0,
        px_per_unit: (plot_w.min(plot_h) as f64 / 2.0 - 8.0).max(1.0) / extent,
    };

    let (vmin, vmax) = color_limits(values);
    let interpolator = Interpolator::new(&layout.positions, values);
    log::debug!(
        "Topomap '{}': {} sensors, {} interpolation, limits [{:.3}, {:.3}]",
        title,
        layout.len(),
        if interpolator.is_thin_plate() { "thin-plate" } else { "inverse-distance" },
        vmin,
        vmax
    );

    // Evaluate on the pixel grid, None outside the field disc
    let field: Vec<Vec<Option<f64>>> = (0..height)
        .into_par_iter()
        .map(|py| {
            (0..width)
                .map(|px| {
                    let p = frame.to_unit(px as f64, py as f64);
                    if p[0].hypot(p[1]) <= field_radius {
                        Some(interpolator.evaluate(p))
                    } else {
                        None
                    }
                })
                .collect()
        })
        .collect();

    for (py, row) in field.iter().enumerate() {
        for (px, value) in row.iter().enumerate() {
            if let Some(v) = value {
                canvas.put_pixel(px as i64, py as i64, style.colormap.map(*v, vmin, vmax));
            }
        }
    }

    if style.contours > 0 && vmax > vmin {
        let levels: Vec<f64> = (1..=style.contours)
            .map(|i| vmin + (vmax - vmin) * i as f64 / (style.contours + 1) as f64)
            .collect();
        draw_contours(&mut canvas, &field, &levels);
    }

    draw_head(&mut canvas, &frame);

    if style.show_sensors {
        let dot = (1.5 * scale as f64).max(2.0);
        for &p in &layout.positions {
            let (x, y) = frame.to_px(p);
            canvas.fill_circle(x, y, dot, BLACK);
        }
    }

    canvas.draw_text(
        plot_w / 2,
        title_band - 6,
        title,
        TextStyle::new(scale + 1).align(HAlign::Center, VAlign::Bottom),
    );

    if style.colorbar {
        let bar_height = (plot_h as f64 * 0.6) as i64;
        let bar = Colorbar {
            area: Rect::new(
                plot_w + 4,
                frame.cy as i64 - bar_height / 2,
                8 * scale as i64,
                bar_height,
            ),
            vmin,
            vmax,
            colormap: style.colormap,
            label: style.colorbar_label.clone(),
        };
        bar.draw(&mut canvas, scale);
    }

    Ok(canvas)
}

fn draw_head(canvas: &mut Canvas, frame: &HeadFrame) {
    let thickness = ((frame.px_per_unit / 100.0).round() as u32).max(1);
    let (cx, cy) = frame.to_px([0.0, 0.0]);
    canvas.stroke_circle(cx, cy, frame.px_per_unit, BLACK, thickness);

    let base_y = (1.0 - NOSE_HALF_WIDTH * NOSE_HALF_WIDTH).sqrt();
    let nose = [
        frame.to_px([-NOSE_HALF_WIDTH, base_y]),
        frame.to_px([0.0, NOSE_TIP]),
        frame.to_px([NOSE_HALF_WIDTH, base_y]),
    ];
    canvas.draw_polyline(&nose, BLACK, thickness);

    for side in [-1.0, 1.0] {
        let ear: Vec<(f64, f64)> = EAR_X
            .iter()
            .zip(EAR_Y.iter())
            .map(|(&x, &y)| frame.to_px([side * x, y]))
            .collect();
        canvas.draw_polyline(&ear, BLACK, thickness);
    }
}

/// Marching squares over the sampled field, one polyline segment per cell crossing.
fn draw_contours(canvas: &mut Canvas, field: &[Vec<Option<f64>>], levels: &[f64]) {
    let rows = field.len();
    let cols = field.first().map(Vec::len).unwrap_or(0);
    let step = CONTOUR_STEP;
    if rows <= step || cols <= step {
        return;
    }

    for y in (0..rows - step).step_by(step) {
        for x in (0..cols - step).step_by(step) {
            let corners = [
                field[y][x],
                field[y][x + step],
                field[y + step][x + step],
                field[y + step][x],
            ];
            let [Some(tl), Some(tr), Some(br), Some(bl)] = corners else {
                continue;
            };
            let (x0, y0, s) = (x as f64, y as f64, step as f64);
            // Edges: top, right, bottom, left as (value a, value b, point a, point b)
            let edges = [
                (tl, tr, (x0, y0), (x0 + s, y0)),
                (tr, br, (x0 + s, y0), (x0 + s, y0 + s)),
                (bl, br, (x0, y0 + s), (x0 + s, y0 + s)),
                (tl, bl, (x0, y0), (x0, y0 + s)),
            ];

            for &level in levels {
                let crossings: Vec<(f64, f64)> = edges
                    .iter()
                    .filter(|(a, b, _, _)| (*a < level) != (*b < level))
                    .map(|&(a, b, pa, pb)| {
                        let t = (level - a) / (b - a);
                        (pa.0 + (pb.0 - pa.0) * t, pa.1 + (pb.1 - pa.1) * t)
                    })
                    .collect();
                match crossings.as_slice() {
                    [p, q] => canvas.draw_line(p.0, p.1, q.0, q.1, DARK_GRAY, 1),
                    [top, right, bottom, left] => {
                        // Saddle: connect according to the cell centre
                        let centre = (tl + tr + br + bl) / 4.0;
                        if (centre < level) == (tl < level) {
                            canvas.draw_line(top.0, top.1, right.0, right.1, DARK_GRAY, 1);
                            canvas.draw_line(bottom.0, bottom.1, left.0, left.1, DARK_GRAY, 1);
                        } else {
                            canvas.draw_line(top.0, top.1, left.0, left.1, DARK_GRAY, 1);
                            canvas.draw_line(bottom.0, bottom.1, right.0, right.1, DARK_GRAY, 1);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::montage::Montage;
    use crate::types::{Channel, ChannelKind};

    fn standard_layout() -> SensorLayout {
        let labels = ["Fz", "Cz", "Pz", "C3", "C4", "O1", "O2", "Fp1", "Fp2"];
        let channels: Vec<Channel> = labels
            .iter()
            .map(|l| Channel::new(*l, ChannelKind::Eeg, vec![0.0]))
            .collect();
        crate::montage::sensor_layout(&channels, Some(&Montage::standard_1020())).unwrap()
    }

    #[test]
    fn test_color_limits() {
        assert_eq!(color_limits(&[1.0, 3.0, 2.0]), (0.0, 3.0));
        assert_eq!(color_limits(&[-1.0, 0.5]), (-1.0, 1.0));
        assert_eq!(color_limits(&[0.0, f64::NAN]), (0.0, 0.0));
    }

    #[test]
    fn test_render_dimensions_and_field() {
        let layout = standard_layout();
        let values: Vec<f64> = (0..layout.len()).map(|i| i as f64).collect();
        let style = TopomapStyle::default();
        let canvas = render_topomap(&values, &layout, "Alpha Band Topomap (8-12 Hz)", &style).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (600, 600));

        // Corners stay background, the head area is coloured
        assert_eq!(*canvas.image().get_pixel(0, 599), WHITE);
        let coloured = canvas
            .image()
            .pixels()
            .filter(|p| **p != WHITE && **p != BLACK && **p != DARK_GRAY)
            .count();
        assert!(coloured > 50_000);
    }

    #[test]
    fn test_render_without_colorbar_or_contours() {
        let layout = standard_layout();
        let values = vec![1.0; layout.len()];
        let style = TopomapStyle {
            contours: 0,
            colorbar: false,
            show_sensors: false,
            ..Default::default()
        };
        assert!(render_topomap(&values, &layout, "flat", &style).is_ok());
    }

    #[test]
    fn test_colorbar_opt_in() {
        assert!(!TopomapStyle::default().colorbar);
        let parsed: TopomapStyle = serde_json::from_str(r#"{ "colorbar": true }"#).unwrap();
        assert!(parsed.colorbar);

        let layout = standard_layout();
        let values: Vec<f64> = (0..layout.len()).map(|i| i as f64).collect();
        let style = TopomapStyle {
            colorbar: true,
            ..Default::default()
        };
        let scale = style.size.text_scale() as i64;
        let canvas = render_topomap(&values, &layout, "with bar", &style).unwrap();

        // Middle of the gradient strip right of the head
        let bar_x = 600 - (20 * scale + 50) + 4 + 4 * scale;
        let title_band = 12 * scale + 10;
        let mid_y = title_band + (600 - title_band) / 2;
        assert_ne!(*canvas.image().get_pixel(bar_x as u32, mid_y as u32), WHITE);

        let plain = render_topomap(&values, &layout, "with bar", &TopomapStyle::default()).unwrap();
        assert_ne!(canvas.image().as_raw(), plain.image().as_raw());
    }

    #[test]
    fn test_value_count_mismatch() {
        let layout = standard_layout();
        let result = render_topomap(&[1.0], &layout, "x", &TopomapStyle::default());
        assert!(matches!(result, Err(EegError::RenderError(_))));
    }
}
