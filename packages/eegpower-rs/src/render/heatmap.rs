use super::axes::{nice_ticks, Axes, Colorbar, Rect};
use super::canvas::{Canvas, WHITE};
use super::colormap::Colormap;
use super::font;
use super::FigureSize;
use crate::error::{EegError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapStyle {
    #[serde(default = "default_size")]
    pub size: FigureSize,
    #[serde(default)]
    pub colormap: Colormap,
    #[serde(default = "default_x_label")]
    pub x_label: String,
    #[serde(default = "default_y_label")]
    pub y_label: String,
    #[serde(default = "default_colorbar_label")]
    pub colorbar_label: String,
}

/// 15 × 10 inches at 150 dpi
fn default_size() -> FigureSize {
    FigureSize::new(2250, 1500)
}

fn default_x_label() -> String {
    "Time (s)".to_string()
}

fn default_y_label() -> String {
    "Channels".to_string()
}

fn default_colorbar_label() -> String {
    "Power (uV^2)".to_string()
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        Self {
            size: default_size(),
            colormap: Colormap::Viridis,
            x_label: default_x_label(),
            y_label: default_y_label(),
            colorbar_label: default_colorbar_label(),
        }
    }
}

/// Channels × time image of `data` (`data[channel][sample]`).
///
/// The first channel is drawn at the bottom. Each pixel column shows the
/// mean of the samples it covers; colours run from `vmin` to `vmax`.
pub fn render_heatmap(
    data: &[Vec<f64>],
    labels: &[String],
    duration: f64,
    vmin: f64,
    vmax: f64,
    title: &str,
    style: &HeatmapStyle,
) -> Result<Canvas> {
    let n_channels = data.len();
    let n_samples = data.first().map(Vec::len).unwrap_or(0);
    if n_channels == 0 || n_samples == 0 {
        return Err(EegError::RenderError("heatmap needs at least one sample".to_string()));
    }
    if labels.len() != n_channels {
        return Err(EegError::RenderError(format!(
            "{} labels for {} channels",
            labels.len(),
            n_channels
        )));
    }

    let scale = style.size.text_scale();
    let (width, height) = (style.size.width as i64, style.size.height as i64);
    let text_h = font::text_height(scale) as i64;

    // Channel labels shrink to fit their rows
    let top = 2 * text_h + 14 * scale as i64;
    let bottom = 2 * text_h + 16 * scale as i64;
    let plot_h_estimate = height - top - bottom;
    let label_scale = ((plot_h_estimate / n_channels.max(1) as i64) as u32 / (font::GLYPH_HEIGHT + 2))
        .clamp(1, scale);
    let label_width = labels
        .iter()
        .map(|l| font::text_width(l, label_scale) as i64)
        .max()
        .unwrap_or(0);

    let left = 2 * text_h + label_width + 14 * scale as i64;
    let right = 40 * scale as i64 + 8 * scale as i64 + 2 * text_h + 10 * scale as i64;
    let area = Rect::new(left, top, width - left - right, height - top - bottom);
    if area.width < 10 || area.height < n_channels.min(10) as i64 {
        return Err(EegError::RenderError(format!(
            "figure {}x{} too small for a {}-channel heatmap",
            width, height, n_channels
        )));
    }

    // Column means, one vector per channel
    let cols = area.width as usize;
    let columns: Vec<Vec<f64>> = data
        .par_iter()
        .map(|row| {
            (0..cols)
                .map(|c| {
                    let start = (c * n_samples / cols).min(n_samples - 1);
                    let end = ((c + 1) * n_samples / cols).clamp(start + 1, n_samples);
                    let slice = &row[start..end];
                    slice.iter().sum::<f64>() / slice.len() as f64
                })
                .collect()
        })
        .collect();

    let mut canvas = Canvas::new(style.size.width, style.size.height, WHITE);
    let rows = area.height;
    for r in 0..rows {
        // Row 0 is the top pixel row; channel 0 sits at the bottom
        let channel = (((rows - 1 - r) as usize) * n_channels / rows as usize).min(n_channels - 1);
        for (c, value) in columns[channel].iter().enumerate() {
            canvas.put_pixel(
                area.x + c as i64,
                area.y + r,
                style.colormap.map(*value, vmin, vmax),
            );
        }
    }

    let time_axes = Axes::new(area, (0.0, duration.max(1e-9)), (0.0, n_channels as f64));
    time_axes.draw_frame(&mut canvas);
    time_axes.draw_x_ticks(&mut canvas, &nice_ticks(0.0, duration, 10), scale);

    let channel_ticks: Vec<(f64, String)> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| (i as f64 + 0.5, l.clone()))
        .collect();
    time_axes.draw_y_tick_labels(&mut canvas, &channel_ticks, label_scale);
    time_axes.draw_labels(&mut canvas, title, &style.x_label, &style.y_label, text_h, scale);

    let bar = Colorbar {
        area: Rect::new(area.right() + 12 * scale as i64, area.y, 8 * scale as i64, area.height),
        vmin,
        vmax,
        colormap: style.colormap,
        label: style.colorbar_label.clone(),
    };
    bar.draw(&mut canvas, scale);

    log::debug!(
        "Heatmap: {} channels x {} samples into {}x{} px, range [{:.3}, {:.3}]",
        n_channels,
        n_samples,
        area.width,
        area.height,
        vmin,
        vmax
    );
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("EEG {:03}", i)).collect()
    }

    #[test]
    fn test_first_channel_at_bottom() {
        // Channel 0 at zero, channel 1 at full scale
        let data = vec![vec![0.0; 500], vec![1.0; 500]];
        let style = HeatmapStyle {
            size: FigureSize::new(900, 600),
            ..Default::default()
        };
        let canvas = render_heatmap(&data, &labels(2), 5.0, 0.0, 1.0, "t", &style).unwrap();

        let low = Colormap::Viridis.color(0.0);
        let high = Colormap::Viridis.color(1.0);
        let x = 450;
        let column: Vec<_> = (0..600).map(|y| *canvas.image().get_pixel(x, y)).collect();
        let first_high = column.iter().position(|p| *p == high).unwrap();
        let last_low = column.iter().rposition(|p| *p == low).unwrap();
        assert!(first_high < last_low);
    }

    #[test]
    fn test_column_means() {
        // Alternating samples average to the middle of the scale
        let row: Vec<f64> = (0..4000).map(|i| (i % 2) as f64).collect();
        let style = HeatmapStyle {
            size: FigureSize::new(900, 600),
            ..Default::default()
        };
        let canvas = render_heatmap(&[row], &labels(1), 4.0, 0.0, 1.0, "t", &style).unwrap();
        let mid = Colormap::Viridis.color(0.5);
        assert!(canvas.image().pixels().filter(|p| **p == mid).count() > 1000);
    }

    #[test]
    fn test_default_size_and_many_channels() {
        let data: Vec<Vec<f64>> = (0..59).map(|c| vec![c as f64; 300]).collect();
        let canvas =
            render_heatmap(&data, &labels(59), 60.0, 0.0, 58.0, "power", &HeatmapStyle::default())
                .unwrap();
        assert_eq!((canvas.width(), canvas.height()), (2250, 1500));
    }

    #[test]
    fn test_shape_errors() {
        let style = HeatmapStyle::default();
        assert!(render_heatmap(&[], &[], 1.0, 0.0, 1.0, "t", &style).is_err());
        assert!(render_heatmap(&[vec![1.0]], &labels(2), 1.0, 0.0, 1.0, "t", &style).is_err());
    }
}
