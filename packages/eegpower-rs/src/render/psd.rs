use super::axes::{format_tick, nice_ticks, Axes, Rect};
use super::canvas::{Canvas, WHITE};
use super::font;
use super::FigureSize;
use crate::error::{EegError, Result};
use crate::signal::PowerSpectrum;
use image::Rgb;
use serde::{Deserialize, Serialize};

/// Qualitative line colours, cycled per channel
const PALETTE: [[u8; 3]; 10] = [
    [0x1f, 0x77, 0xb4],
    [0xff, 0x7f, 0x0e],
    [0x2c, 0xa0, 0x2c],
    [0xd6, 0x27, 0x28],
    [0x94, 0x67, 0xbd],
    [0x8c, 0x56, 0x4b],
    [0xe3, 0x77, 0xc2],
    [0x7f, 0x7f, 0x7f],
    [0xbc, 0xbd, 0x22],
    [0x17, 0xbe, 0xcf],
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsdStyle {
    #[serde(default = "default_size")]
    pub size: FigureSize,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_x_label")]
    pub x_label: String,
    #[serde(default = "default_y_label")]
    pub y_label: String,
}

fn default_size() -> FigureSize {
    FigureSize::new(1000, 600)
}

fn default_title() -> String {
    "EEG".to_string()
}

fn default_x_label() -> String {
    "Frequency (Hz)".to_string()
}

fn default_y_label() -> String {
    "uV^2/Hz (dB)".to_string()
}

impl Default for PsdStyle {
    fn default() -> Self {
        Self {
            size: default_size(),
            title: default_title(),
            x_label: default_x_label(),
            y_label: default_y_label(),
        }
    }
}

pub fn channel_color(index: usize) -> Rgb<u8> {
    Rgb(PALETTE[index % PALETTE.len()])
}

/// One dB curve per channel over the spectrum's frequency range.
pub fn render_psd(spectrum: &PowerSpectrum, style: &PsdStyle) -> Result<Canvas> {
    if spectrum.psd.is_empty() || spectrum.frequencies.is_empty() {
        return Err(EegError::RenderError("empty power spectrum".to_string()));
    }

    let db = spectrum.to_db();
    let (mut lo, mut hi) = db
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return Err(EegError::RenderError("power spectrum has no finite values".to_string()));
    }
    if hi - lo < 1e-9 {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.05;
    let y_range = (lo - pad, hi + pad);
    let freqs = &spectrum.frequencies;
    let x_range = (freqs[0], freqs[freqs.len() - 1].max(freqs[0] + 1e-9));

    let scale = style.size.text_scale();
    let (width, height) = (style.size.width as i64, style.size.height as i64);
    let y_ticks = nice_ticks(y_range.0, y_range.1, 6);
    let x_ticks = nice_ticks(x_range.0, x_range.1, 8);

    let y_step = match y_ticks.as_slice() {
        [a, b, ..] => b - a,
        _ => 1.0,
    };
    let tick_label_width = y_ticks
        .iter()
        .map(|t| font::text_width(&format_tick(*t, y_step), scale) as i64)
        .max()
        .unwrap_or(0);
    let text_h = font::text_height(scale) as i64;
    let left = 2 * text_h + tick_label_width + 12 * scale as i64;
    let top = 2 * text_h + 10 * scale as i64;
    let bottom = 2 * text_h + 14 * scale as i64;
    let right = 10 * scale as i64;
    let area = Rect::new(left, top, width - left - right, height - top - bottom);
    if area.width < 10 || area.height < 10 {
        return Err(EegError::RenderError(format!(
            "figure {}x{} too small for a PSD plot",
            width, height
        )));
    }

    let mut canvas = Canvas::new(style.size.width, style.size.height, WHITE);
    let axes = Axes::new(area, x_range, y_range);
    axes.draw_grid(&mut canvas, &x_ticks, &y_ticks);

    let thickness = (scale / 2).max(1);
    for (ch, row) in db.iter().enumerate() {
        let points: Vec<(f64, f64)> = freqs
            .iter()
            .zip(row)
            .map(|(&f, &v)| (axes.x_to_px(f), axes.y_to_px(v)))
            .collect();
        canvas.draw_polyline(&points, channel_color(ch), thickness);
    }

    axes.draw_frame(&mut canvas);
    axes.draw_x_ticks(&mut canvas, &x_ticks, scale);
    axes.draw_y_ticks(&mut canvas, &y_ticks, scale);
    axes.draw_labels(
        &mut canvas,
        &style.title,
        &style.x_label,
        &style.y_label,
        text_h,
        scale,
    );

    log::debug!(
        "PSD figure: {} channels, {:.1}-{:.1} Hz, {:.1}-{:.1} dB",
        db.len(),
        x_range.0,
        x_range.1,
        lo,
        hi
    );
    Ok(canvas)
}
