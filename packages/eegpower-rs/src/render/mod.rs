//! Static figure rendering to PNG
//!
//! Figures are drawn on a plain raster [`Canvas`](canvas::Canvas) with a
//! built-in bitmap font, so no system fonts or plotting backends are needed.

pub mod axes;
pub mod canvas;
pub mod colormap;
pub mod font;
pub mod heatmap;
pub mod interpolate;
pub mod psd;
pub mod topomap;

pub use canvas::Canvas;
pub use colormap::Colormap;
pub use heatmap::{render_heatmap, HeatmapStyle};
pub use psd::{render_psd, PsdStyle};
pub use topomap::{color_limits, render_topomap, TopomapStyle};

use serde::{Deserialize, Serialize};

/// Output image size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureSize {
    pub width: u32,
    pub height: u32,
}

impl FigureSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Font scale for the figure: 1 per 300 px of the shorter side, 1..=5
    pub fn text_scale(&self) -> u32 {
        (self.width.min(self.height) / 300).clamp(1, 5)
    }
}
