use crate::error::{EegError, Result};
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sampled viridis, evenly spaced from 0 to 1
const VIRIDIS: [[u8; 3]; 11] = [
    [0x44, 0x01, 0x54],
    [0x48, 0x24, 0x75],
    [0x41, 0x44, 0x87],
    [0x35, 0x5f, 0x8d],
    [0x2a, 0x78, 0x8e],
    [0x21, 0x91, 0x8c],
    [0x22, 0xa8, 0x84],
    [0x44, 0xbf, 0x70],
    [0x7a, 0xd1, 0x51],
    [0xbd, 0xdf, 0x26],
    [0xfd, 0xe7, 0x25],
];

/// Diverging blue-white-red for signed data
const COOLWARM: [[u8; 3]; 5] = [
    [0x3b, 0x4c, 0xc0],
    [0x8d, 0xb0, 0xfe],
    [0xdd, 0xdd, 0xdd],
    [0xf4, 0x9a, 0x7b],
    [0xb4, 0x04, 0x26],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Viridis,
    Gray,
    Coolwarm,
}

impl Colormap {
    /// Colour for `t` in `[0, 1]`; values outside are clamped, NaN maps to 0.
    pub fn color(&self, t: f64) -> Rgb<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Viridis => interpolate(&VIRIDIS, t),
            Self::Coolwarm => interpolate(&COOLWARM, t),
            Self::Gray => {
                let v = (t * 255.0).round() as u8;
                Rgb([v, v, v])
            }
        }
    }

    /// Colour of `value` on the scale `[vmin, vmax]`
    pub fn map(&self, value: f64, vmin: f64, vmax: f64) -> Rgb<u8> {
        let range = vmax - vmin;
        let t = if range.abs() < f64::EPSILON {
            0.5
        } else {
            (value - vmin) / range
        };
        self.color(t)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Viridis => "viridis",
            Self::Gray => "gray",
            Self::Coolwarm => "coolwarm",
        }
    }
}

impl FromStr for Colormap {
    type Err = EegError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "viridis" => Ok(Self::Viridis),
            "gray" | "grey" => Ok(Self::Gray),
            "coolwarm" => Ok(Self::Coolwarm),
            other => Err(EegError::InvalidParameter(format!(
                "Unknown colormap '{}' (viridis, gray, coolwarm)",
                other
            ))),
        }
    }
}

fn interpolate(stops: &[[u8; 3]], t: f64) -> Rgb<u8> {
    let scaled = t * (stops.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(stops.len() - 2);
    let frac = scaled - i as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (stops[i], stops[i + 1]);
    Rgb([lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2])])
}
