//! Sensor positions for scalp maps
//!
//! Positions end up on a 2-D head disc: `+x` right ear, `+y` nose, radius 1
//! at the head equator. 3-D positions (FIF sensor locations or montage
//! files) are projected with an azimuthal equidistant projection around a
//! least-squares sphere fitted to the sensors.

use crate::error::{EegError, Result};
use crate::types::Channel;
use nalgebra::{DMatrix, DVector};
use std::f64::consts::FRAC_PI_2;
use std::path::Path;

/// Radius of the 10-20 outer ring (Fpz, T7, Oz, T8) on the head disc
const OUTER_RING_RADIUS: f64 = 0.8;

/// Named electrode positions already projected to the head disc
#[derive(Debug, Clone)]
pub struct Montage {
    pub name: String,
    labels: Vec<String>,
    positions: Vec<[f64; 2]>,
}

impl Montage {
    pub fn new(name: impl Into<String>, labels: Vec<String>, positions: Vec<[f64; 2]>) -> Self {
        Self {
            name: name.into(),
            labels,
            positions,
        }
    }

    /// Built-in 10-20 / 10-10 layout.
    ///
    /// The outer ring sits at a fixed radius every 18°; the inner rows are
    /// interpolated between the midline electrode and the ring electrode of
    /// the same row. Old 10-20 names T3/T4/T5/T6 are accepted as aliases.
    pub fn standard_1020() -> Self {
        let mut labels = Vec::new();
        let mut positions = Vec::new();
        let mut push = |label: &str, p: [f64; 2]| {
            labels.push(label.to_string());
            positions.push(p);
        };
        let on_ring = |deg: f64| {
            let a = deg.to_radians();
            [OUTER_RING_RADIUS * a.cos(), OUTER_RING_RADIUS * a.sin()]
        };

        let ring: [(&str, f64); 20] = [
            ("Fpz", 90.0),
            ("Fp2", 72.0),
            ("AF8", 54.0),
            ("F8", 36.0),
            ("FT8", 18.0),
            ("T8", 0.0),
            ("TP8", -18.0),
            ("P8", -36.0),
            ("PO8", -54.0),
            ("O2", -72.0),
            ("Oz", -90.0),
            ("O1", -108.0),
            ("PO7", -126.0),
            ("P7", -144.0),
            ("TP7", -162.0),
            ("T7", 180.0),
            ("FT7", 162.0),
            ("F7", 144.0),
            ("AF7", 126.0),
            ("Fp1", 108.0),
        ];
        for &(label, deg) in &ring {
            push(label, on_ring(deg));
        }
        for (alias, deg) in [("T3", 180.0), ("T4", 0.0), ("T5", -144.0), ("T6", -36.0)] {
            push(alias, on_ring(deg));
        }

        // (row prefix, midline y, angle of the left ring electrode of the row)
        let rows: [(&str, f64, f64); 7] = [
            ("AF", 0.6, 126.0),
            ("F", 0.4, 144.0),
            ("FC", 0.2, 162.0),
            ("C", 0.0, 180.0),
            ("CP", -0.2, 198.0),
            ("P", -0.4, 216.0),
            ("PO", -0.6, 234.0),
        ];
        for &(prefix, mid_y, left_deg) in &rows {
            let midline = [0.0, mid_y];
            push(&format!("{}z", prefix), midline);
            let left = on_ring(left_deg);
            for k in 1..=3usize {
                let t = k as f64 / 4.0;
                let x = midline[0] + (left[0] - midline[0]) * t;
                let y = midline[1] + (left[1] - midline[1]) * t;
                push(&format!("{}{}", prefix, 2 * k - 1), [x, y]);
                push(&format!("{}{}", prefix, 2 * k), [-x, y]);
            }
        }

        Self::new("standard_1020", labels, positions)
    }

    /// Read a montage file: one electrode per line, `name x y` (already on the
    /// head disc) or `name x y z` (head coordinates, projected here). Fields
    /// are separated by whitespace, commas or tabs; `#` starts a comment.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EegError::FileNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("custom")
            .to_string();
        Self::parse(&name, &text)
    }

    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut labels = Vec::new();
        let mut coords: Vec<Vec<f64>> = Vec::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|f| !f.is_empty())
                .collect();
            if fields.len() != 3 && fields.len() != 4 {
                return Err(EegError::InvalidParameter(format!(
                    "Montage line {}: expected 'name x y [z]', got '{}'",
                    line_no + 1,
                    line
                )));
            }
            let values = fields[1..]
                .iter()
                .map(|f| f.parse::<f64>())
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(|e| {
                    EegError::InvalidParameter(format!("Montage line {}: {}", line_no + 1, e))
                })?;
            if let Some(first) = coords.first() {
                if first.len() != values.len() {
                    return Err(EegError::InvalidParameter(format!(
                        "Montage line {}: mixes 2-D and 3-D coordinates",
                        line_no + 1
                    )));
                }
            }
            labels.push(fields[0].to_string());
            coords.push(values);
        }

        if labels.is_empty() {
            return Err(EegError::InvalidParameter(format!(
                "Montage '{}' has no electrodes",
                name
            )));
        }

        let positions = if coords[0].len() == 2 {
            coords.iter().map(|c| [c[0], c[1]]).collect()
        } else {
            let points: Vec<[f64; 3]> = coords.iter().map(|c| [c[0], c[1], c[2]]).collect();
            project_to_disc(&points)
        };
        log::debug!("Montage '{}': {} electrodes", name, labels.len());
        Ok(Self::new(name, labels, positions))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Position of `label`, matched case-insensitively, also trying the
    /// label with an `EEG ` / `EEG-` type prefix removed.
    pub fn position_of(&self, label: &str) -> Option<[f64; 2]> {
        let wanted = label.trim().to_lowercase();
        let stripped = wanted
            .strip_prefix("eeg ")
            .or_else(|| wanted.strip_prefix("eeg-"))
            .map(str::trim);
        self.labels
            .iter()
            .position(|l| {
                let l = l.to_lowercase();
                l == wanted || Some(l.as_str()) == stripped
            })
            .map(|i| self.positions[i])
    }
}

/// Channels placed on the head disc, with their index in the source list
#[derive(Debug, Clone, Default)]
pub struct SensorLayout {
    pub labels: Vec<String>,
    pub positions: Vec<[f64; 2]>,
    pub indices: Vec<usize>,
}

impl SensorLayout {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Pick the values belonging to the placed channels out of a per-channel list.
    pub fn select(&self, values: &[f64]) -> Vec<f64> {
        self.indices.iter().map(|&i| values[i]).collect()
    }

    /// Largest distance of a sensor from the head centre
    pub fn max_radius(&self) -> f64 {
        self.positions
            .iter()
            .map(|p| p[0].hypot(p[1]))
            .fold(0.0, f64::max)
    }
}

/// Place `channels` on the head disc.
///
/// With an explicit montage, positions come from it by label. Otherwise the
/// sensor positions stored in the file are projected; when the file has none
/// the built-in 10-20 layout is used. Channels left without a position are
/// skipped with a warning.
pub fn sensor_layout(channels: &[Channel], montage: Option<&Montage>) -> Result<SensorLayout> {
    let mut layout = SensorLayout::default();
    let mut unplaced = Vec::new();

    let file_positions: Vec<(usize, [f64; 3])> = channels
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.position.map(|p| (i, p)))
        .collect();

    if montage.is_none() && !file_positions.is_empty() {
        let points: Vec<[f64; 3]> = file_positions.iter().map(|&(_, p)| p).collect();
        let projected = project_to_disc(&points);
        for (&(i, _), p) in file_positions.iter().zip(projected) {
            layout.labels.push(channels[i].label.clone());
            layout.positions.push(p);
            layout.indices.push(i);
        }
        unplaced.extend(
            channels
                .iter()
                .filter(|c| c.position.is_none())
                .map(|c| c.label.clone()),
        );
    } else {
        let standard;
        let montage = match montage {
            Some(m) => m,
            None => {
                standard = Montage::standard_1020();
                &standard
            }
        };
        log::debug!("Placing channels with montage '{}'", montage.name);
        for (i, channel) in channels.iter().enumerate() {
            match montage.position_of(&channel.label) {
                Some(p) => {
                    layout.labels.push(channel.label.clone());
                    layout.positions.push(p);
                    layout.indices.push(i);
                }
                None => unplaced.push(channel.label.clone()),
            }
        }
    }

    if !unplaced.is_empty() {
        log::warn!(
            "{} channel(s) without a sensor position left out of scalp maps: {}",
            unplaced.len(),
            unplaced.join(", ")
        );
    }
    if layout.is_empty() {
        return Err(EegError::NoChannels(
            "no channel has a sensor position; supply a montage file".to_string(),
        ));
    }
    Ok(layout)
}

/// Least-squares sphere through `points`: `(centre, radius)`.
///
/// Solves `|p|² = 2c·p + d` for the centre `c` and `d = r² - |c|²`. Returns
/// None for fewer than four points or a degenerate (coplanar) set.
pub fn fit_sphere(points: &[[f64; 3]]) -> Option<([f64; 3], f64)> {
    if points.len() < 4 {
        return None;
    }
    let n = points.len();
    let a = DMatrix::from_fn(n, 4, |row, col| match col {
        3 => 1.0,
        _ => 2.0 * points[row][col],
    });
    let b = DVector::from_fn(n, |row, _| {
        let p = points[row];
        p[0] * p[0] + p[1] * p[1] + p[2] * p[2]
    });
    let at = a.transpose();
    let solution = (&at * &a).lu().solve(&(&at * &b))?;
    let centre = [solution[0], solution[1], solution[2]];
    let r2 = solution[3] + centre.iter().map(|c| c * c).sum::<f64>();
    if !r2.is_finite() || r2 <= 0.0 {
        return None;
    }
    Some((centre, r2.sqrt()))
}

/// Azimuthal equidistant projection around the fitted sphere centre.
///
/// The polar angle from `+z` maps linearly to the disc radius, 90° → 1.
/// Falls back to the coordinate origin when no sphere can be fitted.
pub fn project_to_disc(points: &[[f64; 3]]) -> Vec<[f64; 2]> {
    let centre = match fit_sphere(points) {
        Some((centre, radius)) => {
            log::debug!(
                "Sensor sphere: centre ({:.4}, {:.4}, {:.4}), radius {:.4}",
                centre[0],
                centre[1],
                centre[2],
                radius
            );
            centre
        }
        None => {
            log::warn!("Could not fit a sphere to {} sensors, projecting around the origin", points.len());
            [0.0; 3]
        }
    };

    points
        .iter()
        .map(|p| {
            let v = [p[0] - centre[0], p[1] - centre[1], p[2] - centre[2]];
            let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            if norm == 0.0 {
                return [0.0, 0.0];
            }
            let theta = (v[2] / norm).clamp(-1.0, 1.0).acos();
            let phi = v[1].atan2(v[0]);
            let r = theta / FRAC_PI_2;
            [r * phi.cos(), r * phi.sin()]
        })
        .collect()
}
