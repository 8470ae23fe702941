//! Scattered-data interpolation of sensor values over the head disc

use nalgebra::{DMatrix, DVector};

/// Interpolant through `(position, value)` pairs on the plane.
///
/// Thin-plate spline when at least three non-collinear sensors are
/// available, inverse-distance weighting otherwise.
#[derive(Debug, Clone)]
pub enum Interpolator {
    ThinPlate {
        points: Vec<[f64; 2]>,
        weights: Vec<f64>,
        /// `a0 + a1·x + a2·y`
        affine: [f64; 3],
    },
    InverseDistance {
        points: Vec<[f64; 2]>,
        values: Vec<f64>,
    },
}

fn tps_kernel(r2: f64) -> f64 {
    if r2 <= 0.0 {
        0.0
    } else {
        // r² ln r = ½ r² ln r²
        0.5 * r2 * r2.ln()
    }
}

fn dist2(a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (a[0] - b[0], a[1] - b[1]);
    dx * dx + dy * dy
}

impl Interpolator {
    pub fn new(points: &[[f64; 2]], values: &[f64]) -> Self {
        if points.len() >= 3 {
            if let Some(tps) = Self::thin_plate(points, values) {
                return tps;
            }
            log::warn!("Thin-plate spline system is singular, using inverse-distance weighting");
        }
        Self::InverseDistance {
            points: points.to_vec(),
            values: values.to_vec(),
        }
    }

    fn thin_plate(points: &[[f64; 2]], values: &[f64]) -> Option<Self> {
        let n = points.len();
        let size = n + 3;
        let mut system = DMatrix::<f64>::zeros(size, size);
        let mut rhs = DVector::<f64>::zeros(size);

        for i in 0..n {
            for j in 0..n {
                system[(i, j)] = tps_kernel(dist2(points[i], points[j]));
            }
            let affine_row = [1.0, points[i][0], points[i][1]];
            for (k, &v) in affine_row.iter().enumerate() {
                system[(i, n + k)] = v;
                system[(n + k, i)] = v;
            }
            rhs[i] = values[i];
        }

        let solution = system.lu().solve(&rhs)?;
        if solution.iter().any(|v| !v.is_finite()) {
            return None;
        }

        // LU succeeds on nearly singular systems; reject wild solutions
        let residual = (0..n)
            .map(|i| {
                let fitted: f64 = (0..n)
                    .map(|j| solution[j] * tps_kernel(dist2(points[i], points[j])))
                    .sum::<f64>()
                    + solution[n]
                    + solution[n + 1] * points[i][0]
                    + solution[n + 2] * points[i][1];
                (fitted - values[i]).abs()
            })
            .fold(0.0, f64::max);
        let scale = values.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1e-12);
        if residual > 1e-6 * scale {
            return None;
        }

        Some(Self::ThinPlate {
            points: points.to_vec(),
            weights: solution.iter().take(n).copied().collect(),
            affine: [solution[n], solution[n + 1], solution[n + 2]],
        })
    }

    pub fn is_thin_plate(&self) -> bool {
        matches!(self, Self::ThinPlate { .. })
    }

    pub fn evaluate(&self, p: [f64; 2]) -> f64 {
        match self {
            Self::ThinPlate {
                points,
                weights,
                affine,
            } => {
                let radial: f64 = points
                    .iter()
                    .zip(weights)
                    .map(|(&q, &w)| w * tps_kernel(dist2(p, q)))
                    .sum();
                radial + affine[0] + affine[1] * p[0] + affine[2] * p[1]
            }
            Self::InverseDistance { points, values } => {
                let mut weight_sum = 0.0;
                let mut value_sum = 0.0;
                for (&q, &v) in points.iter().zip(values) {
                    let d2 = dist2(p, q);
                    if d2 < 1e-18 {
                        return v;
                    }
                    let w = 1.0 / d2;
                    weight_sum += w;
                    value_sum += w * v;
                }
                if weight_sum > 0.0 {
                    value_sum / weight_sum
                } else {
                    0.0
                }
            }
        }
    }
}
