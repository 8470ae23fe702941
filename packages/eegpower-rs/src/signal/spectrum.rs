use super::{fft_in_place, FftDirection};
use crate::error::{EegError, Result};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Segment taper for Welch averaging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    #[default]
    Hamming,
    Hann,
    Rectangular,
}

impl WindowFunction {
    /// Periodic (DFT-even) window of length `n`.
    pub fn coefficients(&self, n: usize) -> Vec<f64> {
        let n_f = n as f64;
        (0..n)
            .map(|i| {
                let phase = 2.0 * PI * i as f64 / n_f;
                match self {
                    Self::Hamming => 0.54 - 0.46 * phase.cos(),
                    Self::Hann => 0.5 - 0.5 * phase.cos(),
                    Self::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

/// Welch estimator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WelchParams {
    pub n_fft: usize,
    pub n_overlap: usize,
    pub window: WindowFunction,
    pub fmin: f64,
    pub fmax: f64,
    /// Subtract each segment's mean before tapering
    pub remove_dc: bool,
}

impl Default for WelchParams {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            n_overlap: 0,
            window: WindowFunction::Hamming,
            fmin: 0.0,
            fmax: 50.0,
            remove_dc: true,
        }
    }
}

/// One-sided power spectral density per channel (units²/Hz)
#[derive(Debug, Clone, Serialize)]
pub struct PowerSpectrum {
    pub frequencies: Vec<f64>,
    pub psd: Vec<Vec<f64>>,
}

impl PowerSpectrum {
    pub fn num_channels(&self) -> usize {
        self.psd.len()
    }

    /// PSD in decibels, `10·log10(psd)`. Zero power is floored rather than -inf.
    pub fn to_db(&self) -> Vec<Vec<f64>> {
        self.psd
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&p| 10.0 * p.max(f64::MIN_POSITIVE).log10())
                    .collect()
            })
            .collect()
    }

    /// Frequency of the largest PSD value of `channel`
    pub fn peak_frequency(&self, channel: usize) -> Option<f64> {
        let row = self.psd.get(channel)?;
        row.iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| self.frequencies[i])
    }
}

/// Welch PSD of every channel.
///
/// Segments of `n_fft` samples (clamped to the signal length) step by
/// `n_fft - n_overlap`, are detrended to zero mean (unless `remove_dc` is
/// off), tapered, transformed and averaged. Density
/// scaling divides by `fs·Σw²`; non-DC, non-Nyquist bins are doubled.
/// Only bins within `fmin..=fmax` are returned.
pub fn welch(channels: &[Vec<f64>], sample_rate: f64, params: &WelchParams) -> Result<PowerSpectrum> {
    let n_times = channels.first().map(Vec::len).unwrap_or(0);
    if channels.is_empty() || n_times == 0 {
        return Err(EegError::NoChannels("nothing to compute a PSD from".to_string()));
    }
    if params.fmin < 0.0 || params.fmin > params.fmax {
        return Err(EegError::InvalidParameter(format!(
            "Invalid PSD range {}-{} Hz",
            params.fmin, params.fmax
        )));
    }

    let n_fft = if params.n_fft > n_times {
        log::warn!(
            "n_fft {} exceeds signal length {}, using {}",
            params.n_fft,
            n_times,
            n_times
        );
        n_times
    } else {
        params.n_fft.max(1)
    };
    if params.n_overlap >= n_fft {
        return Err(EegError::InvalidParameter(format!(
            "n_overlap ({}) must be smaller than n_fft ({})",
            params.n_overlap, n_fft
        )));
    }
    let step = n_fft - params.n_overlap;
    let n_segments = (n_times - n_fft) / step + 1;

    let window = params.window.coefficients(n_fft);
    let scale = 1.0 / (sample_rate * window.iter().map(|w| w * w).sum::<f64>());

    let n_bins = n_fft / 2 + 1;
    let resolution = sample_rate / n_fft as f64;
    let kept: Vec<usize> = (0..n_bins)
        .filter(|&k| {
            let f = k as f64 * resolution;
            f >= params.fmin && f <= params.fmax
        })
        .collect();
    if kept.is_empty() {
        return Err(EegError::InvalidParameter(format!(
            "No frequencies between {} and {} Hz at resolution {:.3} Hz",
            params.fmin, params.fmax, resolution
        )));
    }

    log::debug!(
        "Welch: n_fft={}, step={}, segments={}, bins kept={}",
        n_fft,
        step,
        n_segments,
        kept.len()
    );

    let psd: Vec<Vec<f64>> = channels
        .par_iter()
        .map(|signal| {
            let mut accum = vec![0.0f64; n_bins];
            let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];
            for seg in 0..n_segments {
                let segment = &signal[seg * step..seg * step + n_fft];
                let offset = if params.remove_dc {
                    segment.iter().sum::<f64>() / n_fft as f64
                } else {
                    0.0
                };
                for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(&window) {
                    *slot = Complex::new((x - offset) * w, 0.0);
                }
                fft_in_place(&mut buffer, FftDirection::Forward);
                for (acc, c) in accum.iter_mut().zip(&buffer[..n_bins]) {
                    *acc += c.norm_sqr();
                }
            }

            kept.iter()
                .map(|&k| {
                    let one_sided = if k == 0 || (n_fft % 2 == 0 && k == n_fft / 2) {
                        1.0
                    } else {
                        2.0
                    };
                    accum[k] * scale * one_sided / n_segments as f64
                })
                .collect()
        })
        .collect();

    Ok(PowerSpectrum {
        frequencies: kept.iter().map(|&k| k as f64 * resolution).collect(),
        psd,
    })
}
