//! Digital Filter Implementations
//!
//! IIR Butterworth filters built from second-order sections (biquads), plus
//! zero-phase forward-backward application for offline band extraction.

use crate::error::{EegError, Result};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Second-order section (biquad) coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

/// State for a single biquad section (Direct Form II Transposed)
#[derive(Debug, Clone, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

/// Single biquad filter section
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.state = BiquadState::default();
    }

    /// Prime the state as if `value` had been the input forever (steady state).
    fn settle(&mut self, value: f64) {
        let c = self.coeffs;
        let dc_gain = (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2);
        let y = dc_gain * value;
        self.state.z2 = c.b2 * value - c.a2 * y;
        self.state.z1 = c.b1 * value - c.a1 * y + self.state.z2;
    }
}

/// Cascaded second-order sections filter
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<BiquadFilter>,
}

impl SosFilter {
    pub fn new(sections: Vec<BiquadCoeffs>) -> Self {
        Self {
            sections: sections.into_iter().map(BiquadFilter::new).collect(),
        }
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let mut output = input;
        for section in &mut self.sections {
            output = section.process(output);
        }
        output
    }

    /// Process a signal and return a new array (original unchanged)
    pub fn filter(&mut self, signal: &[f64]) -> Vec<f64> {
        signal.iter().map(|&s| self.process(s)).collect()
    }

    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }

    /// Settle every section on a constant input so filtering starts without a step.
    fn settle(&mut self, value: f64) {
        let mut v = value;
        for section in &mut self.sections {
            section.settle(v);
            let c = section.coeffs;
            v *= (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2);
        }
    }

    /// Zero-phase filtering: forward pass, then backward pass over the result.
    ///
    /// The signal is extended by odd reflection of `padlen` samples on both
    /// ends to limit edge transients, and the state is settled on the first
    /// sample of each pass.
    pub fn filtfilt(&mut self, signal: &[f64], padlen: usize) -> Vec<f64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }
        let padlen = padlen.min(n - 1);

        let first = signal[0];
        let last = signal[n - 1];
        let mut extended = Vec::with_capacity(n + 2 * padlen);
        extended.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=padlen).map(|i| 2.0 * last - signal[n - 1 - i]));

        self.reset();
        self.settle(extended[0]);
        let mut forward = self.filter(&extended);

        forward.reverse();
        self.reset();
        self.settle(forward[0]);
        let mut backward = self.filter(&forward);
        backward.reverse();

        backward.drain(..padlen);
        backward.truncate(n);
        backward
    }
}

/// Butterworth filter designer
pub struct ButterworthFilter;

impl ButterworthFilter {
    pub fn lowpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        let wn = Self::prewarp(cutoff, sample_rate);
        SosFilter::new(Self::design_lowpass(wn, order))
    }

    pub fn highpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        let wn = Self::prewarp(cutoff, sample_rate);
        SosFilter::new(Self::design_highpass(wn, order))
    }

    /// Band-pass as a cascade of an order-`order` high-pass and low-pass
    pub fn bandpass(low: f64, high: f64, sample_rate: f64, order: usize) -> SosFilter {
        let mut sections = Self::design_highpass(Self::prewarp(low, sample_rate), order);
        sections.extend(Self::design_lowpass(Self::prewarp(high, sample_rate), order));
        SosFilter::new(sections)
    }

    /// Prewarp frequency for bilinear transform
    fn prewarp(freq: f64, sample_rate: f64) -> f64 {
        (PI * freq / sample_rate).tan()
    }

    /// Damping term `2 sin θ` of the k-th analog pole pair
    fn pole_damping(k: usize, order: usize) -> f64 {
        2.0 * (PI * (2 * k + 1) as f64 / (2 * order) as f64).sin()
    }

    fn design_lowpass(wn: f64, order: usize) -> Vec<BiquadCoeffs> {
        let mut sections = Vec::with_capacity(order.div_ceil(2));
        let wn2 = wn * wn;

        for k in 0..order / 2 {
            let d = Self::pole_damping(k, order);
            let norm = 1.0 / (1.0 + d * wn + wn2);
            let b0 = wn2 * norm;
            sections.push(BiquadCoeffs {
                b0,
                b1: 2.0 * b0,
                b2: b0,
                a1: 2.0 * (wn2 - 1.0) * norm,
                a2: (1.0 - d * wn + wn2) * norm,
            });
        }

        // Odd order: real pole, first-order section H(s) = wn / (s + wn)
        if order % 2 == 1 {
            let k_coeff = wn / (1.0 + wn);
            sections.push(BiquadCoeffs {
                b0: k_coeff,
                b1: k_coeff,
                b2: 0.0,
                a1: (wn - 1.0) / (wn + 1.0),
                a2: 0.0,
            });
        }

        sections
    }

    fn design_highpass(wn: f64, order: usize) -> Vec<BiquadCoeffs> {
        let mut sections = Vec::with_capacity(order.div_ceil(2));
        let wn2 = wn * wn;

        for k in 0..order / 2 {
            let d = Self::pole_damping(k, order);
            let norm = 1.0 / (1.0 + d * wn + wn2);
            sections.push(BiquadCoeffs {
                b0: norm,
                b1: -2.0 * norm,
                b2: norm,
                a1: 2.0 * (wn2 - 1.0) * norm,
                a2: (1.0 - d * wn + wn2) * norm,
            });
        }

        if order % 2 == 1 {
            let k_coeff = 1.0 / (1.0 + wn);
            sections.push(BiquadCoeffs {
                b0: k_coeff,
                b1: -k_coeff,
                b2: 0.0,
                a1: (wn - 1.0) / (wn + 1.0),
                a2: 0.0,
            });
        }

        sections
    }
}

/// Validate band-pass cutoffs against the sample rate.
pub fn validate_band(low: f64, high: f64, sample_rate: f64) -> Result<()> {
    let nyquist = sample_rate / 2.0;
    if !(low > 0.0) {
        return Err(EegError::InvalidParameter(format!(
            "Low cutoff ({} Hz) must be positive",
            low
        )));
    }
    if low >= high {
        return Err(EegError::InvalidParameter(format!(
            "Low cutoff ({} Hz) must be less than high cutoff ({} Hz)",
            low, high
        )));
    }
    if high >= nyquist {
        return Err(EegError::InvalidParameter(format!(
            "High cutoff ({} Hz) must be less than Nyquist ({} Hz)",
            high, nyquist
        )));
    }
    Ok(())
}

/// -6 dB cutoffs for a requested pass band.
///
/// Transition bands follow the usual automatic widths (25% of the edge,
/// at least 2 Hz, bounded by the low edge and by Nyquist). Butterworth
/// cutoffs sit in the middle of each transition band, where one pass is
/// -3 dB and the forward-backward pair is -6 dB.
pub fn transition_cutoffs(low: f64, high: f64, sample_rate: f64) -> (f64, f64) {
    let nyquist = sample_rate / 2.0;
    let l_trans = (low * 0.25).max(2.0).min(low);
    let h_trans = (high * 0.25).max(2.0).min(nyquist - high);
    (low - l_trans / 2.0, high + h_trans / 2.0)
}

/// Zero-phase Butterworth band-pass of every channel.
pub fn bandpass_channels(
    channels: &[Vec<f64>],
    low: f64,
    high: f64,
    sample_rate: f64,
    order: usize,
) -> Result<Vec<Vec<f64>>> {
    validate_band(low, high, sample_rate)?;
    if order == 0 {
        return Err(EegError::InvalidParameter(
            "Filter order must be at least 1".to_string(),
        ));
    }

    let (hp_cutoff, lp_cutoff) = transition_cutoffs(low, high, sample_rate);
    // Roughly three periods of the high-pass cutoff
    let padlen = (3.0 * sample_rate / hp_cutoff).ceil() as usize;
    let template = ButterworthFilter::bandpass(hp_cutoff, lp_cutoff, sample_rate, order);
    log::debug!(
        "Band-pass {}-{} Hz: cutoffs {:.2}/{:.2} Hz, {} sections, padlen {}",
        low,
        high,
        hp_cutoff,
        lp_cutoff,
        template.num_sections(),
        padlen
    );

    Ok(channels
        .par_iter()
        .map(|signal| template.clone().filtfilt(signal, padlen))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = ButterworthFilter::lowpass(10.0, 100.0, 2);
        let mut out = 0.0;
        for _ in 0..500 {
            out = filter.process(1.0);
        }
        assert!((out - 1.0).abs() < 1e-6, "DC gain {}", out);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut filter = ButterworthFilter::highpass(1.0, 100.0, 3);
        let mut out = 1.0;
        for _ in 0..5000 {
            out = filter.process(1.0);
        }
        assert!(out.abs() < 1e-3, "DC leak {}", out);
    }

    #[test]
    fn test_sections_are_stable() {
        for order in 1..=8 {
            let filter = ButterworthFilter::bandpass(8.0, 12.0, 600.0, order);
            for section in &filter.sections {
                let c = section.coeffs;
                // Stability triangle for a biquad denominator
                assert!(c.a2.abs() < 1.0, "order {} a2 {}", order, c.a2);
                assert!(c.a1.abs() < 1.0 + c.a2, "order {} a1 {}", order, c.a1);
            }
        }
    }

    #[test]
    fn test_bandpass_selects_band() {
        let fs = 250.0;
        let n = 5000;
        let in_band = sine(10.0, fs, n);
        let below = sine(2.0, fs, n);
        let above = sine(40.0, fs, n);

        let out = bandpass_channels(&[in_band.clone(), below, above], 8.0, 12.0, fs, 4).unwrap();
        let mid = 1000..4000;

        let gain_in = rms(&out[0][mid.clone()]) / rms(&in_band[mid.clone()]);
        assert!(gain_in > 0.8 && gain_in < 1.01, "in-band gain {}", gain_in);
        assert!(rms(&out[1][mid.clone()]) < 0.01);
        assert!(rms(&out[2][mid]) < 0.01);
    }

    #[test]
    fn test_filtfilt_has_zero_phase() {
        let fs = 250.0;
        let signal = sine(10.0, fs, 2500);
        let out = bandpass_channels(&[signal.clone()], 5.0, 20.0, fs, 4).unwrap();

        // Zero phase: output peaks line up with input peaks
        let corr_at = |lag: isize| -> f64 {
            (500..2000)
                .map(|i| signal[i] * out[0][(i as isize + lag) as usize])
                .sum()
        };
        let best = (-5..=5).max_by(|a, b| corr_at(*a).total_cmp(&corr_at(*b))).unwrap();
        assert_eq!(best, 0);
    }

    #[test]
    fn test_filtfilt_short_signal() {
        let mut filter = ButterworthFilter::bandpass(8.0, 12.0, 100.0, 2);
        assert!(filter.filtfilt(&[], 10).is_empty());
        assert_eq!(filter.filtfilt(&[1.0], 10).len(), 1);
        assert_eq!(filter.filtfilt(&[1.0, 2.0, 3.0], 10).len(), 3);
    }

    #[test]
    fn test_transition_cutoffs() {
        let (hp, lp) = transition_cutoffs(8.0, 12.0, 600.0);
        assert!((hp - 7.0).abs() < 1e-9);
        assert!((lp - 13.5).abs() < 1e-9);

        let (hp, lp) = transition_cutoffs(70.0, 100.0, 600.0);
        assert!((hp - 61.25).abs() < 1e-9);
        assert!((lp - 112.5).abs() < 1e-9);

        // Upper transition shrinks near Nyquist
        let (_, lp) = transition_cutoffs(70.0, 100.0, 208.0);
        assert!(lp < 104.0);
    }

    #[test]
    fn test_validate_band() {
        assert!(validate_band(8.0, 12.0, 600.0).is_ok());
        assert!(validate_band(70.0, 100.0, 150.0).is_err());
        assert!(validate_band(12.0, 8.0, 600.0).is_err());
        assert!(validate_band(0.0, 8.0, 600.0).is_err());
    }
}
