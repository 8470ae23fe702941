use super::{fft_in_place, FftDirection};
use rayon::prelude::*;
use rustfft::num_complex::Complex;

/// FFT-based analytic signal `x + i·H{x}` of the same length as `signal`.
///
/// Negative frequencies are zeroed and positive ones doubled; DC and (for
/// even lengths) the Nyquist bin are kept as is.
pub fn analytic_signal(signal: &[f64]) -> Vec<Complex<f64>> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut spectrum: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft_in_place(&mut spectrum, FftDirection::Forward);

    let half = n / 2;
    let doubled_end = if n % 2 == 0 { half } else { half + 1 };
    for (k, bin) in spectrum.iter_mut().enumerate() {
        if k == 0 || (n % 2 == 0 && k == half) {
            continue;
        }
        if k < doubled_end {
            *bin *= 2.0;
        } else {
            *bin = Complex::new(0.0, 0.0);
        }
    }

    fft_in_place(&mut spectrum, FftDirection::Inverse);
    let norm = 1.0 / n as f64;
    spectrum.iter_mut().for_each(|c| *c *= norm);
    spectrum
}

/// Instantaneous amplitude `|analytic_signal(x)|`
pub fn envelope(signal: &[f64]) -> Vec<f64> {
    analytic_signal(signal).iter().map(|c| c.norm()).collect()
}

/// Squared envelope of every channel
pub fn envelope_power_channels(channels: &[Vec<f64>]) -> Vec<Vec<f64>> {
    channels
        .par_iter()
        .map(|signal| {
            analytic_signal(signal)
                .iter()
                .map(|c| c.norm_sqr())
                .collect()
        })
        .collect()
}
