//! Signal processing: band-pass filters, Welch spectra, Hilbert envelopes
//! and small per-channel statistics.

pub mod filters;
pub mod hilbert;
pub mod spectrum;
pub mod stats;

pub use filters::{bandpass_channels, validate_band, ButterworthFilter, SosFilter};
pub use hilbert::{analytic_signal, envelope, envelope_power_channels};
pub use spectrum::{welch, PowerSpectrum, WelchParams, WindowFunction};
pub use stats::{percentile, rms, rms_channels};

use rustfft::{num_complex::Complex, FftPlanner};
use std::cell::RefCell;

// Thread-local FFT planner for reuse across parallel channel computations
thread_local! {
    static FFT_PLANNER: RefCell<FftPlanner<f64>> = RefCell::new(FftPlanner::new());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FftDirection {
    Forward,
    Inverse,
}

/// Unnormalized in-place FFT of `buffer`.
pub(crate) fn fft_in_place(buffer: &mut [Complex<f64>], direction: FftDirection) {
    if buffer.is_empty() {
        return;
    }
    FFT_PLANNER.with(|planner| {
        let mut planner = planner.borrow_mut();
        let fft = match direction {
            FftDirection::Forward => planner.plan_fft_forward(buffer.len()),
            FftDirection::Inverse => planner.plan_fft_inverse(buffer.len()),
        };
        fft.process(buffer);
    });
}
