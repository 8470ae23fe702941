use crate::error::{EegError, Result};
use rayon::prelude::*;

/// Root mean square, 0 for an empty slice
pub fn rms(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64).sqrt()
}

pub fn rms_channels(channels: &[Vec<f64>]) -> Vec<f64> {
    channels.par_iter().map(|c| rms(c)).collect()
}

/// `q`-th percentile (0..=100) with linear interpolation between order
/// statistics, as `numpy.percentile` does by default. NaNs are ignored.
pub fn percentile<'a, I>(values: I, q: f64) -> Result<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    if !(0.0..=100.0).contains(&q) {
        return Err(EegError::InvalidParameter(format!(
            "Percentile must be within 0-100, got {}",
            q
        )));
    }
    let mut sorted: Vec<f64> = values.into_iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return Err(EegError::InvalidParameter(
            "Percentile of an empty set".to_string(),
        ));
    }
    sorted.sort_unstable_by(f64::total_cmp);

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
