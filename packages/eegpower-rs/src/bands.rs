//! Named EEG frequency bands

use crate::error::{EegError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    pub low: f64,
    pub high: f64,
}

impl FrequencyBand {
    pub fn new(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            low,
            high,
        }
    }

    pub fn alpha() -> Self {
        Self::new("alpha", 8.0, 12.0)
    }

    pub fn high_gamma() -> Self {
        Self::new("high_gamma", 70.0, 100.0)
    }

    /// delta, theta, alpha, beta, gamma, high_gamma
    pub fn standard() -> Vec<Self> {
        vec![
            Self::new("delta", 1.0, 4.0),
            Self::new("theta", 4.0, 8.0),
            Self::alpha(),
            Self::new("beta", 13.0, 30.0),
            Self::new("gamma", 30.0, 70.0),
            Self::high_gamma(),
        ]
    }

    /// Parse a standard band name (`alpha`, `high-gamma`, ...) or a range
    /// `LOW-HIGH` in Hz. Ranges are named `LOW-HIGHhz`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let key = trimmed.to_lowercase().replace(['-', ' '], "_");
        if let Some(band) = Self::standard().into_iter().find(|b| b.name == key) {
            return Ok(band);
        }

        let range = trimmed.trim_end_matches(|c| c == 'z' || c == 'Z' || c == 'h' || c == 'H');
        if let Some((low, high)) = range.split_once('-') {
            if let (Ok(low), Ok(high)) = (low.trim().parse::<f64>(), high.trim().parse::<f64>()) {
                if !(low > 0.0 && high > low) {
                    return Err(EegError::InvalidParameter(format!(
                        "Band '{}' must satisfy 0 < low < high",
                        input
                    )));
                }
                return Ok(Self::new(
                    format!("{}-{}hz", fmt_hz(low), fmt_hz(high)),
                    low,
                    high,
                ));
            }
        }

        Err(EegError::InvalidParameter(format!(
            "Unknown frequency band '{}' (expected one of {} or LOW-HIGH)",
            input,
            Self::standard()
                .iter()
                .map(|b| b.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    /// Human-readable name: `high_gamma` → `High Gamma`
    pub fn display_name(&self) -> String {
        self.name
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `8-12`
    pub fn range_label(&self) -> String {
        format!("{}-{}", fmt_hz(self.low), fmt_hz(self.high))
    }

    /// `Alpha Band Topomap (8-12 Hz)`
    pub fn topomap_title(&self) -> String {
        format!("{} Band Topomap ({} Hz)", self.display_name(), self.range_label())
    }

    /// `EEG Alpha Band Power (8-12 Hz) - Channels vs Time`
    pub fn power_title(&self) -> String {
        format!(
            "EEG {} Band Power ({} Hz) - Channels vs Time",
            self.display_name(),
            self.range_label()
        )
    }

    /// Name usable in output file names (`0.5-4hz` → `0_5-4hz`)
    pub fn file_stem(&self) -> String {
        self.name.to_lowercase().replace([' ', '.'], "_")
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} Hz)", self.name, self.range_label())
    }
}

/// Format a frequency without a trailing `.0`
pub fn fmt_hz(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_bands() {
        let bands = FrequencyBand::standard();
        assert_eq!(bands.len(), 6);
        assert_eq!(bands[2], FrequencyBand::alpha());
        assert_eq!(bands[5].low, 70.0);
        assert_eq!(bands[5].high, 100.0);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(FrequencyBand::parse("alpha").unwrap(), FrequencyBand::alpha());
        assert_eq!(FrequencyBand::parse("High-Gamma").unwrap(), FrequencyBand::high_gamma());
        assert_eq!(FrequencyBand::parse("high gamma").unwrap(), FrequencyBand::high_gamma());
    }

    #[test]
    fn test_parse_ranges() {
        let band = FrequencyBand::parse("8-12").unwrap();
        assert_eq!((band.low, band.high), (8.0, 12.0));
        assert_eq!(band.name, "8-12hz");

        let band = FrequencyBand::parse("0.5-4.5Hz").unwrap();
        assert_eq!((band.low, band.high), (0.5, 4.5));

        assert!(FrequencyBand::parse("12-8").is_err());
        assert!(FrequencyBand::parse("mu").is_err());
    }

    #[test]
    fn test_titles() {
        assert_eq!(
            FrequencyBand::alpha().topomap_title(),
            "Alpha Band Topomap (8-12 Hz)"
        );
        assert_eq!(
            FrequencyBand::high_gamma().topomap_title(),
            "High Gamma Band Topomap (70-100 Hz)"
        );
        assert_eq!(
            FrequencyBand::alpha().power_title(),
            "EEG Alpha Band Power (8-12 Hz) - Channels vs Time"
        );
    }

    #[test]
    fn test_fmt_hz() {
        assert_eq!(fmt_hz(8.0), "8");
        assert_eq!(fmt_hz(0.5), "0.5");
        assert_eq!(fmt_hz(100.0), "100");
    }
}
