use crate::error::{EegError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CHANNEL KINDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelKind {
    Eeg,
    Meg,
    Eog,
    Ecg,
    Emg,
    Stim,
    Resp,
    Misc,
    Unknown,
}

impl ChannelKind {
    /// Map a FIFF channel kind code (`FIFFV_*_CH`) to a channel kind.
    pub fn from_fiff_code(code: i32) -> Self {
        match code {
            1 => Self::Meg,
            2 => Self::Eeg,
            3 => Self::Stim,
            202 => Self::Eog,
            302 => Self::Emg,
            402 => Self::Ecg,
            502 => Self::Misc,
            602 => Self::Resp,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eeg => "EEG",
            Self::Meg => "MEG",
            Self::Eog => "EOG",
            Self::Ecg => "ECG",
            Self::Emg => "EMG",
            Self::Stim => "STIM",
            Self::Resp => "RESP",
            Self::Misc => "MISC",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// FILE FORMATS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    EDF,
    FIF,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "edf" => Some(Self::EDF),
            "fif" => Some(Self::FIF),
            _ => None,
        }
    }

    pub fn supported_extensions() -> &'static [&'static str] {
        &["edf", "fif"]
    }
}

// =============================================================================
// RECORDING
// =============================================================================

/// A single channel in physical units. EEG samples are always microvolts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub label: String,
    pub kind: ChannelKind,
    pub unit: String,
    pub samples: Vec<f64>,
    /// Sensor position in head coordinates (metres), if the file carries one
    pub position: Option<[f64; 3]>,
}

impl Channel {
    pub fn new(label: impl Into<String>, kind: ChannelKind, samples: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            kind,
            unit: if kind == ChannelKind::Eeg { "uV" } else { "" }.to_string(),
            samples,
            position: None,
        }
    }
}

/// Metadata about the recording
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// Original file path
    pub source_file: String,

    /// File format name (EDF, FIF)
    pub source_format: String,

    /// Sample rate in Hz
    pub sample_rate: f64,

    /// Recording start time (RFC 3339 if available)
    pub start_time: Option<String>,

    /// Channels flagged as bad in the file
    pub bad_channels: Vec<String>,
}

/// Multichannel recording, every channel holding the same number of samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub metadata: RecordingMetadata,
    pub channels: Vec<Channel>,
}

impl Recording {
    pub fn new(metadata: RecordingMetadata, channels: Vec<Channel>) -> Result<Self> {
        if metadata.sample_rate <= 0.0 || !metadata.sample_rate.is_finite() {
            return Err(EegError::InvalidParameter(format!(
                "Sample rate must be positive, got {}",
                metadata.sample_rate
            )));
        }
        if let Some(first) = channels.first() {
            let n = first.samples.len();
            if let Some(bad) = channels.iter().find(|c| c.samples.len() != n) {
                return Err(EegError::InvalidParameter(format!(
                    "Channel '{}' has {} samples, expected {}",
                    bad.label,
                    bad.samples.len(),
                    n
                )));
            }
        }
        Ok(Self { metadata, channels })
    }

    pub fn sample_rate(&self) -> f64 {
        self.metadata.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_samples(&self) -> usize {
        self.channels.first().map(|c| c.samples.len()).unwrap_or(0)
    }

    /// Duration covered by the samples, in seconds
    pub fn duration(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.label.clone()).collect()
    }

    pub fn get_channel(&self, label: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.label == label)
    }

    /// Sample times in seconds, starting at 0
    pub fn times(&self) -> Vec<f64> {
        let sr = self.sample_rate();
        (0..self.num_samples()).map(|i| i as f64 / sr).collect()
    }

    /// Keep only channels of `kind`, optionally dropping channels marked bad.
    pub fn pick_kind(&mut self, kind: ChannelKind, exclude_bads: bool) -> Result<()> {
        let bads = &self.metadata.bad_channels;
        self.channels
            .retain(|c| c.kind == kind && !(exclude_bads && bads.contains(&c.label)));
        if self.channels.is_empty() {
            return Err(EegError::NoChannels(format!("no {} channels", kind)));
        }
        Ok(())
    }

    /// Remove channels by label. Unknown labels are ignored.
    pub fn drop_channels(&mut self, labels: &[String]) -> Result<()> {
        self.channels.retain(|c| !labels.contains(&c.label));
        if self.channels.is_empty() {
            return Err(EegError::NoChannels(
                "every channel was excluded".to_string(),
            ));
        }
        Ok(())
    }

    /// Crop to `[tmin, tmax]` seconds, both ends inclusive.
    ///
    /// `tmax = None` keeps everything up to the last sample. Times beyond the
    /// end of the recording are rejected rather than clamped.
    pub fn crop(&mut self, tmin: f64, tmax: Option<f64>) -> Result<()> {
        let sr = self.sample_rate();
        let n = self.num_samples();
        if n == 0 {
            return Err(EegError::InvalidParameter(
                "Cannot crop an empty recording".to_string(),
            ));
        }
        let last_time = (n - 1) as f64 / sr;
        let tmax = tmax.unwrap_or(last_time);

        if tmin < 0.0 {
            return Err(EegError::InvalidParameter(format!(
                "tmin ({}) must be non-negative",
                tmin
            )));
        }
        if tmin > tmax {
            return Err(EegError::InvalidParameter(format!(
                "tmin ({}) must be less than tmax ({})",
                tmin, tmax
            )));
        }
        // Half a sample of slack absorbs rounding in `n / sr`
        if tmax > last_time + 0.5 / sr {
            return Err(EegError::InvalidParameter(format!(
                "tmax ({}) must be less than or equal to the max time ({:.4} s)",
                tmax, last_time
            )));
        }

        let start = (tmin * sr).round() as usize;
        let stop = ((tmax * sr).round() as usize).min(n - 1);
        log::debug!("Cropping samples {}..={} of {}", start, stop, n);

        for channel in &mut self.channels {
            channel.samples.truncate(stop + 1);
            channel.samples.drain(..start);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_recording(n_samples: usize, sample_rate: f64) -> Recording {
        let channels = vec![
            Channel::new("EEG 001", ChannelKind::Eeg, (0..n_samples).map(|i| i as f64).collect()),
            Channel::new("EEG 002", ChannelKind::Eeg, vec![1.0; n_samples]),
            Channel::new("EOG 061", ChannelKind::Eog, vec![0.0; n_samples]),
            Channel::new("STI 014", ChannelKind::Stim, vec![0.0; n_samples]),
        ];
        let metadata = RecordingMetadata {
            source_file: "test.fif".to_string(),
            source_format: "FIF".to_string(),
            sample_rate,
            start_time: None,
            bad_channels: vec!["EEG 002".to_string()],
        };
        Recording::new(metadata, channels).unwrap()
    }

    #[test]
    fn test_fiff_kind_codes() {
        assert_eq!(ChannelKind::from_fiff_code(2), ChannelKind::Eeg);
        assert_eq!(ChannelKind::from_fiff_code(1), ChannelKind::Meg);
        assert_eq!(ChannelKind::from_fiff_code(202), ChannelKind::Eog);
        assert_eq!(ChannelKind::from_fiff_code(3), ChannelKind::Stim);
        assert_eq!(ChannelKind::from_fiff_code(9999), ChannelKind::Unknown);
    }

    #[test]
    fn test_file_format_from_extension() {
        assert_eq!(FileFormat::from_extension("edf"), Some(FileFormat::EDF));
        assert_eq!(FileFormat::from_extension("FIF"), Some(FileFormat::FIF));
        assert_eq!(FileFormat::from_extension("vhdr"), None);
    }

    #[test]
    fn test_rejects_ragged_channels() {
        let metadata = RecordingMetadata {
            sample_rate: 100.0,
            ..Default::default()
        };
        let channels = vec![
            Channel::new("A", ChannelKind::Eeg, vec![0.0; 10]),
            Channel::new("B", ChannelKind::Eeg, vec![0.0; 9]),
        ];
        assert!(Recording::new(metadata, channels).is_err());
    }

    #[test]
    fn test_pick_eeg_excluding_bads() {
        let mut rec = make_recording(100, 100.0);
        rec.pick_kind(ChannelKind::Eeg, true).unwrap();
        assert_eq!(rec.channel_names(), vec!["EEG 001"]);
    }

    #[test]
    fn test_pick_eeg_keeping_bads() {
        let mut rec = make_recording(100, 100.0);
        rec.pick_kind(ChannelKind::Eeg, false).unwrap();
        assert_eq!(rec.num_channels(), 2);
    }

    #[test]
    fn test_pick_missing_kind_errors() {
        let mut rec = make_recording(100, 100.0);
        assert!(matches!(
            rec.pick_kind(ChannelKind::Meg, true),
            Err(EegError::NoChannels(_))
        ));
    }

    #[test]
    fn test_crop_is_inclusive() {
        let mut rec = make_recording(1000, 100.0);
        rec.crop(0.0, Some(5.0)).unwrap();
        assert_eq!(rec.num_samples(), 501);
        assert_eq!(rec.channels[0].samples[500], 500.0);
    }

    #[test]
    fn test_crop_with_tmin() {
        let mut rec = make_recording(1000, 100.0);
        rec.crop(1.0, Some(2.0)).unwrap();
        assert_eq!(rec.num_samples(), 101);
        assert_eq!(rec.channels[0].samples[0], 100.0);
        assert_eq!(rec.times()[0], 0.0);
    }

    #[test]
    fn test_crop_beyond_end_errors() {
        let mut rec = make_recording(1000, 100.0);
        assert!(rec.crop(0.0, Some(60.0)).is_err());
        assert!(rec.crop(-1.0, Some(2.0)).is_err());
        assert!(rec.crop(3.0, Some(2.0)).is_err());
    }

    #[test]
    fn test_crop_to_last_sample() {
        let mut rec = make_recording(1000, 100.0);
        rec.crop(0.0, Some(9.99)).unwrap();
        assert_eq!(rec.num_samples(), 1000);
        rec.crop(0.0, None).unwrap();
        assert_eq!(rec.num_samples(), 1000);
    }

    #[test]
    fn test_drop_channels() {
        let mut rec = make_recording(10, 100.0);
        rec.drop_channels(&["EOG 061".to_string(), "nope".to_string()])
            .unwrap();
        assert_eq!(rec.num_channels(), 3);
        assert!(rec.get_channel("EOG 061").is_none());
    }
}
