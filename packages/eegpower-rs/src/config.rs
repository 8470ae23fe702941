//! Pipeline configuration
//!
//! Every field has a default, so an empty JSON object (or no config file at
//! all) reproduces the standard figure set for the MNE sample recording.

use crate::bands::FrequencyBand;
use crate::error::{EegError, Result};
use crate::render::{HeatmapStyle, PsdStyle, TopomapStyle};
use crate::signal::WelchParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full path of the sample recording
pub const SAMPLE_PATH_ENV_VAR: &str = "EEGPOWER_SAMPLE_PATH";
/// Root of the MNE datasets directory
pub const MNE_DATA_ENV_VAR: &str = "MNE_DATA";
/// Sample recording location below the datasets directory
pub const SAMPLE_RELATIVE_PATH: &str = "MNE-sample-data/MEG/sample/sample_audvis_raw.fif";

fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Locate the sample recording.
///
/// Search order:
/// 1. `explicit` (must exist if given)
/// 2. `$EEGPOWER_SAMPLE_PATH`
/// 3. `$MNE_DATA/MNE-sample-data/MEG/sample/sample_audvis_raw.fif`
/// 4. `~/mne_data/MNE-sample-data/MEG/sample/sample_audvis_raw.fif`
pub fn resolve_sample_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let p = expand_path(&path.to_string_lossy());
        if p.exists() {
            return Ok(p);
        }
        return Err(EegError::FileNotFound(p.display().to_string()));
    }

    let mut tried = Vec::new();

    if let Ok(env_path) = std::env::var(SAMPLE_PATH_ENV_VAR) {
        tried.push(expand_path(&env_path));
    }
    if let Ok(data_root) = std::env::var(MNE_DATA_ENV_VAR) {
        tried.push(expand_path(&data_root).join(SAMPLE_RELATIVE_PATH));
    }
    if let Some(home) = dirs::home_dir() {
        tried.push(home.join("mne_data").join(SAMPLE_RELATIVE_PATH));
    }

    if let Some(found) = tried.iter().find(|p| p.exists()) {
        log::debug!("Sample recording found at {}", found.display());
        return Ok(found.clone());
    }

    Err(EegError::FileNotFound(format!(
        "sample recording not found (tried: {})",
        tried
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PsdConfig {
    pub welch: WelchParams,
    pub file_name: String,
    pub style: PsdStyle,
}

impl Default for PsdConfig {
    fn default() -> Self {
        Self {
            welch: WelchParams::default(),
            file_name: "eeg_psd.png".to_string(),
            style: PsdStyle::default(),
        }
    }
}

/// One band-limited RMS topomap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopomapConfig {
    pub band: FrequencyBand,
    /// Defaults to `eeg_<band>_topomap.png`
    #[serde(default)]
    pub file_name: Option<String>,
}

impl TopomapConfig {
    pub fn for_band(band: FrequencyBand) -> Self {
        Self {
            band,
            file_name: None,
        }
    }

    pub fn file_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("eeg_{}_topomap.png", self.band.file_stem()))
    }
}

fn default_topomaps() -> Vec<TopomapConfig> {
    vec![
        TopomapConfig::for_band(FrequencyBand::alpha()),
        TopomapConfig::for_band(FrequencyBand::high_gamma()),
    ]
}

/// Hilbert envelope power heatmap
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    pub band: FrequencyBand,
    /// Upper colour limit as a percentile of all power values
    pub percentile: f64,
    pub file_name: String,
    pub style: HeatmapStyle,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            band: FrequencyBand::alpha(),
            percentile: 95.0,
            file_name: "eeg_power_channels_vs_time.png".to_string(),
            style: HeatmapStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Recording to analyse; None searches for the sample recording
    pub input: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub tmin: f64,
    /// None keeps everything after `tmin`
    pub tmax: Option<f64>,
    /// Channels dropped in addition to the file's bad channels
    pub exclude: Vec<String>,
    pub use_file_bads: bool,
    /// Montage file for recordings without sensor positions
    pub montage: Option<PathBuf>,
    pub filter_order: usize,
    pub psd: PsdConfig,
    pub topomaps: Vec<TopomapConfig>,
    pub topomap_style: TopomapStyle,
    pub envelope: EnvelopeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: PathBuf::from("."),
            tmin: 0.0,
            tmax: Some(60.0),
            exclude: Vec::new(),
            use_file_bads: true,
            montage: None,
            filter_order: 4,
            psd: PsdConfig::default(),
            topomaps: default_topomaps(),
            topomap_style: TopomapStyle::default(),
            envelope: EnvelopeConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EegError::FileNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check parameters that do not depend on the recording.
    pub fn validate(&self) -> Result<()> {
        if !(self.tmin >= 0.0) {
            return Err(EegError::InvalidParameter(format!(
                "tmin must be non-negative, got {}",
                self.tmin
            )));
        }
        if let Some(tmax) = self.tmax {
            if !(tmax >= self.tmin) {
                return Err(EegError::InvalidParameter(format!(
                    "tmax ({}) must not be less than tmin ({})",
                    tmax, self.tmin
                )));
            }
        }
        if self.filter_order == 0 {
            return Err(EegError::InvalidParameter(
                "filter_order must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.envelope.percentile) {
            return Err(EegError::InvalidParameter(format!(
                "envelope percentile must be within 0-100, got {}",
                self.envelope.percentile
            )));
        }
        let bands = self
            .topomaps
            .iter()
            .map(|t| &t.band)
            .chain(std::iter::once(&self.envelope.band));
        for band in bands {
            if !(band.low > 0.0 && band.high > band.low) {
                return Err(EegError::InvalidParameter(format!(
                    "band {} must satisfy 0 < low < high",
                    band
                )));
            }
        }
        Ok(())
    }

    pub fn resolve_input(&self) -> Result<PathBuf> {
        resolve_sample_path(self.input.as_deref())
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
