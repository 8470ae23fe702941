//! Band-power figure pipeline
//!
//! Load → pick EEG → crop → PSD → band-pass + RMS topomaps → Hilbert
//! envelope power heatmap. Each stage reports through a progress callback.

use crate::bands::FrequencyBand;
use crate::config::PipelineConfig;
use crate::error::{EegError, Result};
use crate::montage::{sensor_layout, Montage, SensorLayout};
use crate::readers::ReaderFactory;
use crate::render::{render_heatmap, render_psd, render_topomap};
use crate::signal::{bandpass_channels, envelope_power_channels, percentile, rms_channels, welch};
use crate::types::{ChannelKind, Recording};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct TopomapReport {
    pub band: FrequencyBand,
    pub path: PathBuf,
    /// Channels placed on the map, in the order of `rms`
    pub channels: Vec<String>,
    pub rms: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeReport {
    pub band: FrequencyBand,
    pub path: PathBuf,
    pub percentile: f64,
    /// Upper colour limit (µV²)
    pub vmax: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub format: String,
    pub sample_rate: f64,
    pub duration: f64,
    pub channels: Vec<String>,
    pub excluded: Vec<String>,
    pub psd_path: PathBuf,
    pub topomaps: Vec<TopomapReport>,
    pub envelope: EnvelopeReport,
    pub elapsed_ms: u128,
}

impl RunReport {
    /// Every figure written, in pipeline order
    pub fn outputs(&self) -> Vec<&Path> {
        std::iter::once(self.psd_path.as_path())
            .chain(self.topomaps.iter().map(|t| t.path.as_path()))
            .chain(std::iter::once(self.envelope.path.as_path()))
            .collect()
    }
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read the recording and keep the cropped EEG channels.
    ///
    /// Returns the recording and the labels of EEG channels that were dropped.
    pub fn load(&self, path: &Path) -> Result<(Recording, Vec<String>)> {
        let mut reader = ReaderFactory::create_reader(path)?;
        let metadata = reader.metadata()?;
        log::info!(
            "{} recording {}: {} channels at {} Hz, {:.1} s",
            reader.format_name(),
            metadata.file_name,
            metadata.num_channels,
            metadata.sample_rate,
            metadata.duration
        );

        let all_eeg = metadata.labels_of_kind(ChannelKind::Eeg, false);
        if all_eeg.is_empty() {
            return Err(EegError::NoChannels(format!(
                "{} has no EEG channels",
                metadata.file_name
            )));
        }

        let mut recording = reader.read_all(Some(all_eeg.as_slice()))?;
        recording.pick_kind(ChannelKind::Eeg, self.config.use_file_bads)?;
        if !self.config.exclude.is_empty() {
            recording.drop_channels(&self.config.exclude)?;
        }
        recording.crop(self.config.tmin, self.config.tmax)?;

        let kept = recording.channel_names();
        let excluded: Vec<String> = all_eeg.into_iter().filter(|l| !kept.contains(l)).collect();
        if !excluded.is_empty() {
            log::info!("Excluded EEG channels: {}", excluded.join(", "));
        }
        Ok((recording, excluded))
    }

    fn layout(&self, recording: &Recording) -> Result<SensorLayout> {
        let montage = match &self.config.montage {
            Some(path) => Some(Montage::from_file(path)?),
            None => None,
        };
        sensor_layout(&recording.channels, montage.as_ref())
    }

    pub fn run(&self, mut progress: impl FnMut(&str)) -> Result<RunReport> {
        let started = Instant::now();
        let config = &self.config;
        config.validate()?;

        progress("Loading sample data...");
        let input = config.resolve_input()?;
        let (recording, excluded) = self.load(&input)?;
        let sample_rate = recording.sample_rate();
        let data: Vec<Vec<f64>> = recording.channels.iter().map(|c| c.samples.clone()).collect();
        let labels = recording.channel_names();

        if !config.output_dir.exists() {
            std::fs::create_dir_all(&config.output_dir)?;
        }

        progress("Generating PSD plot...");
        let spectrum = welch(&data, sample_rate, &config.psd.welch)?;
        let psd_path = config.output_path(&config.psd.file_name);
        render_psd(&spectrum, &config.psd.style)?.save_png(&psd_path)?;
        progress(&format!("PSD plot saved to {}", psd_path.display()));

        let layout = self.layout(&recording)?;
        let mut filtered: Vec<(FrequencyBand, Vec<Vec<f64>>)> = Vec::new();
        let mut topomaps = Vec::with_capacity(config.topomaps.len());

        for topo in &config.topomaps {
            let band = &topo.band;
            progress(&format!(
                "Filtering data for {} ({} Hz)...",
                band.display_name(),
                band.range_label()
            ));
            let band_data = bandpass_channels(&data, band.low, band.high, sample_rate, config.filter_order)?;

            progress(&format!("Generating {} Topomap...", band.display_name()));
            let rms = rms_channels(&band_data);
            let placed = layout.select(&rms);
            let path = config.output_path(&topo.file_name());
            render_topomap(&placed, &layout, &band.topomap_title(), &config.topomap_style)?
                .save_png(&path)?;
            progress(&format!("{} Topomap saved to {}", band.display_name(), path.display()));

            topomaps.push(TopomapReport {
                band: band.clone(),
                path,
                channels: layout.labels.clone(),
                rms: placed,
            });
            filtered.push((band.clone(), band_data));
        }

        let envelope_cfg = &config.envelope;
        let band = &envelope_cfg.band;
        let band_data = match filtered.iter().position(|(b, _)| b == band) {
            Some(i) => filtered.swap_remove(i).1,
            None => {
                progress(&format!(
                    "Filtering data for {} ({} Hz)...",
                    band.display_name(),
                    band.range_label()
                ));
                bandpass_channels(&data, band.low, band.high, sample_rate, config.filter_order)?
            }
        };
        drop(filtered);

        progress("Computing Hilbert transform...");
        let power = envelope_power_channels(&band_data);
        let vmax = percentile(power.iter().flatten(), envelope_cfg.percentile)?;

        progress("Generating Channel vs Time plot...");
        let last_time = (recording.num_samples().saturating_sub(1)) as f64 / sample_rate;
        let envelope_path = config.output_path(&envelope_cfg.file_name);
        render_heatmap(
            &power,
            &labels,
            last_time,
            0.0,
            vmax,
            &band.power_title(),
            &envelope_cfg.style,
        )?
        .save_png(&envelope_path)?;
        progress(&format!("Plot saved to {}", envelope_path.display()));

        let report = RunReport {
            input,
            format: recording.metadata.source_format.clone(),
            sample_rate,
            duration: recording.duration(),
            channels: labels,
            excluded,
            psd_path,
            topomaps,
            envelope: EnvelopeReport {
                band: band.clone(),
                path: envelope_path,
                percentile: envelope_cfg.percentile,
                vmax,
            },
            elapsed_ms: started.elapsed().as_millis(),
        };
        log::info!(
            "Wrote {} figures in {} ms",
            report.outputs().len(),
            report.elapsed_ms
        );
        Ok(report)
    }
}
