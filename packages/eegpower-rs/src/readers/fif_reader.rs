/*! FIF (FIFF) file reader
 *
 * Thin wrapper around the external `fiff` crate that implements
 * [`RecordingReader`](super::RecordingReader) for Neuromag/Elekta FIFF files.
 *
 * # Features
 * - Calibrated data (applies cal × range scaling), EEG converted to µV
 * - Channel names and kinds from FIFF measurement info
 * - Sensor locations and bad channels via the sequential tag scanner
 *
 * # Limitations
 * - No SSP projectors, CTF compensation or coordinate transformations
 * - Data skips are only honored at the start of the raw block
 */

use super::fif_tags::{self, FifExtras};
use super::{FileMetadata, RecordingReader};
use crate::error::{EegError, Result};
use crate::types::{Channel, ChannelKind, FileFormat, Recording, RecordingMetadata};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use fiff::{
    dir_tree_find, open_fiff, type_size, MeasInfo, Tag, TreeNode, FIFFB_CONTINUOUS_DATA,
    FIFFB_RAW_DATA, FIFF_DATA_BUFFER, FIFF_DATA_SKIP, FIFF_FIRST_SAMPLE,
};

/// EEG is stored in volts; figures use microvolts
const VOLTS_TO_MICROVOLTS: f64 = 1e6;

pub struct FifFileReader {
    file_path: String,
    reader: BufReader<File>,
    raw_node: TreeNode,
    meas_info: MeasInfo,
    extras: FifExtras,
    first_samp: i64,
    /// Index of the first directory entry after FIRST_SAMPLE / initial skip
    first_entry: usize,
    num_samples: usize,
}

impl FifFileReader {
    pub fn new(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EegError::FileNotFound(path.display().to_string()));
        }
        let file_path = path.to_string_lossy().to_string();
        let start_total = std::time::Instant::now();

        let (mut reader, tree) = open_fiff(path)
            .map_err(|e| EegError::fif(format!("Failed to open FIF file: {}", e)))?;

        let meas_info = MeasInfo::read(&mut reader, &tree)
            .map_err(|e| EegError::fif(format!("Failed to read measurement info: {}", e)))?;

        let raw_nodes = dir_tree_find(&tree, FIFFB_RAW_DATA);
        let raw_node = if raw_nodes.is_empty() {
            let cont_nodes = dir_tree_find(&tree, FIFFB_CONTINUOUS_DATA);
            if cont_nodes.is_empty() {
                return Err(EegError::fif("No raw or continuous data found in FIF file"));
            }
            cont_nodes[0].clone()
        } else {
            raw_nodes[0].clone()
        };

        let directory = &raw_node.directory;
        let mut first = 0;
        let mut first_samp = 0i64;

        if let Some(entry) = directory.get(first) {
            if entry.kind == FIFF_FIRST_SAMPLE {
                if let Ok(tag) = Tag::read_at(&mut reader, entry.pos) {
                    if let Ok(val) = tag.as_i32() {
                        first_samp = val as i64;
                        first += 1;
                    }
                }
            }
        }

        if let Some(entry) = directory.get(first) {
            if entry.kind == FIFF_DATA_SKIP {
                first += 1;
            }
        }

        let nchan = meas_info.nchan;
        let mut num_samples = 0usize;
        for entry in directory.iter().skip(first) {
            if entry.kind == FIFF_DATA_BUFFER {
                if let Some(type_sz) = type_size(entry.type_) {
                    num_samples += entry.size as usize / (type_sz * nchan);
                }
            }
        }

        let extras = {
            let mut scan_reader = BufReader::new(File::open(path)?);
            fif_tags::scan(&mut scan_reader)?
        };

        log::info!(
            "FIF opened {}: {} channels, {} samples at {} Hz (first_samp={}) in {:?}",
            file_path,
            nchan,
            num_samples,
            meas_info.sfreq,
            first_samp,
            start_total.elapsed()
        );

        Ok(Self {
            file_path,
            reader,
            raw_node,
            meas_info,
            extras,
            first_samp,
            first_entry: first,
            num_samples,
        })
    }

    fn channel_kind(&self, idx: usize) -> ChannelKind {
        ChannelKind::from_fiff_code(self.meas_info.channels[idx].kind)
    }

    fn channel_scale(&self, idx: usize) -> f64 {
        let calibration = self.meas_info.channels[idx].calibration();
        if self.channel_kind(idx) == ChannelKind::Eeg {
            calibration * VOLTS_TO_MICROVOLTS
        } else {
            calibration
        }
    }

    /// Read calibrated samples for `channel_indices` over the requested range.
    fn read_data_range(
        &mut self,
        start_sample: usize,
        num_samples: usize,
        channel_indices: &[usize],
    ) -> Result<Vec<Vec<f64>>> {
        let start_read = std::time::Instant::now();
        let nchan = self.meas_info.nchan;
        let mut result = vec![vec![0.0f64; num_samples]; channel_indices.len()];

        let mut current_sample = 0usize;
        let mut buffer_start = 0usize;

        for entry in self.raw_node.directory.iter().skip(self.first_entry) {
            if entry.kind != FIFF_DATA_BUFFER {
                continue;
            }

            let type_sz = type_size(entry.type_)
                .ok_or_else(|| EegError::fif(format!("Unknown FIFF type: {}", entry.type_)))?;
            let buffer_nsamp = entry.size as usize / (type_sz * nchan);
            let buffer_end = buffer_start + buffer_nsamp;

            let overlaps = buffer_end > start_sample && buffer_start < start_sample + num_samples;
            if !overlaps {
                buffer_start = buffer_end;
                continue;
            }

            let tag = Tag::read_at(&mut self.reader, entry.pos)
                .map_err(|e| EegError::fif(format!("Failed to read data buffer: {}", e)))?;
            let all_samples = tag
                .as_samples(nchan)
                .map_err(|e| EegError::fif(format!("Failed to parse samples: {}", e)))?;

            let buf_offset = start_sample.saturating_sub(buffer_start);
            let samples_to_copy = (buffer_nsamp - buf_offset).min(num_samples - current_sample);

            for (out_ch_idx, &orig_ch_idx) in channel_indices.iter().enumerate() {
                let src = &all_samples[orig_ch_idx][buf_offset..buf_offset + samples_to_copy];
                let dst = &mut result[out_ch_idx][current_sample..current_sample + samples_to_copy];
                dst.copy_from_slice(src);
            }

            current_sample += samples_to_copy;
            if current_sample >= num_samples {
                break;
            }
            buffer_start = buffer_end;
        }

        if current_sample < num_samples {
            return Err(EegError::fif(format!(
                "Raw data ended after {} of {} requested samples",
                current_sample, num_samples
            )));
        }

        for (out_ch_idx, &orig_ch_idx) in channel_indices.iter().enumerate() {
            let scaling = self.channel_scale(orig_ch_idx);
            if scaling != 1.0 {
                for sample in &mut result[out_ch_idx] {
                    *sample *= scaling;
                }
            }
        }

        log::debug!(
            "FIF read {} samples x {} channels in {:?}",
            num_samples,
            channel_indices.len(),
            start_read.elapsed()
        );
        Ok(result)
    }
}

impl RecordingReader for FifFileReader {
    fn metadata(&self) -> Result<FileMetadata> {
        let channels = self
            .meas_info
            .channels
            .iter()
            .enumerate()
            .map(|(idx, ch)| (ch.ch_name.clone(), self.channel_kind(idx)))
            .collect();

        let mut metadata = FileMetadata::build(
            Path::new(&self.file_path),
            FileFormat::FIF,
            self.meas_info.sfreq,
            self.num_samples,
            channels,
            self.extras.bad_channels.clone(),
            None,
        )?;
        metadata.first_sample = self.first_samp;
        Ok(metadata)
    }

    fn read(
        &mut self,
        start_sample: usize,
        num_samples: usize,
        channels: Option<&[String]>,
    ) -> Result<Recording> {
        if start_sample + num_samples > self.num_samples {
            return Err(EegError::InvalidParameter(format!(
                "Requested samples {}..{} beyond file end ({})",
                start_sample,
                start_sample + num_samples,
                self.num_samples
            )));
        }

        let channel_indices: Vec<usize> = match channels {
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    let idx = self
                        .meas_info
                        .channels
                        .iter()
                        .position(|ch| &ch.ch_name == name);
                    if idx.is_none() {
                        log::warn!("Channel '{}' not found in {}", name, self.file_path);
                    }
                    idx
                })
                .collect(),
            None => (0..self.meas_info.nchan).collect(),
        };

        let data = self.read_data_range(start_sample, num_samples, &channel_indices)?;

        let channels = channel_indices
            .iter()
            .zip(data)
            .map(|(&idx, samples)| {
                let name = self.meas_info.channels[idx].ch_name.clone();
                let kind = self.channel_kind(idx);
                let mut channel = Channel::new(name, kind, samples);
                channel.position = self.extras.position_of(&channel.label);
                channel
            })
            .collect();

        let metadata = RecordingMetadata {
            source_file: self.file_path.clone(),
            source_format: self.format_name().to_string(),
            sample_rate: self.meas_info.sfreq,
            start_time: None,
            bad_channels: self.extras.bad_channels.clone(),
        };
        Recording::new(metadata, channels)
    }

    fn format_name(&self) -> &'static str {
        "FIF"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::fif_tags::test_support::FifBuilder;

    const FIFFB_MEAS: i32 = 100;
    const FIFFB_MEAS_INFO: i32 = 101;
    const FIFFB_RAW: i32 = 102;
    const FIFFB_BADS: i32 = 359;
    const NCHAN: i32 = 200;
    const SFREQ: i32 = 201;
    const FIRST_SAMPLE: i32 = 208;
    const DATA_SKIP: i32 = 301;
    const BAD_NAMES: i32 = 3502;

    /// Raw value of channel `ch` at sample `t`
    fn raw_value(ch: usize, t: usize) -> f32 {
        (10 * ch + t) as f32
    }

    /// 3 channels at 100 Hz: two EEG (one with range 2) and a stim channel.
    /// Raw block: first sample 25, an initial skip, then two 4-sample buffers.
    fn write_raw_fif(path: &Path) {
        let buffer = |from: usize| -> Vec<Vec<f32>> {
            (from..from + 4)
                .map(|t| (0..3).map(|ch| raw_value(ch, t)).collect())
                .collect()
        };

        let mut b = FifBuilder::new();
        b.file_header()
            .block_start(FIFFB_MEAS)
            .block_start(FIFFB_MEAS_INFO)
            .int(NCHAN, 3)
            .float(SFREQ, 100.0)
            .ch_info_calibrated("EEG 001", 2, [0.01, 0.08, 0.05], 2.0, 1e-6)
            .ch_info_calibrated("EEG 002", 2, [-0.03, 0.02, 0.09], 1.0, 1e-6)
            .ch_info_calibrated("STI 014", 3, [0.0, 0.0, 0.0], 1.0, 1.0)
            .block_start(FIFFB_BADS)
            .string(BAD_NAMES, "EEG 002")
            .block_end(FIFFB_BADS)
            .block_end(FIFFB_MEAS_INFO)
            .block_start(FIFFB_RAW)
            .int(FIRST_SAMPLE, 25)
            .int(DATA_SKIP, 1)
            .data_buffer(&buffer(0))
            .data_buffer(&buffer(4))
            .block_end(FIFFB_RAW)
            .block_end(FIFFB_MEAS)
            .end_file();
        std::fs::write(path, &b.bytes).unwrap();
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-4 * e.abs().max(1.0), "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_raw_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny_raw.fif");
        write_raw_fif(&path);

        let reader = FifFileReader::new(&path).unwrap();
        let meta = reader.metadata().unwrap();
        assert_eq!(meta.format, FileFormat::FIF);
        assert_eq!(meta.sample_rate, 100.0);
        assert_eq!(meta.num_samples, 8);
        assert_eq!(meta.first_sample, 25);
        assert_eq!(meta.bad_channels, vec!["EEG 002"]);
        assert_eq!(meta.labels_of_kind(ChannelKind::Eeg, false), vec!["EEG 001", "EEG 002"]);
        assert_eq!(meta.labels_of_kind(ChannelKind::Stim, false), vec!["STI 014"]);
    }

    #[test]
    fn test_read_across_buffers_calibrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny_raw.fif");
        write_raw_fif(&path);

        let mut reader = FifFileReader::new(&path).unwrap();
        let picks = vec!["STI 014".to_string(), "EEG 001".to_string()];
        let rec = reader.read(2, 4, Some(picks.as_slice())).unwrap();

        assert_eq!(rec.num_samples(), 4);
        assert_eq!(rec.channels[0].label, "STI 014");
        assert_eq!(rec.channels[0].kind, ChannelKind::Stim);
        // Stim: cal 1, left in file units
        assert_close(&rec.channels[0].samples, &[22.0, 23.0, 24.0, 25.0]);
        // EEG: raw × (cal 1e-6 × range 2) V, reported in µV
        assert_close(&rec.channels[1].samples, &[4.0, 6.0, 8.0, 10.0]);
        assert!(rec.channels[1].position.is_some());
        assert!(rec.channels[0].position.is_none());
    }

    #[test]
    fn test_read_all_channels_second_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny_raw.fif");
        write_raw_fif(&path);

        let mut reader = FifFileReader::new(&path).unwrap();
        let rec = reader.read(5, 3, None).unwrap();
        assert_eq!(rec.channels.len(), 3);
        let expected: Vec<f64> = (5..8).map(|t| raw_value(1, t) as f64).collect();
        assert_close(&rec.channels[1].samples, &expected);

        let whole = reader.read_all(None).unwrap();
        assert_eq!(whole.num_samples(), 8);
    }

    #[test]
    fn test_read_past_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny_raw.fif");
        write_raw_fif(&path);

        let mut reader = FifFileReader::new(&path).unwrap();
        assert!(matches!(reader.read(6, 4, None), Err(EegError::InvalidParameter(_))));
    }

    #[test]
    fn test_nonexistent_file() {
        let result = FifFileReader::new(Path::new("/nonexistent/file.fif"));
        assert!(matches!(result, Err(EegError::FileNotFound(_))));
    }

    #[test]
    fn test_sample_dataset_if_present() {
        let Ok(path) = crate::config::resolve_sample_path(None) else {
            eprintln!("Skipping: MNE sample dataset not found");
            return;
        };

        let mut reader = FifFileReader::new(&path).unwrap();
        let meta = reader.metadata().unwrap();
        assert!(meta.sample_rate > 500.0);
        let eeg: Vec<String> = meta
            .channels
            .iter()
            .filter(|c| c.kind == ChannelKind::Eeg)
            .map(|c| c.label.clone())
            .collect();
        assert!(eeg.len() >= 59);

        let rec = reader.read(0, 100, Some(eeg.as_slice())).unwrap();
        assert_eq!(rec.num_samples(), 100);
        assert!(rec.channels.iter().all(|c| c.position.is_some()));
        // EEG in µV: tens of microvolts, not 1e-5 volts
        let peak = rec.channels[0]
            .samples
            .iter()
            .fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak > 0.1);
    }
}
