/// EDF (European Data Format) recording reader
///
/// Implementation of RecordingReader for EDF and EDF+ files. Annotation
/// signals are skipped, and only signals sharing the reference sample rate
/// (that of the first EEG signal) are exposed.
use super::edf::EdfReader;
use super::{FileMetadata, RecordingReader};
use crate::classify::classify_channel_label;
use crate::error::{EegError, Result};
use crate::types::{Channel, ChannelKind, FileFormat, Recording, RecordingMetadata};
use chrono::NaiveDate;
use std::path::Path;

pub struct EdfFileReader {
    edf: EdfReader,
    path: String,
    sample_rate: f64,
    /// (signal index, kind) of every exposed signal
    signals: Vec<(usize, ChannelKind)>,
}

impl EdfFileReader {
    pub fn new(path: &Path) -> Result<Self> {
        let edf = EdfReader::new(path)?;
        let record_duration = edf.header.duration_of_data_record;

        let candidates: Vec<(usize, ChannelKind)> = edf
            .signal_headers
            .iter()
            .enumerate()
            .filter(|(_, sh)| !sh.is_annotation())
            .map(|(idx, sh)| (idx, classify_channel_label(&sh.label)))
            .collect();

        let reference = candidates
            .iter()
            .find(|(_, kind)| *kind == ChannelKind::Eeg)
            .or_else(|| candidates.first())
            .map(|&(idx, _)| idx)
            .ok_or_else(|| EegError::edf("File contains no data signals"))?;
        let reference_per_record = edf.signal_headers[reference].num_samples_per_record;
        let sample_rate = edf.signal_headers[reference].sample_frequency(record_duration);

        let signals = candidates
            .into_iter()
            .filter(|&(idx, _)| {
                let sh = &edf.signal_headers[idx];
                let same_rate = sh.num_samples_per_record == reference_per_record;
                if !same_rate {
                    log::warn!(
                        "Skipping EDF signal '{}': {} Hz differs from {} Hz",
                        sh.label,
                        sh.sample_frequency(record_duration),
                        sample_rate
                    );
                }
                same_rate
            })
            .collect();

        Ok(Self {
            edf,
            path: path.to_string_lossy().to_string(),
            sample_rate,
            signals,
        })
    }

    fn num_samples(&self) -> usize {
        self.signals
            .first()
            .map(|&(idx, _)| {
                self.edf.num_records() * self.edf.signal_headers[idx].num_samples_per_record
            })
            .unwrap_or(0)
    }

    fn label(&self, idx: usize) -> &str {
        &self.edf.signal_headers[idx].label
    }
}

/// Parse EDF `dd.mm.yy` / `hh.mm.ss` into RFC 3339 (UTC assumed).
///
/// Two-digit years follow the EDF clipping rule: 85-99 → 1985-1999, otherwise 20xx.
pub fn parse_edf_datetime(date: &str, time: &str) -> Option<String> {
    let num = |s: &str| s.trim().parse::<u32>().ok();
    let d: Vec<u32> = date.split('.').map(num).collect::<Option<_>>()?;
    let t: Vec<u32> = time.split('.').map(num).collect::<Option<_>>()?;
    if d.len() != 3 || t.len() != 3 {
        return None;
    }
    let century = if d[2] >= 85 { 1900 } else { 2000 };
    let year = (century + d[2]) as i32;
    let datetime = NaiveDate::from_ymd_opt(year, d[1], d[0])?.and_hms_opt(t[0], t[1], t[2])?;
    Some(datetime.and_utc().to_rfc3339())
}

impl RecordingReader for EdfFileReader {
    fn metadata(&self) -> Result<FileMetadata> {
        let header = &self.edf.header;
        let channels = self
            .signals
            .iter()
            .map(|&(idx, kind)| (self.label(idx).to_string(), kind))
            .collect();

        FileMetadata::build(
            Path::new(&self.path),
            FileFormat::EDF,
            self.sample_rate,
            self.num_samples(),
            channels,
            Vec::new(),
            parse_edf_datetime(&header.start_date, &header.start_time),
        )
    }

    fn read(
        &mut self,
        start_sample: usize,
        num_samples: usize,
        channels: Option<&[String]>,
    ) -> Result<Recording> {
        if start_sample + num_samples > self.num_samples() {
            return Err(EegError::InvalidParameter(format!(
                "Requested samples {}..{} beyond file end ({})",
                start_sample,
                start_sample + num_samples,
                self.num_samples()
            )));
        }

        let selected: Vec<(usize, ChannelKind)> = match channels {
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    let found = self
                        .signals
                        .iter()
                        .find(|&&(idx, _)| self.label(idx) == name.as_str())
                        .copied();
                    if found.is_none() {
                        log::warn!("Channel '{}' not found in {}", name, self.path);
                    }
                    found
                })
                .collect(),
            None => self.signals.clone(),
        };

        let indices: Vec<usize> = selected.iter().map(|&(idx, _)| idx).collect();
        let data = self.edf.read_signals(&indices, start_sample, num_samples)?;

        let channels = selected
            .iter()
            .zip(data)
            .map(|(&(idx, kind), mut samples)| {
                let sh = &self.edf.signal_headers[idx];
                let mut unit = sh.physical_dimension.clone();
                if kind == ChannelKind::Eeg {
                    match sh.microvolt_scale() {
                        Some(scale) => {
                            if scale != 1.0 {
                                samples.iter_mut().for_each(|s| *s *= scale);
                            }
                            unit = "uV".to_string();
                        }
                        None => log::warn!(
                            "EEG signal '{}' has non-voltage unit '{}', left unscaled",
                            sh.label,
                            sh.physical_dimension
                        ),
                    }
                }
                let mut channel = Channel::new(sh.label.clone(), kind, samples);
                channel.unit = unit;
                channel
            })
            .collect();

        let metadata = RecordingMetadata {
            source_file: self.path.clone(),
            source_format: self.format_name().to_string(),
            sample_rate: self.sample_rate,
            start_time: parse_edf_datetime(&self.edf.header.start_date, &self.edf.header.start_time),
            bad_channels: Vec::new(),
        };
        Recording::new(metadata, channels)
    }

    fn format_name(&self) -> &'static str {
        if self.edf.header.is_edf_plus() {
            "EDF+"
        } else {
            "EDF"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::edf::{EdfSignalHeader, EdfWriter};

    fn write_mixed_edf(path: &Path) {
        let headers = vec![
            EdfSignalHeader::new("Fz", "mV", (-1.0, 1.0), 100),
            EdfSignalHeader::new("EOG left", "uV", (-1000.0, 1000.0), 100),
            EdfSignalHeader::new("Resp", "", (-1.0, 1.0), 25),
            EdfSignalHeader::new("EDF Annotations", "", (-1.0, 1.0), 10),
        ];
        let mut writer = EdfWriter::new(path, "X", "Y", 1.0, headers).unwrap();
        for _ in 0..3 {
            writer
                .write_physical_record(&[
                    vec![0.1; 100],
                    vec![50.0; 100],
                    vec![0.0; 25],
                    vec![0.0; 10],
                ])
                .unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_metadata_skips_annotations_and_other_rates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.edf");
        write_mixed_edf(&path);

        let reader = EdfFileReader::new(&path).unwrap();
        let meta = reader.metadata().unwrap();
        assert_eq!(meta.sample_rate, 100.0);
        assert_eq!(meta.num_samples, 300);
        let labels: Vec<&str> = meta.channels.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Fz", "EOG left"]);
        assert_eq!(meta.channels[0].kind, ChannelKind::Eeg);
        assert_eq!(meta.channels[1].kind, ChannelKind::Eog);
        assert_eq!(meta.start_time.as_deref(), Some("2024-01-01T00:00:00+00:00"));
    }

    #[test]
    fn test_eeg_scaled_to_microvolts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.edf");
        write_mixed_edf(&path);

        let mut reader = EdfFileReader::new(&path).unwrap();
        let rec = reader.read(50, 200, None).unwrap();
        assert_eq!(rec.num_samples(), 200);
        let fz = rec.get_channel("Fz").unwrap();
        assert_eq!(fz.unit, "uV");
        assert!((fz.samples[0] - 100.0).abs() < 0.1);
        let eog = rec.get_channel("EOG left").unwrap();
        assert!((eog.samples[0] - 50.0).abs() < 0.1);
    }

    #[test]
    fn test_read_beyond_end_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.edf");
        write_mixed_edf(&path);

        let mut reader = EdfFileReader::new(&path).unwrap();
        assert!(reader.read(250, 100, None).is_err());
    }

    #[test]
    fn test_parse_edf_datetime() {
        assert_eq!(
            parse_edf_datetime("17.04.01", "11.25.00").as_deref(),
            Some("2001-04-17T11:25:00+00:00")
        );
        assert_eq!(
            parse_edf_datetime("31.12.99", "23.59.59").as_deref(),
            Some("1999-12-31T23:59:59+00:00")
        );
        assert!(parse_edf_datetime("garbage", "11.25.00").is_none());
        assert!(parse_edf_datetime("32.01.20", "00.00.00").is_none());
    }
}
