/// File Readers Module
///
/// Every supported format implements [`RecordingReader`] and produces a
/// [`Recording`] in physical units. The factory picks a reader from the file
/// extension.
use crate::error::{EegError, Result};
use crate::types::{ChannelKind, FileFormat, Recording};
use serde::Serialize;
use std::path::Path;

pub mod edf;
pub mod edf_reader;
pub mod fif_reader;
pub mod fif_tags;

pub use edf_reader::EdfFileReader;
pub use fif_reader::FifFileReader;

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub label: String,
    pub kind: ChannelKind,
}

/// Common metadata for all file formats
#[derive(Debug, Clone, Serialize)]
pub struct FileMetadata {
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub format: FileFormat,
    pub sample_rate: f64,
    pub num_channels: usize,
    pub num_samples: usize,
    pub duration: f64,
    pub channels: Vec<ChannelSummary>,
    pub bad_channels: Vec<String>,
    pub start_time: Option<String>,
    /// Acquisition sample index of the first stored sample (FIF raw blocks)
    pub first_sample: i64,
}

impl FileMetadata {
    pub(crate) fn build(
        path: &Path,
        format: FileFormat,
        sample_rate: f64,
        num_samples: usize,
        channels: Vec<(String, ChannelKind)>,
        bad_channels: Vec<String>,
        start_time: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            file_path: path.to_string_lossy().to_string(),
            file_name: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string(),
            file_size: std::fs::metadata(path)?.len(),
            format,
            sample_rate,
            num_channels: channels.len(),
            num_samples,
            duration: if sample_rate > 0.0 {
                num_samples as f64 / sample_rate
            } else {
                0.0
            },
            channels: channels
                .into_iter()
                .map(|(label, kind)| ChannelSummary { label, kind })
                .collect(),
            bad_channels,
            start_time,
            first_sample: 0,
        })
    }

    /// Labels of every channel of `kind`, optionally leaving out bad channels.
    pub fn labels_of_kind(&self, kind: ChannelKind, exclude_bads: bool) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| c.kind == kind)
            .filter(|c| !(exclude_bads && self.bad_channels.contains(&c.label)))
            .map(|c| c.label.clone())
            .collect()
    }
}

/// Trait that all file readers implement
pub trait RecordingReader {
    /// Metadata about the file without loading samples
    fn metadata(&self) -> Result<FileMetadata>;

    /// Read a range of samples
    ///
    /// # Arguments
    /// * `start_sample` - Starting sample index
    /// * `num_samples` - Number of samples to read
    /// * `channels` - Optional channel selection by label (None = all channels)
    fn read(
        &mut self,
        start_sample: usize,
        num_samples: usize,
        channels: Option<&[String]>,
    ) -> Result<Recording>;

    /// File format name (e.g., "EDF", "FIF")
    fn format_name(&self) -> &'static str;

    /// Read every sample of the selected channels
    fn read_all(&mut self, channels: Option<&[String]>) -> Result<Recording> {
        let num_samples = self.metadata()?.num_samples;
        self.read(0, num_samples, channels)
    }
}

/// Factory for creating readers based on file extension
pub struct ReaderFactory;

impl ReaderFactory {
    pub fn create_reader(path: &Path) -> Result<Box<dyn RecordingReader>> {
        if !path.exists() {
            return Err(EegError::FileNotFound(path.display().to_string()));
        }

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match FileFormat::from_extension(extension) {
            Some(FileFormat::EDF) => Ok(Box::new(EdfFileReader::new(path)?)),
            Some(FileFormat::FIF) => Ok(Box::new(FifFileReader::new(path)?)),
            None => Err(EegError::UnsupportedFormat(format!(
                "'{}' (supported: {})",
                extension,
                FileFormat::supported_extensions().join(", ")
            ))),
        }
    }

    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(FileFormat::from_extension)
            .is_some()
    }
}
