pub mod bands;
pub mod classify;
pub mod config;
pub mod error;
pub mod montage;
pub mod pipeline;
pub mod readers;
pub mod render;
pub mod signal;
pub mod types;

pub use bands::FrequencyBand;
pub use config::{resolve_sample_path, EnvelopeConfig, PipelineConfig, PsdConfig, TopomapConfig};
pub use error::{EegError, Result};
pub use montage::{sensor_layout, Montage, SensorLayout};
pub use pipeline::{EnvelopeReport, Pipeline, RunReport, TopomapReport};
pub use readers::{FileMetadata, ReaderFactory, RecordingReader};
pub use types::*;
