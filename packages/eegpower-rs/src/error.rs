use thiserror::Error;

#[derive(Error, Debug)]
pub enum EegError {
    #[error("Input file not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse {format} file: {message}")]
    ParseError { format: &'static str, message: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No channels left after selection: {0}")]
    NoChannels(String),

    #[error("Failed to render figure: {0}")]
    RenderError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding failed: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] serde_json::Error),
}

impl EegError {
    pub(crate) fn edf(message: impl Into<String>) -> Self {
        Self::ParseError {
            format: "EDF",
            message: message.into(),
        }
    }

    pub(crate) fn fif(message: impl Into<String>) -> Self {
        Self::ParseError {
            format: "FIF",
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EegError>;
