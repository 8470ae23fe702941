use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;
use eegpower_rs::{ChannelKind, FileFormat, ReaderFactory};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize, Default)]
struct ValidateOutput {
    file: String,
    exists: bool,
    readable: bool,
    supported: bool,
    file_type: Option<String>,
    size_bytes: Option<u64>,
    sample_rate: Option<f64>,
    duration: Option<f64>,
    eeg_channels: Option<usize>,
    error: Option<String>,
}

fn inspect(path: &Path) -> ValidateOutput {
    let mut result = ValidateOutput {
        file: path.display().to_string(),
        exists: path.exists(),
        readable: path.is_file() && std::fs::File::open(path).is_ok(),
        ..Default::default()
    };

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let file_type = FileFormat::from_extension(extension);
    result.supported = file_type.is_some();
    result.file_type = file_type.map(|ft| format!("{:?}", ft));
    if result.readable {
        result.size_bytes = std::fs::metadata(path).ok().map(|m| m.len());
    }

    if !result.exists {
        result.error = Some(format!("File not found: {}", result.file));
        return result;
    }
    if !result.readable {
        result.error = Some(format!("File is not readable: {}", result.file));
        return result;
    }
    if !result.supported {
        result.error = Some(format!(
            "Unsupported file extension '{}'. Supported: {}",
            extension,
            FileFormat::supported_extensions().join(", ")
        ));
        return result;
    }

    match ReaderFactory::create_reader(path).and_then(|r| r.metadata()) {
        Ok(meta) => {
            let eeg = meta.labels_of_kind(ChannelKind::Eeg, true).len();
            result.sample_rate = Some(meta.sample_rate);
            result.duration = Some(meta.duration);
            result.eeg_channels = Some(eeg);
            if eeg == 0 {
                result.error = Some("No usable EEG channels".to_string());
            }
        }
        Err(e) => result.error = Some(e.to_string()),
    }
    result
}

pub fn execute(args: ValidateArgs) -> i32 {
    let result = inspect(&args.file);

    if args.json {
        let code = output::print_json(&result);
        if code != exit_codes::SUCCESS {
            return code;
        }
    } else if let Some(ref err) = result.error {
        eprintln!("Error: {}", err);
    } else {
        println!(
            "File '{}' is valid ({}, {} EEG channels at {} Hz, {:.1} s)",
            result.file,
            result.file_type.as_deref().unwrap_or_default(),
            result.eeg_channels.unwrap_or(0),
            result.sample_rate.unwrap_or(0.0),
            result.duration.unwrap_or(0.0)
        );
    }

    if result.error.is_some() {
        exit_codes::INPUT_ERROR
    } else {
        exit_codes::SUCCESS
    }
}
