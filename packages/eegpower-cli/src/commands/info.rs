use crate::cli::InfoArgs;
use crate::commands::fail;
use crate::exit_codes;
use crate::output;
use eegpower_rs::{resolve_sample_path, ChannelKind, FileMetadata, ReaderFactory};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct InfoOutput {
    cli_version: String,
    #[serde(flatten)]
    metadata: FileMetadata,
    channel_counts: BTreeMap<String, usize>,
    eeg_channels: Vec<String>,
}

pub fn execute(args: InfoArgs) -> i32 {
    let path = match resolve_sample_path(args.file.as_deref()) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let metadata = match ReaderFactory::create_reader(&path).and_then(|r| r.metadata()) {
        Ok(m) => m,
        Err(e) => return fail(&e),
    };

    let mut channel_counts = BTreeMap::new();
    for channel in &metadata.channels {
        *channel_counts.entry(channel.kind.to_string()).or_insert(0) += 1;
    }
    let info = InfoOutput {
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        eeg_channels: metadata.labels_of_kind(ChannelKind::Eeg, true),
        channel_counts,
        metadata,
    };

    if args.json {
        return output::print_json(&info);
    }

    let meta = &info.metadata;
    println!("eegpower CLI v{}", info.cli_version);
    println!();
    println!("File:        {}", meta.file_path);
    println!("Format:      {:?}", meta.format);
    println!("Size:        {} bytes", meta.file_size);
    println!("Sample rate: {} Hz", meta.sample_rate);
    println!("Samples:     {} ({:.2} s)", meta.num_samples, meta.duration);
    if meta.first_sample != 0 {
        println!("First sample: {}", meta.first_sample);
    }
    if let Some(ref start) = meta.start_time {
        println!("Start time:  {}", start);
    }
    let counts: Vec<String> = info
        .channel_counts
        .iter()
        .map(|(kind, n)| format!("{} {}", n, kind))
        .collect();
    println!("Channels:    {} ({})", meta.num_channels, counts.join(", "));
    if meta.bad_channels.is_empty() {
        println!("Bad:         none");
    } else {
        println!("Bad:         {}", meta.bad_channels.join(", "));
    }
    println!("EEG used:    {}", info.eeg_channels.join(", "));

    exit_codes::SUCCESS
}
