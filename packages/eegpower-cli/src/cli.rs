use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "eegpower",
    version,
    about = "EEG band-power figures: PSD, band topomaps and envelope power over time",
    long_about = "Render EEG band-power figures from a FIF or EDF recording.\n\
                  Without --file the MNE sample recording is used. Set $EEGPOWER_SAMPLE_PATH\n\
                  or $MNE_DATA if it is not under ~/mne_data."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render the PSD, topomap and envelope power figures
    Run(RunArgs),
    /// Show recording metadata
    Info(InfoArgs),
    /// Check that a recording can be used
    Validate(ValidateArgs),
    /// List the named frequency bands
    Bands(BandsArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Input recording (FIF or EDF); defaults to the MNE sample recording
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// JSON configuration file; command-line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the figures are written to
    #[arg(short = 'd', long)]
    pub output_dir: Option<PathBuf>,

    /// Crop start in seconds
    #[arg(long)]
    pub tmin: Option<f64>,

    /// Crop end in seconds (inclusive)
    #[arg(long, conflicts_with = "full")]
    pub tmax: Option<f64>,

    /// Use the whole recording instead of cropping at --tmax
    #[arg(long, default_value_t = false)]
    pub full: bool,

    /// Highest frequency shown in the PSD plot
    #[arg(long)]
    pub fmax: Option<f64>,

    /// Topomap bands, by name (alpha, high-gamma, ...) or as LOW-HIGH in Hz
    #[arg(long = "band", num_args = 1..)]
    pub bands: Vec<String>,

    /// Band of the channels-vs-time power plot
    #[arg(long)]
    pub envelope_band: Option<String>,

    /// Percentile of envelope power used as the upper colour limit
    #[arg(long)]
    pub percentile: Option<f64>,

    /// Channels to leave out
    #[arg(long, num_args = 1..)]
    pub exclude: Vec<String>,

    /// Keep channels the file marks as bad
    #[arg(long, default_value_t = false)]
    pub no_file_bads: bool,

    /// Electrode positions file (label x y [z] per line)
    #[arg(long)]
    pub montage: Option<PathBuf>,

    /// Write the run report as JSON to stdout
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Suppress progress messages on stderr
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Input recording; defaults to the MNE sample recording
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input recording
    #[arg(long)]
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct BandsArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
