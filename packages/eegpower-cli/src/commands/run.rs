use crate::cli::RunArgs;
use crate::commands::fail;
use crate::exit_codes;
use crate::output;
use eegpower_rs::{EegError, FrequencyBand, Pipeline, PipelineConfig, TopomapConfig};

/// Configuration file (or defaults) with the command-line overrides applied.
fn build_config(args: &RunArgs) -> Result<PipelineConfig, EegError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(ref file) = args.file {
        config.input = Some(file.clone());
    }
    if let Some(ref dir) = args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(tmin) = args.tmin {
        config.tmin = tmin;
    }
    if args.full {
        config.tmax = None;
    } else if let Some(tmax) = args.tmax {
        config.tmax = Some(tmax);
    }
    if let Some(fmax) = args.fmax {
        config.psd.welch.fmax = fmax;
    }
    if !args.bands.is_empty() {
        config.topomaps = args
            .bands
            .iter()
            .map(|b| FrequencyBand::parse(b).map(TopomapConfig::for_band))
            .collect::<Result<_, _>>()?;
    }
    if let Some(ref band) = args.envelope_band {
        config.envelope.band = FrequencyBand::parse(band)?;
    }
    if let Some(percentile) = args.percentile {
        config.envelope.percentile = percentile;
    }
    config.exclude.extend(args.exclude.iter().cloned());
    if args.no_file_bads {
        config.use_file_bads = false;
    }
    if let Some(ref montage) = args.montage {
        config.montage = Some(montage.clone());
    }

    config.validate()?;
    Ok(config)
}

pub fn execute(args: RunArgs) -> i32 {
    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let quiet = args.quiet;
    let pipeline = Pipeline::new(config);
    let report = match pipeline.run(|message| {
        if !quiet {
            eprintln!("{}", message);
        }
    }) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    if let Some(ref path) = args.report {
        let written = output::to_json(&report, false)
            .and_then(|json| output::write_output(&json, Some(path)));
        if let Err(e) = written {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
        if !quiet {
            eprintln!("Report written to {}", path.display());
        }
    }

    if args.json {
        return output::print_json(&report);
    }

    for path in report.outputs() {
        println!("{}", path.display());
    }
    exit_codes::SUCCESS
}
