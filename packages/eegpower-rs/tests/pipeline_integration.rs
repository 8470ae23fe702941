use eegpower_rs::readers::edf::{EdfSignalHeader, EdfWriter};
use eegpower_rs::{EegError, FrequencyBand, Pipeline, PipelineConfig, TopomapConfig};
use std::f64::consts::PI;
use std::path::Path;

const SAMPLE_RATE: usize = 256;
const LABELS: [&str; 10] = ["Fp1", "Fp2", "Fz", "C3", "Cz", "C4", "Pz", "O1", "O2", "EOG left"];

/// 10-20 EEG with a 10 Hz rhythm that grows towards the back of the head,
/// plus one EOG channel that must never reach the figures.
fn write_recording(path: &Path, seconds: usize) {
    let headers = LABELS
        .iter()
        .map(|l| EdfSignalHeader::new(l, "uV", (-500.0, 500.0), SAMPLE_RATE))
        .collect();
    let mut writer = EdfWriter::new(path, "X", "Y", 1.0, headers).unwrap();
    for record in 0..seconds {
        let data: Vec<Vec<f64>> = LABELS
            .iter()
            .enumerate()
            .map(|(ch, _)| {
                let alpha_amp = 5.0 + 5.0 * ch as f64;
                (0..SAMPLE_RATE)
                    .map(|i| {
                        let t = (record * SAMPLE_RATE + i) as f64 / SAMPLE_RATE as f64;
                        alpha_amp * (2.0 * PI * 10.0 * t).sin()
                            + 2.0 * (2.0 * PI * 80.0 * t + ch as f64).sin()
                    })
                    .collect()
            })
            .collect();
        writer.write_physical_record(&data).unwrap();
    }
    writer.finalize().unwrap();
}

fn config_for(input: &Path, output_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        input: Some(input.to_path_buf()),
        output_dir: output_dir.to_path_buf(),
        tmax: Some(15.0),
        ..Default::default()
    }
}

#[test]
fn test_full_run_writes_four_figures() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rec.edf");
    write_recording(&input, 20);
    let out = dir.path().join("figures");

    let mut messages = Vec::new();
    let report = Pipeline::new(config_for(&input, &out))
        .run(|m| messages.push(m.to_string()))
        .unwrap();

    let names: Vec<String> = report
        .outputs()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "eeg_psd.png",
            "eeg_alpha_topomap.png",
            "eeg_high_gamma_topomap.png",
            "eeg_power_channels_vs_time.png",
        ]
    );
    for path in report.outputs() {
        let img = image::open(path).unwrap();
        assert!(img.width() > 0 && img.height() > 0);
    }

    assert_eq!(report.channels.len(), 9);
    assert!(!report.channels.contains(&"EOG left".to_string()));
    assert_eq!(report.sample_rate, 256.0);
    // Inclusive crop: 15 s plus the sample at t = 15
    assert!((report.duration - (15.0 * 256.0 + 1.0) / 256.0).abs() < 1e-9);

    assert_eq!(messages.first().map(String::as_str), Some("Loading sample data..."));
    assert!(messages.iter().any(|m| m == "Computing Hilbert transform..."));
    assert!(messages.last().unwrap().starts_with("Plot saved to "));
}

#[test]
fn test_alpha_rms_follows_amplitude() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rec.edf");
    write_recording(&input, 12);

    let report = Pipeline::new(PipelineConfig {
        tmax: None,
        ..config_for(&input, dir.path())
    })
    .run(|_| {})
    .unwrap();

    let alpha = &report.topomaps[0];
    assert_eq!(alpha.band, FrequencyBand::alpha());
    let rms_of = |label: &str| {
        let i = alpha.channels.iter().position(|c| c == label).unwrap();
        alpha.rms[i]
    };
    // Sine RMS is amplitude / √2: Fp1 has 5 µV, O2 has 45 µV. The band
    // edges sit close to 10 Hz, so allow for some pass-band attenuation.
    let fp1 = rms_of("Fp1");
    let o2 = rms_of("O2");
    assert!((fp1 / (5.0 / 2f64.sqrt()) - 0.9).abs() < 0.15, "Fp1 rms {}", fp1);
    assert!((o2 / (45.0 / 2f64.sqrt()) - 0.9).abs() < 0.15, "O2 rms {}", o2);
    assert!((o2 / fp1 - 9.0).abs() < 0.5);
    assert!(o2 > rms_of("Cz"));

    assert!(report.envelope.vmax > 0.0);
    assert_eq!(report.envelope.percentile, 95.0);
}

#[test]
fn test_excluded_channels_and_custom_band() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rec.edf");
    write_recording(&input, 10);

    let config = PipelineConfig {
        tmax: None,
        exclude: vec!["Fp1".to_string(), "Fp2".to_string()],
        topomaps: vec![TopomapConfig::for_band(FrequencyBand::parse("beta").unwrap())],
        ..config_for(&input, dir.path())
    };
    let mut messages = Vec::new();
    let report = Pipeline::new(config).run(|m| messages.push(m.to_string())).unwrap();

    // Only EEG channels count as excluded
    assert_eq!(report.excluded, vec!["Fp1", "Fp2"]);
    assert_eq!(report.channels.len(), 7);
    assert!(dir.path().join("eeg_beta_topomap.png").exists());
    // Alpha is not among the topomaps, so the envelope stage filters on its own
    assert!(messages.iter().any(|m| m == "Filtering data for Alpha (8-12 Hz)..."));
}

#[test]
fn test_tmax_beyond_recording_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rec.edf");
    write_recording(&input, 5);

    let err = Pipeline::new(config_for(&input, dir.path()))
        .run(|_| {})
        .unwrap_err();
    assert!(matches!(err, EegError::InvalidParameter(_)));
    assert!(!dir.path().join("eeg_psd.png").exists());
}

#[test]
fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::new(config_for(&dir.path().join("nope.edf"), dir.path()))
        .run(|_| {})
        .unwrap_err();
    assert!(matches!(err, EegError::FileNotFound(_)));
}
