use crate::types::ChannelKind;

/// Standard 10-20 system electrode labels (case-insensitive matching).
pub(crate) const EEG_10_20_LABELS: &[&str] = &[
    // 10-20 standard
    "fp1", "fp2", "f3", "f4", "c3", "c4", "p3", "p4", "o1", "o2", "f7", "f8", "t3", "t4", "t5",
    "t6", "t7", "t8", "p7", "p8", "fz", "cz", "pz", "oz", // 10-10 extensions
    "af3", "af4", "af7", "af8", "afz", "f1", "f2", "f5", "f6", "f9", "f10", "fc1", "fc2", "fc3",
    "fc4", "fc5", "fc6", "fcz", "ft7", "ft8", "ft9", "ft10", "c1", "c2", "c5", "c6", "cp1", "cp2",
    "cp3", "cp4", "cp5", "cp6", "cpz", "tp7", "tp8", "tp9", "tp10", "p1", "p2", "p5", "p6", "p9",
    "p10", "po3", "po4", "po7", "po8", "poz", "o9", "o10", // 10-5 common additions
    "fpz", "nz", "iz", // Common reference labels
    "a1", "a2", "m1", "m2",
];

/// Classify a channel label into a channel kind.
///
/// Priority order:
/// 1. Type prefix strip (e.g., "EEG Fp1", "EEG 001" → EEG)
/// 2. Known pattern match (EOG, ECG, EMG, STIM, MEG, RESP, MISC)
/// 3. 10-20 system electrode match → EEG
/// 4. Fallback → Unknown
pub fn classify_channel_label(label: &str) -> ChannelKind {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return ChannelKind::Unknown;
    }

    let lower = trimmed.to_lowercase();

    if let Some(kind) = classify_by_prefix(&lower) {
        return kind;
    }

    if let Some(kind) = classify_by_pattern(&lower) {
        return kind;
    }

    if EEG_10_20_LABELS.contains(&lower.as_str()) {
        return ChannelKind::Eeg;
    }

    ChannelKind::Unknown
}

fn classify_by_prefix(lower: &str) -> Option<ChannelKind> {
    let prefixes: &[(&str, ChannelKind)] = &[
        ("eeg ", ChannelKind::Eeg),
        ("eeg-", ChannelKind::Eeg),
        ("eog ", ChannelKind::Eog),
        ("ecg ", ChannelKind::Ecg),
        ("ekg ", ChannelKind::Ecg),
        ("emg ", ChannelKind::Emg),
        ("meg ", ChannelKind::Meg),
        ("stim ", ChannelKind::Stim),
        ("misc ", ChannelKind::Misc),
        ("resp ", ChannelKind::Resp),
        ("ref ", ChannelKind::Eeg),
    ];

    prefixes
        .iter()
        .find(|(prefix, _)| lower.starts_with(prefix))
        .map(|&(_, kind)| kind)
}

fn classify_by_pattern(lower: &str) -> Option<ChannelKind> {
    if lower.starts_with("eog") || lower.ends_with("eog") {
        return Some(ChannelKind::Eog);
    }

    if lower.starts_with("ecg") || lower.starts_with("ekg") {
        return Some(ChannelKind::Ecg);
    }

    if lower.starts_with("emg") {
        return Some(ChannelKind::Emg);
    }

    // STIM / Status / Trigger, plus EDF+ annotation signals
    if lower == "status"
        || lower.starts_with("sti ")
        || lower.starts_with("sti0")
        || lower.starts_with("stim")
        || lower.starts_with("trigger")
        || lower.starts_with("edf annotations")
        || lower.starts_with("bdf annotations")
    {
        return Some(ChannelKind::Stim);
    }

    // MEG0111, MEG 0111
    if lower.starts_with("meg") {
        return Some(ChannelKind::Meg);
    }

    if lower.starts_with("resp") {
        return Some(ChannelKind::Resp);
    }

    if lower.starts_with("misc") {
        return Some(ChannelKind::Misc);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_10_20_labels() {
        assert_eq!(classify_channel_label("Fp1"), ChannelKind::Eeg);
        assert_eq!(classify_channel_label("fp2"), ChannelKind::Eeg);
        assert_eq!(classify_channel_label("Cz"), ChannelKind::Eeg);
        assert_eq!(classify_channel_label("PO7"), ChannelKind::Eeg);
        assert_eq!(classify_channel_label("TP9"), ChannelKind::Eeg);
    }

    #[test]
    fn test_prefixed_labels() {
        assert_eq!(classify_channel_label("EEG 001"), ChannelKind::Eeg);
        assert_eq!(classify_channel_label("EEG Fp1"), ChannelKind::Eeg);
        assert_eq!(classify_channel_label("EOG 061"), ChannelKind::Eog);
        assert_eq!(classify_channel_label("ECG I"), ChannelKind::Ecg);
        assert_eq!(classify_channel_label("EMG chin"), ChannelKind::Emg);
    }

    #[test]
    fn test_patterns() {
        assert_eq!(classify_channel_label("VEOG"), ChannelKind::Eog);
        assert_eq!(classify_channel_label("EKG"), ChannelKind::Ecg);
        assert_eq!(classify_channel_label("STI 014"), ChannelKind::Stim);
        assert_eq!(classify_channel_label("Status"), ChannelKind::Stim);
        assert_eq!(classify_channel_label("EDF Annotations"), ChannelKind::Stim);
        assert_eq!(classify_channel_label("MEG 0113"), ChannelKind::Meg);
        assert_eq!(classify_channel_label("Resp chest"), ChannelKind::Resp);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classify_channel_label(""), ChannelKind::Unknown);
        assert_eq!(classify_channel_label("Channel 7"), ChannelKind::Unknown);
    }
}
