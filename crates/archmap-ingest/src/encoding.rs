//! Detection and repair of mis-decoded Korean attribute text.

use archmap_model::{DataWarning, Layer, LayerHost};
use encoding_rs::{EUC_KR, Encoding};
use tracing::{info, warn};

/// Attribute values inspected per layer.
pub const SAMPLE_SIZE: usize = 200;

/// Codepage used for the repair reload (CP949 superset of EUC-KR).
pub fn secondary_encoding() -> &'static Encoding {
    EUC_KR
}

/// Evidence of corrupted text in a layer's attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CorruptionReport {
    pub sampled: usize,
    pub replacement_chars: usize,
    pub mojibake: usize,
}

impl CorruptionReport {
    pub fn is_corrupted(&self) -> bool {
        self.replacement_chars > 0 || self.mojibake > 0
    }
}

/// Samples text values of `layer` and counts corrupted ones.
pub fn detect(layer: &Layer) -> CorruptionReport {
    let samples = layer.text_samples(SAMPLE_SIZE);
    let mut report = CorruptionReport {
        sampled: samples.len(),
        ..CorruptionReport::default()
    };
    for sample in samples {
        if sample.contains('\u{FFFD}') {
            report.replacement_chars += 1;
        } else if looks_like_mojibake(sample) {
            report.mojibake += 1;
        }
    }
    report
}

/// CP949 bytes read as Latin-1 turn into runs of characters in U+00A1..=U+00FE.
fn looks_like_mojibake(text: &str) -> bool {
    if text.chars().any(is_hangul) {
        return false;
    }
    let mut run = 0;
    for ch in text.chars() {
        if ('\u{00A1}'..='\u{00FE}').contains(&ch) {
            run += 1;
            if run >= 2 {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn is_hangul(ch: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&ch) || ('\u{1100}'..='\u{11FF}').contains(&ch)
}

/// Result of one repair attempt.
#[derive(Debug)]
pub struct RepairOutcome {
    pub layer: Layer,
    pub repaired: bool,
    pub warning: Option<DataWarning>,
}

/// Reloads corrupted layers through the host with the secondary codepage.
///
/// The reload replaces the layer only when it succeeds and holds at least as
/// many features as the original. Otherwise the original is kept and a
/// warning describes why.
pub fn repair<H: LayerHost + ?Sized>(layer: Layer, host: &mut H) -> RepairOutcome {
    let report = detect(&layer);
    if !report.is_corrupted() {
        return RepairOutcome {
            layer,
            repaired: false,
            warning: None,
        };
    }
    info!(
        layer = %layer.name,
        sampled = report.sampled,
        replacement = report.replacement_chars,
        mojibake = report.mojibake,
        "corrupted text detected, reloading"
    );
    let original = layer.feature_count();
    match host.reload_with_encoding(&layer, secondary_encoding()) {
        Ok(reloaded) if reloaded.feature_count() >= original => {
            info!(
                layer = %layer.name,
                encoding = secondary_encoding().name(),
                count = reloaded.feature_count(),
                "encoding repaired"
            );
            RepairOutcome {
                layer: reloaded,
                repaired: true,
                warning: None,
            }
        }
        Ok(reloaded) => {
            let count = reloaded.feature_count();
            warn!(
                layer = %layer.name,
                original,
                reloaded = count,
                "reload yielded fewer features, keeping original"
            );
            let warning = DataWarning::EncodingRepairFailed {
                layer: layer.name.clone(),
                original,
                reloaded: Some(count),
                reason: "reload yielded fewer features".to_string(),
            };
            RepairOutcome {
                layer,
                repaired: false,
                warning: Some(warning),
            }
        }
        Err(error) => {
            warn!(layer = %layer.name, error = %error, "encoding reload failed");
            let warning = DataWarning::EncodingRepairFailed {
                layer: layer.name.clone(),
                original,
                reloaded: None,
                reason: error.to_string(),
            };
            RepairOutcome {
                layer,
                repaired: false,
                warning: Some(warning),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use archmap_model::{Crs, Feature};

    use super::*;

    fn layer_with(values: &[&str]) -> Layer {
        let features = values
            .iter()
            .zip(1u64..)
            .map(|(value, id)| Feature::new(id, None).with_attribute("name", *value))
            .collect();
        Layer::new("l", "layer", Crs::default()).with_features(features)
    }

    #[test]
    fn clean_hangul_is_not_corrupted() {
        assert!(!detect(&layer_with(&["A사지", "경주 황룡사지"])).is_corrupted());
    }

    #[test]
    fn replacement_characters_are_detected() {
        let report = detect(&layer_with(&["A\u{FFFD}\u{FFFD}", "ok"]));
        assert_eq!(report.replacement_chars, 1);
        assert!(report.is_corrupted());
    }

    #[test]
    fn latin1_mojibake_is_detected() {
        // "사지" in CP949 (BB E7 C1 F6) read as Latin-1.
        let report = detect(&layer_with(&["\u{BB}\u{E7}\u{C1}\u{F6}"]));
        assert_eq!(report.mojibake, 1);
        // A single accented letter is ordinary text.
        assert!(!detect(&layer_with(&["Café"])).is_corrupted());
    }
}
