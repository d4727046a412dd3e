//! Heritage site records and the numbered result layer.

use std::fmt;

use geo::Geometry;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::crs::Crs;
use crate::error::PipelineError;
use crate::layer::{AttributeValue, Feature, Layer, LayerId};

/// Field names of the heritage result layer.
pub mod fields {
    pub const SEQUENCE: &str = "번호";
    pub const NAME: &str = "유적명";
    pub const ADDRESS: &str = "주소";
    pub const AREA: &str = "면적_m2";
    pub const HERITAGE_NAME: &str = "국가유산명";
    pub const PROJECT: &str = "사업명";
    pub const SOURCE_LAYER: &str = "원본레이어";
    pub const CATEGORY: &str = "원본구분";
    pub const DESIGNATED: &str = "지정여부";
    pub const ERA: &str = "시대";
    pub const TYPE: &str = "유형";
    pub const TIER: &str = "구간";
    pub const DISTANCE: &str = "거리_m";
    pub const EXCLUDED: &str = "제외";
    pub const EXCLUSION_REASON: &str = "제외사유";

    /// Declaration order of the result layer fields.
    pub const ALL: [&str; 15] = [
        SEQUENCE,
        NAME,
        ADDRESS,
        AREA,
        HERITAGE_NAME,
        PROJECT,
        SOURCE_LAYER,
        CATEGORY,
        DESIGNATED,
        ERA,
        TYPE,
        TIER,
        DISTANCE,
        EXCLUDED,
        EXCLUSION_REASON,
    ];
}

/// Identity key used for dissolve: NFC form, trimmed, inner whitespace collapsed.
pub fn normalize_name(raw: &str) -> String {
    let composed: String = raw.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Why a site is hidden from numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Does not intersect the retained area.
    OutOfRange,
    /// Picked by the user from the exclusion-candidate list.
    Manual,
}

impl ExclusionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OutOfRange => "범위외",
            Self::Manual => "수동제외",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "범위외" | "out_of_range" => Some(Self::OutOfRange),
            "수동제외" | "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeritageSite {
    pub name: String,
    pub geometry: Geometry<f64>,
    pub source_layer_id: LayerId,
    pub source_layer_name: String,
    pub address: Option<String>,
    pub area_m2: Option<f64>,
    pub heritage_name: Option<String>,
    pub project_name: Option<String>,
    /// Raw category attribute of the source feature.
    pub category: Option<String>,
    /// Nationally or provincially designated heritage.
    pub designated: bool,
    pub era: Option<String>,
    pub site_type: Option<String>,
    pub distance_to_study_area: Option<f64>,
    pub tier_index: Option<usize>,
    pub sequence_number: Option<u32>,
    pub excluded: bool,
    pub exclusion: Option<ExclusionReason>,
}

impl HeritageSite {
    pub fn new(name: impl Into<String>, geometry: Geometry<f64>, source: &Layer) -> Self {
        Self {
            name: name.into(),
            geometry,
            source_layer_id: source.id.clone(),
            source_layer_name: source.name.clone(),
            address: None,
            area_m2: None,
            heritage_name: None,
            project_name: None,
            category: None,
            designated: false,
            era: None,
            site_type: None,
            distance_to_study_area: None,
            tier_index: None,
            sequence_number: None,
            excluded: false,
            exclusion: None,
        }
    }

    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn exclude(&mut self, reason: ExclusionReason) {
        self.excluded = true;
        self.exclusion = Some(reason);
        self.sequence_number = None;
    }

    pub fn restore(&mut self) {
        self.excluded = false;
        self.exclusion = None;
    }

    pub fn to_feature(&self, id: u64) -> Feature {
        Feature::new(id, Some(self.geometry.clone()))
            .with_attribute(fields::SEQUENCE, self.sequence_number.map(i64::from))
            .with_attribute(fields::NAME, self.name.as_str())
            .with_attribute(fields::ADDRESS, self.address.clone())
            .with_attribute(fields::AREA, self.area_m2.map(round_2))
            .with_attribute(fields::HERITAGE_NAME, self.heritage_name.clone())
            .with_attribute(fields::PROJECT, self.project_name.clone())
            .with_attribute(fields::SOURCE_LAYER, self.source_layer_name.as_str())
            .with_attribute(fields::CATEGORY, self.category.clone())
            .with_attribute(fields::DESIGNATED, i64::from(self.designated))
            .with_attribute(fields::ERA, self.era.clone())
            .with_attribute(fields::TYPE, self.site_type.clone())
            .with_attribute(
                fields::TIER,
                self.tier_index.and_then(|tier| i64::try_from(tier).ok()),
            )
            .with_attribute(fields::DISTANCE, self.distance_to_study_area.map(round_2))
            .with_attribute(fields::EXCLUDED, i64::from(self.excluded))
            .with_attribute(
                fields::EXCLUSION_REASON,
                self.exclusion.map(|reason| reason.as_str().to_string()),
            )
    }

    /// Rebuilds a site from a result-layer row. Rows without geometry or name yield `None`.
    pub fn from_feature(feature: &Feature, layer: &Layer) -> Option<Self> {
        let geometry = feature.geometry.clone()?;
        let name = feature.text(fields::NAME)?;
        let source_name = feature
            .text(fields::SOURCE_LAYER)
            .unwrap_or_else(|| layer.name.clone());
        let flag = |field: &str| {
            feature
                .attribute(field)
                .is_some_and(|value| match value {
                    AttributeValue::Bool(flag) => *flag,
                    other => other.as_i64().is_some_and(|v| v != 0),
                })
        };
        Some(Self {
            name,
            geometry,
            source_layer_id: LayerId::new(source_name.clone()),
            source_layer_name: source_name,
            address: feature.text(fields::ADDRESS),
            area_m2: feature.attribute(fields::AREA).and_then(AttributeValue::as_f64),
            heritage_name: feature.text(fields::HERITAGE_NAME),
            project_name: feature.text(fields::PROJECT),
            category: feature.text(fields::CATEGORY),
            designated: flag(fields::DESIGNATED),
            era: feature.text(fields::ERA),
            site_type: feature.text(fields::TYPE),
            distance_to_study_area: feature
                .attribute(fields::DISTANCE)
                .and_then(AttributeValue::as_f64),
            tier_index: feature
                .attribute(fields::TIER)
                .and_then(AttributeValue::as_i64)
                .and_then(|tier| usize::try_from(tier).ok()),
            sequence_number: feature
                .attribute(fields::SEQUENCE)
                .and_then(AttributeValue::as_i64)
                .and_then(|seq| u32::try_from(seq).ok()),
            excluded: flag(fields::EXCLUDED),
            exclusion: feature
                .text(fields::EXCLUSION_REASON)
                .and_then(|raw| ExclusionReason::parse(&raw)),
        })
    }
}

fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Display-side filter of the result layer. Hidden rows stay in the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFilter {
    pub hide_excluded: bool,
}

impl DisplayFilter {
    pub const HIDE_EXCLUDED: Self = Self {
        hide_excluded: true,
    };

    /// Host subset expression equivalent to this filter.
    pub fn expression(&self) -> Option<String> {
        self.hide_excluded
            .then(|| format!("\"{}\" = 0", fields::EXCLUDED))
    }

    pub fn is_visible(&self, site: &HeritageSite) -> bool {
        !(self.hide_excluded && site.excluded)
    }
}

impl Default for DisplayFilter {
    fn default() -> Self {
        Self::HIDE_EXCLUDED
    }
}

/// The merged, numbered heritage layer.
#[derive(Debug, Clone, PartialEq)]
pub struct HeritageLayer {
    pub name: String,
    pub crs: Crs,
    pub sites: Vec<HeritageSite>,
    /// Rows of a re-read result layer with no name or no geometry.
    /// Written back unchanged apart from an empty sequence number.
    pub unreadable: Vec<Feature>,
    pub display_filter: DisplayFilter,
}

impl HeritageLayer {
    pub fn new(name: impl Into<String>, crs: Crs, sites: Vec<HeritageSite>) -> Self {
        Self {
            name: name.into(),
            crs,
            sites,
            unreadable: Vec::new(),
            display_filter: DisplayFilter::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn included(&self) -> impl Iterator<Item = &HeritageSite> {
        self.sites.iter().filter(|site| !site.excluded)
    }

    pub fn excluded_count(&self) -> usize {
        self.sites.iter().filter(|site| site.excluded).count()
    }

    pub fn visible(&self) -> impl Iterator<Item = &HeritageSite> {
        self.sites
            .iter()
            .filter(|site| self.display_filter.is_visible(site))
    }

    /// Renders the result layer. Every site is written, hidden ones included,
    /// followed by the unreadable rows.
    pub fn to_layer(&self, id: impl Into<String>) -> Layer {
        let unnumbered = self.unreadable.iter().map(|feature| {
            let mut feature = feature.clone();
            feature
                .attributes
                .insert(fields::SEQUENCE.to_string(), AttributeValue::Null);
            feature
        });
        let features = self
            .sites
            .iter()
            .map(|site| site.to_feature(0))
            .chain(unnumbered)
            .zip(1u64..)
            .map(|(mut feature, fid)| {
                feature.id = fid;
                feature
            })
            .collect();
        Layer::new(id, self.name.clone(), self.crs.clone())
            .with_fields(fields::ALL)
            .with_features(features)
    }

    /// Reads back a previously produced result layer.
    ///
    /// The layer must carry the sequence-number and name fields. Rows that
    /// cannot be read as sites are kept in `unreadable`.
    pub fn from_layer(layer: &Layer) -> Result<Self, PipelineError> {
        for field in [fields::SEQUENCE, fields::NAME] {
            if !layer.has_field(field) {
                return Err(PipelineError::Compatibility {
                    layer: layer.name.clone(),
                    field: field.to_string(),
                });
            }
        }
        let mut sites = Vec::with_capacity(layer.features.len());
        let mut unreadable = Vec::new();
        for feature in &layer.features {
            match HeritageSite::from_feature(feature, layer) {
                Some(site) => sites.push(site),
                None => unreadable.push(feature.clone()),
            }
        }
        let mut heritage = Self::new(layer.name.clone(), layer.crs.clone(), sites);
        heritage.unreadable = unreadable;
        Ok(heritage)
    }
}

#[cfg(test)]
mod tests {
    use geo::Point;

    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_composes() {
        // Decomposed jamo for "사" followed by a precomposed "지".
        let decomposed = "A\u{1109}\u{1161}지";
        assert_eq!(normalize_name(decomposed), "A사지");
        assert_eq!(normalize_name("  A   사지 "), "A 사지");
    }

    #[test]
    fn result_layer_round_trip_keeps_exclusion() {
        let source = Layer::new("src", "지표조사", Crs::default());
        let mut site = HeritageSite::new("A사지", Point::new(10.0, 20.0).into(), &source);
        site.sequence_number = Some(3);
        site.exclude(ExclusionReason::Manual);

        let layer = HeritageLayer::new("유적", Crs::default(), vec![site]).to_layer("out");
        let restored = HeritageLayer::from_layer(&layer).unwrap();
        let site = &restored.sites[0];
        assert!(site.excluded);
        assert_eq!(site.exclusion, Some(ExclusionReason::Manual));
        assert_eq!(site.sequence_number, None);
        assert_eq!(site.source_layer_name, "지표조사");
    }

    #[test]
    fn from_layer_requires_sequence_field() {
        let layer = Layer::new("x", "plain", Crs::default()).with_fields(["유적명"]);
        let err = HeritageLayer::from_layer(&layer).unwrap_err();
        assert!(matches!(err, PipelineError::Compatibility { field, .. } if field == "번호"));
    }

    #[test]
    fn unreadable_rows_survive_a_round_trip() {
        let source = Layer::new("src", "지표조사", Crs::default());
        let mut site = HeritageSite::new("A사지", Point::new(10.0, 20.0).into(), &source);
        site.sequence_number = Some(1);
        let mut layer = HeritageLayer::new("유적", Crs::default(), vec![site]).to_layer("out");
        layer.features.push(
            Feature::new(7, Some(Point::new(0.0, 0.0).into()))
                .with_attribute(fields::SEQUENCE, 2i64)
                .with_attribute(fields::NAME, " ")
                .with_attribute(fields::ADDRESS, "경주시"),
        );
        layer
            .features
            .push(Feature::new(8, None).with_attribute(fields::NAME, "B요지"));

        let restored = HeritageLayer::from_layer(&layer).unwrap();
        assert_eq!((restored.len(), restored.unreadable.len()), (1, 2));

        let written = restored.to_layer("out");
        assert_eq!(written.feature_count(), 3);
        let ids: Vec<u64> = written.features.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(written.features[1].attribute(fields::SEQUENCE), Some(&AttributeValue::Null));
        assert_eq!(written.features[1].text(fields::ADDRESS).as_deref(), Some("경주시"));
        assert_eq!(written.features[2].text(fields::NAME).as_deref(), Some("B요지"));
    }

    #[test]
    fn display_filter_expression() {
        assert_eq!(
            DisplayFilter::HIDE_EXCLUDED.expression().as_deref(),
            Some("\"제외\" = 0")
        );
    }
}
