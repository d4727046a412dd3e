//! User-chosen parameters of a map run.

use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::error::PipelineError;

/// Ordering used to assign sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingPolicy {
    /// North to south, ties west to east.
    #[default]
    TopToBottom,
    /// Nearest to the study area first, ties by name.
    #[serde(alias = "distance")]
    DistanceFromStudyArea,
    /// Collation order of the site name.
    Alphabetical,
}

/// How sequence numbers behave across buffer tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierNumbering {
    /// One global 1..N sequence; tiers only group the rows.
    #[default]
    Continuous,
    /// Numbering starts again at 1 inside every tier.
    RestartPerTier,
}

/// Physical paper size in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PaperSpec")]
pub struct PaperSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PaperSize {
    /// Report page body.
    pub const REPORT: Self = Self {
        width_mm: 160.0,
        height_mm: 240.0,
    };
    pub const A4: Self = Self {
        width_mm: 210.0,
        height_mm: 297.0,
    };

    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "report" | "보고서" => Some(Self::REPORT),
            "a4" => Some(Self::A4),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width_mm.is_finite()
            && self.height_mm.is_finite()
            && self.width_mm > 0.0
            && self.height_mm > 0.0
    }
}

impl Default for PaperSize {
    fn default() -> Self {
        Self::REPORT
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PaperSpec {
    Preset(String),
    Custom { width_mm: f64, height_mm: f64 },
}

impl TryFrom<PaperSpec> for PaperSize {
    type Error = String;

    fn try_from(value: PaperSpec) -> Result<Self, Self::Error> {
        match value {
            PaperSpec::Preset(name) => {
                Self::preset(&name).ok_or_else(|| format!("unknown paper preset '{name}'"))
            }
            PaperSpec::Custom {
                width_mm,
                height_mm,
            } => Ok(Self {
                width_mm,
                height_mm,
            }),
        }
    }
}

/// Label font, passed through to the host untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    pub font_family: String,
    pub font_size: f64,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_family: "Malgun Gothic".to_string(),
            font_size: 10.0,
        }
    }
}

/// Which categories the smart filter proposes for exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartFilterOptions {
    /// Natural monuments, movable and intangible heritage.
    pub exclude_non_sites: bool,
    /// Modern-era structures.
    pub exclude_modern: bool,
}

impl Default for SmartFilterOptions {
    fn default() -> Self {
        Self {
            exclude_non_sites: true,
            exclude_modern: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub paper: PaperSize,
    /// Scale denominator, e.g. 5000 for 1:5000.
    pub scale: u32,
    /// Buffer distances in meters. Order and duplicates do not matter.
    pub buffers: Vec<f64>,
    pub numbering: NumberingPolicy,
    pub tier_numbering: TierNumbering,
    /// Group numbering by buffer tier under distance ordering.
    pub buffer_tiers: bool,
    /// Retain only sites inside the outer buffer instead of the extent.
    pub exclude_outside_buffer: bool,
    /// Clip the zone layer to extent ∩ outer buffer.
    pub clip_zone_to_buffer: bool,
    /// Merge same-name sites into one feature.
    pub dissolve: bool,
    pub label: LabelStyle,
    /// Site names the user removed from numbering.
    pub manual_exclusions: Vec<String>,
    pub smart_filter: SmartFilterOptions,
    /// Defaults to the study area's CRS.
    pub working_crs: Option<Crs>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            paper: PaperSize::REPORT,
            scale: 5000,
            buffers: Vec::new(),
            numbering: NumberingPolicy::default(),
            tier_numbering: TierNumbering::default(),
            buffer_tiers: true,
            exclude_outside_buffer: false,
            clip_zone_to_buffer: false,
            dissolve: true,
            label: LabelStyle::default(),
            manual_exclusions: Vec::new(),
            smart_filter: SmartFilterOptions::default(),
            working_crs: None,
        }
    }
}

impl RunSettings {
    /// Distinct buffer distances, ascending.
    pub fn sorted_buffers(&self) -> Vec<f64> {
        let mut distances = self.buffers.clone();
        distances.sort_by(f64::total_cmp);
        distances.dedup();
        distances
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.paper.is_valid() {
            return Err(PipelineError::Configuration(format!(
                "paper size must be positive, got {} x {} mm",
                self.paper.width_mm, self.paper.height_mm
            )));
        }
        if self.scale == 0 {
            return Err(PipelineError::Configuration(
                "scale denominator must be a positive integer".to_string(),
            ));
        }
        if let Some(bad) = self
            .buffers
            .iter()
            .find(|distance| !distance.is_finite() || **distance <= 0.0)
        {
            return Err(PipelineError::Configuration(format!(
                "buffer distance must be a positive number of meters, got {bad}"
            )));
        }
        Ok(())
    }
}
