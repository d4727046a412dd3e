//! Recoverable data problems.
//!
//! Every variant renders as a single parameterized line naming the affected
//! layer and, where it applies, the feature count.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    /// Corrupted text detected but the codepage reload was rejected or failed.
    EncodingRepairFailed {
        layer: String,
        original: usize,
        reloaded: Option<usize>,
        reason: String,
    },
    /// The layer has no name field; its features are left out of the merge.
    MissingNameField { layer: String, fields: Vec<String> },
    /// Features whose name value was empty.
    UnnamedSites { layer: String, count: usize },
    /// Features without geometry.
    MissingGeometry { layer: String, count: usize },
    /// Result-layer rows without a name or geometry, kept unnumbered on refresh.
    UnreadableRows { layer: String, count: usize },
    /// Reprojection failed; geometries kept in their source CRS.
    TransformFailed {
        layer: String,
        from: String,
        to: String,
        reason: String,
    },
    /// Dissolve fell back to the pre-dissolve set.
    DissolveFailed { count: usize, reason: String },
    /// Dissolve skipped because the merged layer has no name field.
    DissolveSkipped { layer: String },
    /// Moving an original layer to the source-data group failed.
    RelocationFailed { layer: String, reason: String },
    /// "Clip to buffer" requested without any buffer distance.
    ClipWithoutBuffers,
    /// Intersecting the extent with the outer buffer failed.
    BufferClipFailed { reason: String },
    /// A non-line layer was offered for the topographic merge.
    NonLineTopoLayer { layer: String },
    /// Zone layer has none of the known zone fields.
    ZoneFieldMissing { layer: String, fields: Vec<String> },
    /// Reference data could not be loaded; classification degrades to no-op.
    ReferenceDataUnavailable { resource: String, reason: String },
    /// Working CRS is geographic; distances are approximations.
    GeographicCrs { crs: String },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncodingRepairFailed {
                layer,
                original,
                reloaded,
                reason,
            } => match reloaded {
                Some(count) => write!(
                    f,
                    "layer '{layer}': codepage reload kept original ({original} features, reload had {count}): {reason}"
                ),
                None => write!(
                    f,
                    "layer '{layer}': codepage reload failed, keeping original {original} features: {reason}"
                ),
            },
            Self::MissingNameField { layer, fields } => write!(
                f,
                "layer '{layer}': no name field among [{}], excluded from merge",
                fields.join(", ")
            ),
            Self::UnnamedSites { layer, count } => {
                write!(f, "layer '{layer}': {count} features without a name dropped")
            }
            Self::MissingGeometry { layer, count } => {
                write!(f, "layer '{layer}': {count} features without geometry skipped")
            }
            Self::UnreadableRows { layer, count } => write!(
                f,
                "layer '{layer}': {count} rows without a name or geometry kept unnumbered"
            ),
            Self::TransformFailed {
                layer,
                from,
                to,
                reason,
            } => write!(
                f,
                "layer '{layer}': coordinate transform {from} -> {to} ignored: {reason}"
            ),
            Self::DissolveFailed { count, reason } => write!(
                f,
                "dissolve failed, using original {count} sites: {reason}"
            ),
            Self::DissolveSkipped { layer } => {
                write!(f, "layer '{layer}': name field not found, dissolve skipped")
            }
            Self::RelocationFailed { layer, reason } => {
                write!(f, "layer '{layer}': move to source group failed: {reason}")
            }
            Self::ClipWithoutBuffers => f.write_str(
                "'clip to buffer' is enabled but no buffers are set, using extent only",
            ),
            Self::BufferClipFailed { reason } => {
                write!(f, "buffer clip failed, using extent only: {reason}")
            }
            Self::NonLineTopoLayer { layer } => {
                write!(f, "layer '{layer}': not a line layer, excluded from topo merge")
            }
            Self::ZoneFieldMissing { layer, fields } => write!(
                f,
                "layer '{layer}': zone field not found among [{}]",
                fields.join(", ")
            ),
            Self::ReferenceDataUnavailable { resource, reason } => {
                write!(f, "reference data '{resource}' unavailable: {reason}")
            }
            Self::GeographicCrs { crs } => write!(
                f,
                "working CRS {crs} is geographic (degrees), a projected CRS is recommended"
            ),
        }
    }
}
