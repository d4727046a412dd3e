//! Same-name site merging.

use std::collections::HashMap;

use archmap_geometry::measure;
use archmap_ingest::LayerReport;
use archmap_model::{DataWarning, GeometryError, HeritageSite};
use serde::Serialize;
use tracing::debug;

use crate::context::RunContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DissolveReport {
    pub before: usize,
    pub after: usize,
    /// The merge was skipped or fell back to the input.
    pub fell_back: bool,
}

/// Indices of `keys` grouped by key, groups in first-appearance order.
fn group_indices<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<Vec<usize>> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, key) in keys.enumerate() {
        match position.get(key) {
            Some(&group) => groups[group].push(index),
            None => {
                position.insert(key, groups.len());
                groups.push(vec![index]);
            }
        }
    }
    groups
}

/// Merges sites sharing a normalized name.
///
/// The representative of a group keeps the first member's attributes and
/// takes the dissolved geometry of the whole group.
pub fn dissolve_sites(sites: &[HeritageSite]) -> Result<Vec<HeritageSite>, GeometryError> {
    let keys: Vec<String> = sites.iter().map(HeritageSite::key).collect();
    let groups = group_indices(keys.iter().map(String::as_str));
    let mut merged = Vec::with_capacity(groups.len());
    for group in groups {
        let mut representative = sites[group[0]].clone();
        if group.len() > 1 {
            let geometries: Vec<_> = group.iter().map(|&i| sites[i].geometry.clone()).collect();
            representative.geometry = measure::dissolve(&geometries)?;
            debug!(name = %representative.name, members = group.len(), "dissolved group");
        }
        merged.push(representative);
    }
    Ok(merged)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DissolveMerger;

impl DissolveMerger {
    /// Dissolves `sites`, falling back to the input on geometry failure.
    pub fn apply(
        &self,
        sites: Vec<HeritageSite>,
        ctx: &mut RunContext,
    ) -> (Vec<HeritageSite>, DissolveReport) {
        let before = sites.len();
        match dissolve_sites(&sites) {
            Ok(merged) => {
                let report = DissolveReport {
                    before,
                    after: merged.len(),
                    fell_back: false,
                };
                ctx.count(
                    report.after,
                    format!("dissolve: {before} -> {} sites", report.after),
                );
                (merged, report)
            }
            Err(error) => {
                ctx.warn(DataWarning::DissolveFailed {
                    count: before,
                    reason: error.to_string(),
                });
                let report = DissolveReport {
                    before,
                    after: before,
                    fell_back: true,
                };
                (sites, report)
            }
        }
    }

    /// Dissolves sites merged from the source layers in `layers`.
    ///
    /// When none of the sources resolved a name field the merged set has no
    /// name key, so the dissolve is skipped with a warning.
    pub fn apply_merged(
        &self,
        sites: Vec<HeritageSite>,
        layers: &[LayerReport],
        ctx: &mut RunContext,
    ) -> (Vec<HeritageSite>, DissolveReport) {
        if !layers.is_empty() && layers.iter().all(|layer| layer.name_field.is_none()) {
            let names: Vec<&str> = layers.iter().map(|layer| layer.layer_name.as_str()).collect();
            ctx.warn(DataWarning::DissolveSkipped {
                layer: names.join(", "),
            });
            let count = sites.len();
            let report = DissolveReport {
                before: count,
                after: count,
                fell_back: true,
            };
            return (sites, report);
        }
        self.apply(sites, ctx)
    }
}
