//! Merges digitized topographic sheets into one line layer.

use archmap_geometry::reproject_layer;
use archmap_model::{Crs, DataWarning, Feature, GeometryKind, Layer};
use serde::Serialize;

use crate::context::RunContext;

/// Administrative boundary code removed from merged sheets.
pub const BOUNDARY_CODE: &str = "H0017334";

/// Attributes that may carry the feature code.
pub const CODE_FIELDS: [&str; 3] = ["LAYER", "REFNAME", "NAME"];

pub const MERGED_LAYER_NAME: &str = "Topo_Merged";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TopoReport {
    pub layers: usize,
    pub features: usize,
    pub dropped_boundaries: usize,
}

fn is_boundary(feature: &Feature) -> bool {
    CODE_FIELDS.iter().any(|field| {
        feature
            .text(field)
            .is_some_and(|value| value.contains(BOUNDARY_CODE))
    })
}

#[derive(Debug, Clone)]
pub struct TopoMerger {
    working_crs: Crs,
}

impl TopoMerger {
    pub fn new(working_crs: Crs) -> Self {
        Self { working_crs }
    }

    /// Merges the line layers among `layers`; others are skipped with a warning.
    pub fn merge(&self, layers: Vec<Layer>, ctx: &mut RunContext) -> Option<(Layer, TopoReport)> {
        let mut report = TopoReport::default();
        let mut fields: Vec<String> = Vec::new();
        let mut features: Vec<Feature> = Vec::new();
        for layer in layers {
            if layer.kind != GeometryKind::Line {
                ctx.warn(DataWarning::NonLineTopoLayer {
                    layer: layer.name.clone(),
                });
                continue;
            }
            let (layer, warning) = reproject_layer(layer, &self.working_crs);
            if let Some(warning) = warning {
                ctx.warn(warning);
            }
            report.layers += 1;
            for field in &layer.fields {
                if !fields.contains(field) {
                    fields.push(field.clone());
                }
            }
            for feature in layer.features {
                if is_boundary(&feature) {
                    report.dropped_boundaries += 1;
                    continue;
                }
                features.push(feature);
            }
        }
        if report.layers == 0 {
            ctx.notice("no line layers selected; topographic merge skipped");
            return None;
        }
        for (feature, id) in features.iter_mut().zip(1u64..) {
            feature.id = id;
        }
        report.features = features.len();
        ctx.count(
            report.features,
            format!(
                "{} topo layers merged into {} features ({} boundary features dropped)",
                report.layers, report.features, report.dropped_boundaries
            ),
        );
        let merged = Layer::new(MERGED_LAYER_NAME, MERGED_LAYER_NAME, self.working_crs.clone())
            .with_fields(fields)
            .with_features(features);
        Some((merged, report))
    }
}
