//! Merges heritage features from many source layers into one normalized set.

use archmap_geometry::measure;
use archmap_geometry::reproject_layer;
use archmap_model::{
    AttributeValue, Crs, DataWarning, Feature, HeritageSite, Layer, LayerHost, LayerId,
};
use tracing::{debug, info, info_span, warn};

use crate::encoding;
use crate::fields::{FieldMap, is_designated_layer};

/// Outcome for one source layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    pub layer_id: LayerId,
    pub layer_name: String,
    pub name_field: Option<String>,
    pub collected: usize,
    pub unnamed: usize,
    pub without_geometry: usize,
    pub encoding_repaired: bool,
}

/// Unfiltered union of heritage sites across all selected layers.
#[derive(Debug, Default)]
pub struct Collection {
    pub sites: Vec<HeritageSite>,
    pub layers: Vec<LayerReport>,
    pub warnings: Vec<DataWarning>,
}

impl Collection {
    pub fn count(&self) -> usize {
        self.sites.len()
    }

    pub fn merge(&mut self, other: Collection) {
        self.sites.extend(other.sites);
        self.layers.extend(other.layers);
        self.warnings.extend(other.warnings);
    }
}

/// Collects heritage sites into the working CRS.
#[derive(Debug, Clone)]
pub struct HeritageCollector {
    working_crs: Crs,
}

impl HeritageCollector {
    pub fn new(working_crs: Crs) -> Self {
        Self { working_crs }
    }

    pub fn collect<H: LayerHost + ?Sized>(&self, layers: Vec<Layer>, host: &mut H) -> Collection {
        let mut collection = Collection::default();
        for layer in layers {
            collection.merge(self.collect_layer(layer, host));
        }
        info!(count = collection.count(), "heritage collection complete");
        collection
    }

    /// Repairs, reprojects and maps one source layer.
    pub fn collect_layer<H: LayerHost + ?Sized>(&self, layer: Layer, host: &mut H) -> Collection {
        let span = info_span!("collect_layer", layer = %layer.name);
        let _guard = span.enter();
        let mut collection = Collection::default();

        let repaired = encoding::repair(layer, host);
        collection.warnings.extend(repaired.warning);
        let (layer, transform_warning) = reproject_layer(repaired.layer, &self.working_crs);
        collection.warnings.extend(transform_warning);

        let fields = FieldMap::resolve(&layer);
        let mut report = LayerReport {
            layer_id: layer.id.clone(),
            layer_name: layer.name.clone(),
            name_field: fields.name.clone(),
            collected: 0,
            unnamed: 0,
            without_geometry: 0,
            encoding_repaired: repaired.repaired,
        };
        if fields.name.is_none() {
            warn!(fields = ?layer.fields, "no name field, layer excluded from merge");
            collection.warnings.push(DataWarning::MissingNameField {
                layer: layer.name.clone(),
                fields: layer.fields.clone(),
            });
            collection.layers.push(report);
            return collection;
        }

        let designated_layer = is_designated_layer(&layer.name);
        for feature in &layer.features {
            let Some(geometry) = feature.geometry.clone() else {
                report.without_geometry += 1;
                continue;
            };
            let Some(site) = map_feature(feature, geometry, &layer, &fields, designated_layer)
            else {
                report.unnamed += 1;
                continue;
            };
            collection.sites.push(site);
        }
        report.collected = collection.sites.len();

        if report.unnamed > 0 {
            collection.warnings.push(DataWarning::UnnamedSites {
                layer: layer.name.clone(),
                count: report.unnamed,
            });
        }
        if report.without_geometry > 0 {
            collection.warnings.push(DataWarning::MissingGeometry {
                layer: layer.name.clone(),
                count: report.without_geometry,
            });
        }
        debug!(
            collected = report.collected,
            unnamed = report.unnamed,
            without_geometry = report.without_geometry,
            "layer mapped"
        );
        collection.layers.push(report);
        collection
    }
}

fn map_feature(
    feature: &Feature,
    geometry: geo::Geometry<f64>,
    layer: &Layer,
    fields: &FieldMap,
    designated_layer: bool,
) -> Option<HeritageSite> {
    let text = |field: &Option<String>| field.as_deref().and_then(|f| feature.text(f));
    let raw_name = text(&fields.name);
    let heritage_name = text(&fields.heritage_name);
    let project_name = text(&fields.project);
    let name = display_name(
        raw_name.as_deref(),
        heritage_name.as_deref(),
        project_name.as_deref(),
    )?;

    let polygon_area = measure::area(&geometry);
    let area_m2 = fields
        .area
        .as_deref()
        .and_then(|field| feature.attribute(field))
        .and_then(AttributeValue::as_f64)
        .or_else(|| (polygon_area > 0.0).then_some(polygon_area));

    let mut site = HeritageSite::new(name, geometry, layer);
    site.designated = designated_layer || heritage_name.is_some();
    site.address = text(&fields.address);
    site.area_m2 = area_m2;
    site.category = text(&fields.category);
    site.heritage_name = heritage_name;
    site.project_name = project_name;
    Some(site)
}

/// Display name of a site.
///
/// A designated heritage name takes precedence with the site name in
/// parentheses; otherwise a project name gives context before the site name.
pub fn display_name(
    name: Option<&str>,
    heritage_name: Option<&str>,
    project_name: Option<&str>,
) -> Option<String> {
    let name = name.filter(|n| !n.trim().is_empty());
    let display = match (heritage_name, project_name) {
        (Some(heritage), _) => match name {
            Some(name) if !heritage.contains(name) => format!("{heritage} ({name})"),
            _ => heritage.to_string(),
        },
        (None, Some(project)) => match name {
            Some(name) if !project.contains(name) => format!("{project} {name}"),
            _ => project.to_string(),
        },
        (None, None) => name?.to_string(),
    };
    let display = display.trim().to_string();
    (!display.is_empty()).then_some(display)
}
