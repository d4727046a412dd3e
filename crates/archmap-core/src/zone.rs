//! Clips the regulatory zone layer to the retained area and splits it by zone value.

use archmap_geometry::measure;
use archmap_ingest::fields::{ZONE_KEYWORDS, find_field};
use archmap_model::{BufferSet, DataWarning, Extent, Layer, ZoneLayer, ZoneSegment};
use geo::{BooleanOps, MultiPolygon};
use tracing::debug;

use crate::context::RunContext;

/// Value used for features whose zone field is blank.
pub const UNNAMED_ZONE: &str = "미지정";

#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneSplitter {
    pub clip_to_buffer: bool,
}

impl ZoneSplitter {
    pub fn new(clip_to_buffer: bool) -> Self {
        Self { clip_to_buffer }
    }

    /// The extent, or extent ∩ outer buffer when clipping to the buffer.
    pub fn retained_area(
        &self,
        extent: &Extent,
        buffers: &BufferSet,
        ctx: &mut RunContext,
    ) -> MultiPolygon<f64> {
        let extent_area = MultiPolygon::new(vec![extent.polygon()]);
        if !self.clip_to_buffer {
            return extent_area;
        }
        let Some(outer) = buffers.outer() else {
            ctx.warn(DataWarning::ClipWithoutBuffers);
            return extent_area;
        };
        if !measure::is_finite(&outer.geometry.clone().into()) {
            ctx.warn(DataWarning::BufferClipFailed {
                reason: "outer buffer has non-finite coordinates".to_string(),
            });
            return extent_area;
        }
        let clipped = extent_area.intersection(&outer.geometry);
        if clipped.0.is_empty() {
            ctx.warn(DataWarning::BufferClipFailed {
                reason: "extent and outer buffer do not overlap".to_string(),
            });
            return extent_area;
        }
        clipped
    }

    /// Clips `zones` to `retained` and groups the pieces by zone value.
    ///
    /// Returns `None` when the zone field is missing or nothing intersects.
    pub fn split(
        &self,
        zones: &Layer,
        retained: &MultiPolygon<f64>,
        ctx: &mut RunContext,
    ) -> Option<ZoneLayer> {
        let Some(field) = find_field(&zones.fields, ZONE_KEYWORDS) else {
            ctx.warn(DataWarning::ZoneFieldMissing {
                layer: zones.name.clone(),
                fields: zones.fields.clone(),
            });
            return None;
        };

        let mut segments: Vec<ZoneSegment> = Vec::new();
        for feature in &zones.features {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            let polygons = MultiPolygon::new(measure::polygons_of(geometry));
            if polygons.0.is_empty() || !measure::is_finite(geometry) {
                continue;
            }
            let clipped = polygons.intersection(retained);
            if clipped.0.is_empty() {
                continue;
            }
            let value = feature
                .text(&field)
                .unwrap_or_else(|| UNNAMED_ZONE.to_string());
            match segments.iter_mut().find(|segment| segment.value == value) {
                Some(segment) => {
                    segment.geometry = segment.geometry.union(&clipped);
                    segment.feature_count += 1;
                }
                None => segments.push(ZoneSegment {
                    value,
                    geometry: clipped,
                    feature_count: 1,
                }),
            }
        }

        if segments.is_empty() {
            ctx.notice(format!(
                "zone layer '{}' does not intersect the retained area; no zone output",
                zones.name
            ));
            return None;
        }
        debug!(field = %field, segments = segments.len(), "zones split");
        ctx.count(
            segments.len(),
            format!("zone layer split into {} segments by '{field}'", segments.len()),
        );
        Some(ZoneLayer {
            name: format!("{}_clipped", zones.name),
            crs: zones.crs.clone(),
            field,
            segments,
        })
    }
}
