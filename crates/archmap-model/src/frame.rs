//! The geometric frame of a map: print extent and distance buffers.

use geo::{Coord, Geometry, MultiPolygon, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::error::PipelineError;
use crate::layer::{Layer, LayerId};

/// Combined polygon of the study-area layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyArea {
    pub layer_id: LayerId,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub crs: Crs,
}

impl StudyArea {
    /// Collects every polygonal feature of `layer`.
    ///
    /// A layer without polygon geometry is a precondition failure.
    pub fn from_layer(layer: &Layer) -> Result<Self, PipelineError> {
        let mut polygons = Vec::new();
        for geometry in layer.geometries() {
            match geometry {
                Geometry::Polygon(polygon) => polygons.push(polygon.clone()),
                Geometry::MultiPolygon(multi) => polygons.extend(multi.0.iter().cloned()),
                Geometry::Rect(rect) => polygons.push(rect.to_polygon()),
                Geometry::Triangle(triangle) => polygons.push(triangle.to_polygon()),
                _ => {}
            }
        }
        polygons.retain(|polygon| !polygon.exterior().0.is_empty());
        if polygons.is_empty() {
            return Err(PipelineError::Precondition(format!(
                "study area layer '{}' has no polygon features",
                layer.name
            )));
        }
        Ok(Self {
            layer_id: layer.id.clone(),
            name: layer.name.clone(),
            geometry: MultiPolygon::new(polygons),
            crs: layer.crs.clone(),
        })
    }

    pub fn as_geometry(&self) -> Geometry<f64> {
        Geometry::MultiPolygon(self.geometry.clone())
    }
}

/// Fixed-size print rectangle derived from paper size and scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub center: Coord<f64>,
    pub width_mm: f64,
    pub height_mm: f64,
    pub scale: u32,
    pub crs: Crs,
}

impl Extent {
    pub fn width_map_units(&self) -> f64 {
        self.width_mm / 1000.0 * f64::from(self.scale)
    }

    pub fn height_map_units(&self) -> f64 {
        self.height_mm / 1000.0 * f64::from(self.scale)
    }

    pub fn rect(&self) -> Rect<f64> {
        let half_w = self.width_map_units() / 2.0;
        let half_h = self.height_map_units() / 2.0;
        Rect::new(
            Coord {
                x: self.center.x - half_w,
                y: self.center.y - half_h,
            },
            Coord {
                x: self.center.x + half_w,
                y: self.center.y + half_h,
            },
        )
    }

    pub fn polygon(&self) -> Polygon<f64> {
        self.rect().to_polygon()
    }

    pub fn area(&self) -> f64 {
        self.width_map_units() * self.height_map_units()
    }
}

/// One simple buffer of the study area.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferRing {
    pub distance_m: f64,
    pub geometry: MultiPolygon<f64>,
}

/// Buffers ordered by strictly increasing distance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BufferSet {
    rings: Vec<BufferRing>,
}

impl BufferSet {
    /// Sorts by distance and drops repeated distances, keeping the first ring.
    pub fn new(mut rings: Vec<BufferRing>) -> Self {
        rings.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        rings.dedup_by(|next, prev| next.distance_m == prev.distance_m);
        Self { rings }
    }

    pub fn rings(&self) -> &[BufferRing] {
        &self.rings
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn thresholds(&self) -> Vec<f64> {
        self.rings.iter().map(|ring| ring.distance_m).collect()
    }

    /// Largest-distance buffer, the outer boundary of the retained area.
    pub fn outer(&self) -> Option<&BufferRing> {
        self.rings.last()
    }
}
