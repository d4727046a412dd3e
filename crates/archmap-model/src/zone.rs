use geo::MultiPolygon;

use crate::crs::Crs;
use crate::layer::{Feature, Layer};

/// Clipped zone geometry for one zone value.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSegment {
    pub value: String,
    pub geometry: MultiPolygon<f64>,
    pub feature_count: usize,
}

/// Zone boundaries clipped to the retained area and split by zone value.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneLayer {
    pub name: String,
    pub crs: Crs,
    /// Attribute the segments are grouped by.
    pub field: String,
    pub segments: Vec<ZoneSegment>,
}

impl ZoneLayer {
    pub fn segment(&self, value: &str) -> Option<&ZoneSegment> {
        self.segments.iter().find(|segment| segment.value == value)
    }

    /// One feature per segment, carrying the zone value under the zone field.
    pub fn to_layer(&self, id: impl Into<String>) -> Layer {
        let features = self
            .segments
            .iter()
            .zip(1u64..)
            .map(|(segment, fid)| {
                Feature::new(fid, Some(segment.geometry.clone().into()))
                    .with_attribute(self.field.as_str(), segment.value.as_str())
            })
            .collect();
        Layer::new(id, self.name.clone(), self.crs.clone())
            .with_fields([self.field.as_str()])
            .with_features(features)
    }
}
