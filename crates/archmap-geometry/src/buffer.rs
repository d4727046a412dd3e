//! Distance buffers around the study area.

use archmap_model::{
    BufferRing, BufferSet, Crs, GeometryError, PipelineError, Result, Stage,
};
use geo::{Buffer, MultiPolygon};
use tracing::debug;

use crate::crs::LocalFrame;
use crate::measure::{is_finite, reference_point};

/// Produces one simple buffer per distance.
///
/// Each ring is `buffer(study_area, d)` computed from the study area itself,
/// never grown from a smaller ring.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferEngine;

impl BufferEngine {
    pub fn build(
        &self,
        study_area: &MultiPolygon<f64>,
        crs: &Crs,
        distances: &[f64],
    ) -> Result<BufferSet> {
        if let Some(bad) = distances
            .iter()
            .find(|distance| !distance.is_finite() || **distance <= 0.0)
        {
            return Err(PipelineError::Configuration(format!(
                "buffer distance must be a positive number of meters, got {bad}"
            )));
        }
        let mut sorted = distances.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        if sorted.is_empty() {
            return Ok(BufferSet::default());
        }
        if study_area.0.is_empty() {
            return Err(PipelineError::geometry(
                Stage::Buffers,
                GeometryError::Empty {
                    what: "study area".to_string(),
                },
            ));
        }
        if !is_finite(&study_area.clone().into()) {
            return Err(PipelineError::geometry(
                Stage::Buffers,
                GeometryError::NonFinite {
                    what: "study area".to_string(),
                },
            ));
        }

        let rings = if crs.is_geographic() {
            let center = reference_point(study_area).ok_or_else(|| {
                PipelineError::geometry(
                    Stage::Buffers,
                    GeometryError::NoCentroid {
                        what: "study area".to_string(),
                    },
                )
            })?;
            let frame = LocalFrame::centered_on(center.x, center.y);
            let local = frame.to_local(study_area);
            sorted
                .iter()
                .map(|&distance| BufferRing {
                    distance_m: distance,
                    geometry: frame.to_geographic(&local.buffer(distance)),
                })
                .collect()
        } else {
            sorted
                .iter()
                .map(|&distance| BufferRing {
                    distance_m: distance,
                    geometry: study_area.buffer(distance),
                })
                .collect()
        };
        let set = BufferSet::new(rings);
        debug!(count = set.len(), crs = %crs, "buffers built");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use geo::{Area, Contains, Point, polygon};

    use super::*;

    fn study() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 100.0),
            (x: 0.0, y: 100.0)
        ]])
    }

    #[test]
    fn distances_are_sorted_and_deduplicated() {
        let set = BufferEngine
            .build(&study(), &Crs::epsg(5186), &[1000.0, 500.0, 1000.0])
            .unwrap();
        assert_eq!(set.thresholds(), vec![500.0, 1000.0]);
    }

    #[test]
    fn ring_contains_points_within_distance() {
        let set = BufferEngine
            .build(&study(), &Crs::epsg(5186), &[50.0])
            .unwrap();
        let ring = &set.rings()[0].geometry;
        assert!(ring.contains(&Point::new(140.0, 50.0)));
        assert!(!ring.contains(&Point::new(160.0, 50.0)));
        assert!(ring.unsigned_area() > 10_000.0);
    }

    #[test]
    fn rejects_non_positive_distance() {
        let err = BufferEngine
            .build(&study(), &Crs::epsg(5186), &[0.0])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn empty_study_area_is_geometry_error() {
        let err = BufferEngine
            .build(&MultiPolygon::new(vec![]), &Crs::epsg(5186), &[100.0])
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Buffers));
    }

    #[test]
    fn geographic_buffer_is_metric() {
        // ~0.01 degree square near Gyeongju
        let square = MultiPolygon::new(vec![polygon![
            (x: 129.20, y: 35.80),
            (x: 129.21, y: 35.80),
            (x: 129.21, y: 35.81),
            (x: 129.20, y: 35.81)
        ]]);
        let set = BufferEngine.build(&square, &Crs::wgs84(), &[500.0]).unwrap();
        let ring = &set.rings()[0].geometry;
        // 500 m is roughly 0.0055 degrees of longitude at this latitude
        assert!(ring.contains(&Point::new(129.214, 35.805)));
        assert!(!ring.contains(&Point::new(129.22, 35.805)));
    }
}
