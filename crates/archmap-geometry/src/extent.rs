//! Paper-scale print extent.

use archmap_model::{Crs, Extent, GeometryError, PaperSize};
use geo::{Coord, MultiPolygon};
use tracing::info;

use crate::measure::reference_point;

/// Builds the fixed-size extent rectangle for a paper size and scale.
#[derive(Debug, Clone, Copy)]
pub struct ExtentCalculator {
    paper: PaperSize,
    scale: u32,
}

impl ExtentCalculator {
    pub fn new(paper: PaperSize, scale: u32) -> Self {
        Self { paper, scale }
    }

    /// Reference point of the extent: the study area when given, the view
    /// center otherwise.
    pub fn reference(
        study_area: Option<&MultiPolygon<f64>>,
        view_center: Option<Coord<f64>>,
    ) -> Result<Coord<f64>, GeometryError> {
        match study_area {
            Some(geometry) if geometry.0.is_empty() => Err(GeometryError::Empty {
                what: "study area".to_string(),
            }),
            Some(geometry) => reference_point(geometry).ok_or_else(|| GeometryError::NoCentroid {
                what: "study area".to_string(),
            }),
            None => view_center
                .filter(|center| center.x.is_finite() && center.y.is_finite())
                .ok_or_else(|| GeometryError::NoCentroid {
                    what: "map view".to_string(),
                }),
        }
    }

    pub fn compute(&self, center: Coord<f64>, crs: &Crs) -> Result<Extent, GeometryError> {
        if !(center.x.is_finite() && center.y.is_finite()) {
            return Err(GeometryError::NonFinite {
                what: "extent center".to_string(),
            });
        }
        let extent = Extent {
            center,
            width_mm: self.paper.width_mm,
            height_mm: self.paper.height_mm,
            scale: self.scale,
            crs: crs.clone(),
        };
        info!(
            width_m = extent.width_map_units(),
            height_m = extent.height_map_units(),
            scale = self.scale,
            "extent computed"
        );
        Ok(extent)
    }

    /// One-line description of the computed dimensions for the run log.
    pub fn describe(extent: &Extent) -> String {
        format!(
            "Extent {:.1} m x {:.1} m (paper {} x {} mm at 1:{}) centered at ({:.2}, {:.2})",
            extent.width_map_units(),
            extent.height_map_units(),
            extent.width_mm,
            extent.height_mm,
            extent.scale,
            extent.center.x,
            extent.center.y
        )
    }
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    #[test]
    fn study_area_reference_is_the_centroid() {
        // L-shaped area: the centroid sits well off the bounding-box center.
        let study = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1000.0, y: 0.0),
            (x: 1000.0, y: 400.0),
            (x: 400.0, y: 400.0),
            (x: 400.0, y: 1000.0),
            (x: 0.0, y: 1000.0)
        ]]);
        let center = ExtentCalculator::reference(Some(&study), None).unwrap();
        assert!((center.x - 387.5).abs() < 1e-9, "{center:?}");
        assert!((center.y - 387.5).abs() < 1e-9, "{center:?}");
    }

    #[test]
    fn view_center_fallback() {
        let center =
            ExtentCalculator::reference(None, Some(Coord { x: 1.0, y: 2.0 })).unwrap();
        assert_eq!(center, Coord { x: 1.0, y: 2.0 });
        assert!(matches!(
            ExtentCalculator::reference(None, None),
            Err(GeometryError::NoCentroid { .. })
        ));
    }

    #[test]
    fn empty_study_area_fails() {
        let empty = MultiPolygon::<f64>::new(vec![]);
        assert!(matches!(
            ExtentCalculator::reference(Some(&empty), None),
            Err(GeometryError::Empty { .. })
        ));
    }

    #[test]
    fn describe_reports_dimensions() {
        let extent = ExtentCalculator::new(PaperSize::REPORT, 5000)
            .compute(Coord { x: 0.0, y: 0.0 }, &Crs::default())
            .unwrap();
        assert_eq!(
            ExtentCalculator::describe(&extent),
            "Extent 800.0 m x 1200.0 m (paper 160 x 240 mm at 1:5000) centered at (0.00, 0.00)"
        );
    }
}
