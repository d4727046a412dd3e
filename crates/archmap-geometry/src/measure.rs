//! Small geometric queries shared by the pipeline stages.

use archmap_model::GeometryError;
use geo::{
    Area, BooleanOps, BoundingRect, Centroid, Coord, CoordsIter, Distance, Euclidean, Geometry,
    GeometryCollection, Intersects, LineString, MultiLineString, MultiPoint, MultiPolygon, Polygon,
};

/// Polygonal part of a geometry. Points and lines have none.
pub fn polygons_of(geometry: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => vec![polygon.clone()],
        Geometry::MultiPolygon(multi) => multi.0.clone(),
        Geometry::Rect(rect) => vec![rect.to_polygon()],
        Geometry::Triangle(triangle) => vec![triangle.to_polygon()],
        Geometry::GeometryCollection(collection) => {
            collection.0.iter().flat_map(polygons_of).collect()
        }
        _ => Vec::new(),
    }
}

pub fn is_finite(geometry: &Geometry<f64>) -> bool {
    geometry
        .coords_iter()
        .all(|coord| coord.x.is_finite() && coord.y.is_finite())
}

pub fn centroid(geometry: &Geometry<f64>) -> Option<Coord<f64>> {
    geometry
        .centroid()
        .map(|point| point.0)
        .filter(|coord| coord.x.is_finite() && coord.y.is_finite())
}

/// Centroid of the geometry, falling back to the center of its bounding box.
pub fn reference_point(geometry: &MultiPolygon<f64>) -> Option<Coord<f64>> {
    let finite = |coord: &Coord<f64>| coord.x.is_finite() && coord.y.is_finite();
    geometry
        .centroid()
        .map(|point| point.0)
        .filter(finite)
        .or_else(|| geometry.bounding_rect().map(|rect| rect.center()).filter(finite))
}

/// Planar area; zero for points and lines.
pub fn area(geometry: &Geometry<f64>) -> f64 {
    geometry.unsigned_area()
}

/// Minimum planar distance, zero when the geometries touch or overlap.
pub fn distance(a: &Geometry<f64>, b: &Geometry<f64>) -> f64 {
    Euclidean.distance(a, b)
}

pub fn intersects(a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
    a.intersects(b)
}

/// Dissolves a group of geometries into one.
///
/// Polygons are unioned, points and lines gather into multi-geometries and
/// mixed input becomes a collection.
pub fn dissolve(geometries: &[Geometry<f64>]) -> Result<Geometry<f64>, GeometryError> {
    if geometries.is_empty() {
        return Err(GeometryError::Empty {
            what: "dissolve group".to_string(),
        });
    }
    if let Some(bad) = geometries.iter().find(|geometry| !is_finite(geometry)) {
        return Err(GeometryError::NonFinite {
            what: format!("{} member", kind_name(bad)),
        });
    }
    if geometries.len() == 1 {
        return Ok(geometries[0].clone());
    }

    let mut polygons: Option<MultiPolygon<f64>> = None;
    let mut points = Vec::new();
    let mut lines: Vec<LineString<f64>> = Vec::new();
    for geometry in geometries {
        match geometry {
            Geometry::Point(point) => points.push(*point),
            Geometry::MultiPoint(multi) => points.extend(multi.0.iter().copied()),
            Geometry::Line(line) => lines.push(LineString::from(*line)),
            Geometry::LineString(line) => lines.push(line.clone()),
            Geometry::MultiLineString(multi) => lines.extend(multi.0.iter().cloned()),
            other => {
                let parts = MultiPolygon::new(polygons_of(other));
                polygons = Some(match polygons {
                    Some(acc) => acc.union(&parts),
                    None => parts,
                });
            }
        }
    }

    let mut parts: Vec<Geometry<f64>> = Vec::new();
    if let Some(polygons) = polygons.filter(|multi| !multi.0.is_empty()) {
        parts.push(single_or_multi_polygon(polygons));
    }
    if !lines.is_empty() {
        parts.push(MultiLineString::new(lines).into());
    }
    if !points.is_empty() {
        parts.push(MultiPoint::new(points).into());
    }
    match parts.len() {
        0 => Err(GeometryError::Empty {
            what: "dissolve result".to_string(),
        }),
        1 => Ok(parts.remove(0)),
        _ => Ok(Geometry::GeometryCollection(GeometryCollection::from(parts))),
    }
}

fn single_or_multi_polygon(mut multi: MultiPolygon<f64>) -> Geometry<f64> {
    if multi.0.len() == 1 {
        Geometry::Polygon(multi.0.remove(0))
    } else {
        Geometry::MultiPolygon(multi)
    }
}

pub fn kind_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "point",
        Geometry::Line(_) => "line",
        Geometry::LineString(_) => "linestring",
        Geometry::Polygon(_) => "polygon",
        Geometry::MultiPoint(_) => "multipoint",
        Geometry::MultiLineString(_) => "multilinestring",
        Geometry::MultiPolygon(_) => "multipolygon",
        Geometry::GeometryCollection(_) => "geometrycollection",
        Geometry::Rect(_) => "rect",
        Geometry::Triangle(_) => "triangle",
    }
}

#[cfg(test)]
mod tests {
    use geo::{point, polygon};

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Geometry<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size)
        ]
        .into()
    }

    #[test]
    fn overlapping_squares_dissolve_to_one_polygon() {
        let merged = dissolve(&[square(0.0, 0.0, 10.0), square(5.0, 0.0, 10.0)]).unwrap();
        assert!(matches!(merged, Geometry::Polygon(_)));
        assert!((area(&merged) - 150.0).abs() < 1e-6);
    }

    #[test]
    fn points_gather_into_multipoint() {
        let merged = dissolve(&[
            point!(x: 0.0, y: 0.0).into(),
            point!(x: 1.0, y: 1.0).into(),
        ])
        .unwrap();
        assert!(matches!(merged, Geometry::MultiPoint(ref m) if m.0.len() == 2));
    }

    #[test]
    fn non_finite_member_fails() {
        let bad: Geometry<f64> = point!(x: f64::NAN, y: 0.0).into();
        assert!(dissolve(&[bad, square(0.0, 0.0, 1.0)]).is_err());
    }

    #[test]
    fn distance_is_zero_inside() {
        let study = square(0.0, 0.0, 100.0);
        let inside: Geometry<f64> = point!(x: 50.0, y: 50.0).into();
        let outside: Geometry<f64> = point!(x: 130.0, y: 50.0).into();
        assert_eq!(distance(&inside, &study), 0.0);
        assert!((distance(&outside, &study) - 30.0).abs() < 1e-9);
    }
}
