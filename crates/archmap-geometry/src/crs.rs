//! Coordinate transforms between the CRSs used by Korean survey data.
//!
//! All supported CRSs share the GRS80 ellipsoid (WGS84 differs by less than a
//! millimeter), so every transform goes source -> geographic -> target without
//! a datum shift.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use archmap_model::{Crs, DataWarning, Feature, GeometryError, Layer};
use geo::{Coord, Geometry, MapCoords, MultiPolygon};
use tracing::{debug, warn};

const GRS80_A: f64 = 6_378_137.0;
const GRS80_F: f64 = 1.0 / 298.257_222_101;

/// Transverse Mercator parameters, angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub lat0: f64,
    pub lon0: f64,
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl TransverseMercator {
    const fn korea_2000(lon0: f64) -> Self {
        Self {
            lat0: 38.0,
            lon0,
            k0: 1.0,
            false_easting: 200_000.0,
            false_northing: 600_000.0,
        }
    }

    const fn utm_north(zone: u32) -> Self {
        Self {
            lat0: 0.0,
            lon0: (zone as f64) * 6.0 - 183.0,
            k0: 0.9996,
            false_easting: 500_000.0,
            false_northing: 0.0,
        }
    }

    /// Forward projection of longitude/latitude degrees.
    pub fn forward(&self, lon: f64, lat: f64) -> Coord<f64> {
        let e = Ellipsoid::GRS80;
        let phi = lat.to_radians();
        let lam = (lon - self.lon0).to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = e.a / (1.0 - e.e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = e.ep2 * cos_phi * cos_phi;
        let a = lam * cos_phi;
        let m = e.meridian_arc(phi);
        let m0 = e.meridian_arc(self.lat0.to_radians());

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * e.ep2) * a.powi(5) / 120.0);
        let y = self.k0
            * (m - m0
                + n * tan_phi
                    * (a * a / 2.0
                        + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * e.ep2) * a.powi(6)
                            / 720.0));
        Coord {
            x: self.false_easting + x,
            y: self.false_northing + y,
        }
    }

    /// Inverse projection, returning longitude/latitude degrees.
    pub fn inverse(&self, easting: f64, northing: f64) -> Coord<f64> {
        let e = Ellipsoid::GRS80;
        let m0 = e.meridian_arc(self.lat0.to_radians());
        let m = m0 + (northing - self.false_northing) / self.k0;
        let e4 = e.e2 * e.e2;
        let e6 = e4 * e.e2;
        let mu = m / (e.a * (1.0 - e.e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let sqrt_1me2 = (1.0 - e.e2).sqrt();
        let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let tan1 = phi1.tan();
        let c1 = e.ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let w = 1.0 - e.e2 * sin1 * sin1;
        let n1 = e.a / w.sqrt();
        let r1 = e.a * (1.0 - e.e2) / w.powf(1.5);
        let d = (easting - self.false_easting) / (n1 * self.k0);

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * e.ep2) * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * e.ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lam = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * e.ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos1;
        Coord {
            x: self.lon0 + lam.to_degrees(),
            y: phi.to_degrees(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Ellipsoid {
    a: f64,
    e2: f64,
    ep2: f64,
}

impl Ellipsoid {
    const GRS80: Self = {
        let e2 = GRS80_F * (2.0 - GRS80_F);
        Self {
            a: GRS80_A,
            e2,
            ep2: e2 / (1.0 - e2),
        }
    };

    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }
}

/// How a CRS maps longitude/latitude to its coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Geographic,
    TransverseMercator(TransverseMercator),
    WebMercator,
}

impl Projection {
    /// Built-in definition for a CRS, `None` when unknown.
    pub fn for_crs(crs: &Crs) -> Option<Self> {
        if crs.is_geographic() {
            return Some(Self::Geographic);
        }
        let projection = match crs.epsg_code()? {
            5185 => Self::TransverseMercator(TransverseMercator::korea_2000(125.0)),
            5186 => Self::TransverseMercator(TransverseMercator::korea_2000(127.0)),
            5187 => Self::TransverseMercator(TransverseMercator::korea_2000(129.0)),
            5188 => Self::TransverseMercator(TransverseMercator::korea_2000(131.0)),
            5179 => Self::TransverseMercator(TransverseMercator {
                lat0: 38.0,
                lon0: 127.5,
                k0: 0.9996,
                false_easting: 1_000_000.0,
                false_northing: 2_000_000.0,
            }),
            code @ 32651..=32652 => {
                Self::TransverseMercator(TransverseMercator::utm_north(code - 32600))
            }
            3857 | 900_913 => Self::WebMercator,
            _ => return None,
        };
        Some(projection)
    }

    fn to_geographic(self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            Self::Geographic => coord,
            Self::TransverseMercator(tm) => tm.inverse(coord.x, coord.y),
            Self::WebMercator => Coord {
                x: (coord.x / GRS80_A).to_degrees(),
                y: (2.0 * (coord.y / GRS80_A).exp().atan() - FRAC_PI_2).to_degrees(),
            },
        }
    }

    fn from_geographic(self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            Self::Geographic => coord,
            Self::TransverseMercator(tm) => tm.forward(coord.x, coord.y),
            Self::WebMercator => Coord {
                x: GRS80_A * coord.x.to_radians(),
                y: GRS80_A * (FRAC_PI_4 + coord.y.to_radians() / 2.0).tan().ln(),
            },
        }
    }
}

/// Converts geometries from one CRS to another.
#[derive(Debug, Clone)]
pub struct CoordinateTransformer {
    source: Crs,
    target: Crs,
    from: Projection,
    to: Projection,
}

impl CoordinateTransformer {
    pub fn new(source: &Crs, target: &Crs) -> Result<Self, GeometryError> {
        let lookup = |crs: &Crs| {
            Projection::for_crs(crs).ok_or_else(|| GeometryError::Transform {
                from: source.to_string(),
                to: target.to_string(),
                reason: format!("no definition for {crs}"),
            })
        };
        Ok(Self {
            from: lookup(source)?,
            to: lookup(target)?,
            source: source.clone(),
            target: target.clone(),
        })
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    pub fn transform_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, GeometryError> {
        if self.is_identity() {
            return Ok(coord);
        }
        let out = self.to.from_geographic(self.from.to_geographic(coord));
        if out.x.is_finite() && out.y.is_finite() {
            Ok(out)
        } else {
            Err(GeometryError::Transform {
                from: self.source.to_string(),
                to: self.target.to_string(),
                reason: format!("({}, {}) is outside the projection domain", coord.x, coord.y),
            })
        }
    }

    pub fn transform(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, GeometryError> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|coord| self.transform_coord(coord))
    }
}

/// Tangent transverse-mercator plane centered on a point, in meters.
///
/// Used to buffer geometries stored in a geographic CRS.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    tm: TransverseMercator,
}

impl LocalFrame {
    pub fn centered_on(lon: f64, lat: f64) -> Self {
        Self {
            tm: TransverseMercator {
                lat0: lat,
                lon0: lon,
                k0: 1.0,
                false_easting: 0.0,
                false_northing: 0.0,
            },
        }
    }

    pub fn to_local(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geometry.map_coords(|coord| self.tm.forward(coord.x, coord.y))
    }

    pub fn to_geographic(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geometry.map_coords(|coord| self.tm.inverse(coord.x, coord.y))
    }
}

/// Warning for a degree-based working CRS.
pub fn check_working_crs(crs: &Crs) -> Option<DataWarning> {
    if crs.is_geographic() {
        warn!(crs = %crs, "working CRS is geographic");
        Some(DataWarning::GeographicCrs {
            crs: crs.to_string(),
        })
    } else {
        None
    }
}

/// Reprojects every feature of `layer` into `target`.
///
/// On failure the layer comes back untouched together with a warning.
pub fn reproject_layer(layer: Layer, target: &Crs) -> (Layer, Option<DataWarning>) {
    if &layer.crs == target {
        return (layer, None);
    }
    let transformer = match CoordinateTransformer::new(&layer.crs, target) {
        Ok(transformer) => transformer,
        Err(error) => return transform_failed(layer, target, &error),
    };
    let transformed: Result<Vec<Feature>, GeometryError> = layer
        .features
        .iter()
        .map(|feature| {
            let geometry = feature
                .geometry
                .as_ref()
                .map(|geometry| transformer.transform(geometry))
                .transpose()?;
            Ok(Feature {
                geometry,
                ..feature.clone()
            })
        })
        .collect();
    let features = match transformed {
        Ok(features) => features,
        Err(error) => return transform_failed(layer, target, &error),
    };
    debug!(layer = %layer.name, from = %layer.crs, to = %target, count = features.len(), "reprojected layer");
    let reprojected = Layer {
        crs: target.clone(),
        features,
        ..layer
    };
    (reprojected, None)
}

fn transform_failed(
    layer: Layer,
    target: &Crs,
    error: &GeometryError,
) -> (Layer, Option<DataWarning>) {
    warn!(layer = %layer.name, error = %error, "coordinate transform failed");
    let warning = DataWarning::TransformFailed {
        layer: layer.name.clone(),
        from: layer.crs.to_string(),
        to: target.to_string(),
        reason: error.to_string(),
    };
    (layer, Some(warning))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn central_belt_origin() {
        let t = CoordinateTransformer::new(&Crs::wgs84(), &Crs::epsg(5186)).unwrap();
        let out = t.transform_coord(Coord { x: 127.0, y: 38.0 }).unwrap();
        assert!(close(out.x, 200_000.0, 1e-6));
        assert!(close(out.y, 600_000.0, 1e-6));
    }

    #[test]
    fn round_trip_between_belts() {
        let forward = CoordinateTransformer::new(&Crs::epsg(5186), &Crs::epsg(5179)).unwrap();
        let back = CoordinateTransformer::new(&Crs::epsg(5179), &Crs::epsg(5186)).unwrap();
        let start = Coord {
            x: 198_345.2,
            y: 551_020.7,
        };
        let there = forward.transform_coord(start).unwrap();
        let again = back.transform_coord(there).unwrap();
        assert!(close(again.x, start.x, 1e-3));
        assert!(close(again.y, start.y, 1e-3));
    }

    #[test]
    fn unknown_crs_is_a_transform_error() {
        let err = CoordinateTransformer::new(&Crs::epsg(2097), &Crs::epsg(5186)).unwrap_err();
        assert!(matches!(err, GeometryError::Transform { .. }));
    }

    #[test]
    fn web_mercator_equator() {
        let t = CoordinateTransformer::new(&Crs::wgs84(), &Crs::epsg(3857)).unwrap();
        let out = t.transform_coord(Coord { x: 0.0, y: 0.0 }).unwrap();
        assert!(close(out.x, 0.0, 1e-9) && close(out.y, 0.0, 1e-9));
    }
}
