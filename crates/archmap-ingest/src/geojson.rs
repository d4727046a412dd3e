//! GeoJSON layer reader.
//!
//! Files are decoded with an explicit text encoding before parsing, so a
//! CP949 file opened as UTF-8 surfaces as replacement characters that the
//! encoding repair pass can detect.

use std::path::Path;

use archmap_model::{AttributeValue, Crs, Feature, Layer, SourceFile};
use encoding_rs::Encoding;
use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Resolves an encoding label. Accepts WHATWG labels plus `cp949`.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    let trimmed = label.trim();
    let normalized = match trimmed.to_ascii_lowercase().as_str() {
        "cp949" | "ms949" | "uhc" => "windows-949".to_string(),
        other => other.to_string(),
    };
    Encoding::for_label(normalized.as_bytes()).ok_or_else(|| IngestError::UnknownEncoding {
        label: trimmed.to_string(),
    })
}

/// Reads a GeoJSON FeatureCollection decoding text with `encoding`.
pub fn read_layer(path: &Path, encoding: &'static Encoding) -> Result<Layer> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let (text, used, had_errors) = encoding.decode(&bytes);
    debug!(
        path = %path.display(),
        encoding = used.name(),
        had_errors,
        "decoded layer file"
    );
    let fallback_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("layer");
    let layer = parse_layer(&text, path, fallback_name)?;
    Ok(layer.with_source(SourceFile {
        path: path.to_path_buf(),
        encoding: used.name().to_string(),
    }))
}

/// Parses decoded GeoJSON text into a layer.
pub fn parse_layer(text: &str, path: &Path, fallback_name: &str) -> Result<Layer> {
    let root: Value = serde_json::from_str(text).map_err(|e| IngestError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let Some(collection) = root.as_object() else {
        return Err(IngestError::NotFeatureCollection {
            path: path.to_path_buf(),
        });
    };
    if collection.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(IngestError::NotFeatureCollection {
            path: path.to_path_buf(),
        });
    }
    let name = collection
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(fallback_name)
        .to_string();
    let crs = collection
        .get("crs")
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(Value::as_str)
        .and_then(Crs::parse)
        .unwrap_or_else(Crs::wgs84);

    let empty = Vec::new();
    let raw_features = collection
        .get("features")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let mut field_order: Vec<String> = Vec::new();
    let mut features = Vec::with_capacity(raw_features.len());
    for (index, raw) in raw_features.iter().enumerate() {
        let geometry = match raw.get("geometry") {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_geometry(value).map_err(|reason| {
                IngestError::InvalidGeometry {
                    path: path.to_path_buf(),
                    index,
                    reason,
                }
            })?),
        };
        let id = raw
            .get("id")
            .and_then(Value::as_u64)
            .unwrap_or(index as u64 + 1);
        let mut feature = Feature::new(id, geometry);
        if let Some(properties) = raw.get("properties").and_then(Value::as_object) {
            for (key, value) in properties {
                if !field_order.contains(key) {
                    field_order.push(key.clone());
                }
                feature
                    .attributes
                    .insert(key.clone(), attribute_from_json(value));
            }
        }
        features.push(feature);
    }

    let id = path.display().to_string();
    Ok(Layer::new(id, name, crs)
        .with_fields(field_order)
        .with_features(features))
}

fn attribute_from_json(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(flag) => AttributeValue::Bool(*flag),
        Value::Number(number) => number
            .as_i64()
            .map(AttributeValue::Integer)
            .or_else(|| number.as_f64().map(AttributeValue::Real))
            .unwrap_or_default(),
        Value::String(text) => AttributeValue::Text(text.clone()),
        other => AttributeValue::Text(other.to_string()),
    }
}

fn parse_geometry(value: &Value) -> std::result::Result<Geometry<f64>, String> {
    let object = value
        .as_object()
        .ok_or_else(|| "geometry is not an object".to_string())?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "geometry has no type".to_string())?;
    if kind == "GeometryCollection" {
        let members = object
            .get("geometries")
            .and_then(Value::as_array)
            .ok_or_else(|| "collection has no geometries".to_string())?;
        let parsed = members
            .iter()
            .map(parse_geometry)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        return Ok(Geometry::GeometryCollection(GeometryCollection::from(parsed)));
    }
    let coordinates = coordinates(object)?;
    let geometry = match kind {
        "Point" => Point::from(coord(coordinates)?).into(),
        "MultiPoint" => MultiPoint::new(
            array(coordinates)?
                .iter()
                .map(|c| coord(c).map(Point::from))
                .collect::<std::result::Result<_, _>>()?,
        )
        .into(),
        "LineString" => line_string(coordinates)?.into(),
        "MultiLineString" => MultiLineString::new(
            array(coordinates)?
                .iter()
                .map(line_string)
                .collect::<std::result::Result<_, _>>()?,
        )
        .into(),
        "Polygon" => polygon(coordinates)?.into(),
        "MultiPolygon" => MultiPolygon::new(
            array(coordinates)?
                .iter()
                .map(polygon)
                .collect::<std::result::Result<_, _>>()?,
        )
        .into(),
        other => return Err(format!("unsupported geometry type '{other}'")),
    };
    Ok(geometry)
}

fn coordinates(object: &Map<String, Value>) -> std::result::Result<&Value, String> {
    object
        .get("coordinates")
        .ok_or_else(|| "geometry has no coordinates".to_string())
}

fn array(value: &Value) -> std::result::Result<&Vec<Value>, String> {
    value
        .as_array()
        .ok_or_else(|| "coordinates must be an array".to_string())
}

fn coord(value: &Value) -> std::result::Result<Coord<f64>, String> {
    let position = array(value)?;
    match (
        position.first().and_then(Value::as_f64),
        position.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err("position needs two numbers".to_string()),
    }
}

fn line_string(value: &Value) -> std::result::Result<LineString<f64>, String> {
    array(value)?
        .iter()
        .map(coord)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(value: &Value) -> std::result::Result<Polygon<f64>, String> {
    let mut rings = array(value)?
        .iter()
        .map(line_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if rings.is_empty() {
        return Err("polygon has no rings".to_string());
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}
