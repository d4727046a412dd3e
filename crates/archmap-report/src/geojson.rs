//! GeoJSON layer writer.
//!
//! Files carry a named `crs` member so they read back in the layer CRS.

use std::path::Path;

use anyhow::{Context, Result};
use archmap_model::{AttributeValue, Layer};
use geo::{Coord, Geometry, LineString, Polygon};
use serde_json::{Map, Value, json};

fn position(coord: Coord<f64>) -> Value {
    json!([coord.x, coord.y])
}

fn line_positions(line: &LineString<f64>) -> Value {
    Value::Array(line.coords().copied().map(position).collect())
}

fn polygon_positions(polygon: &Polygon<f64>) -> Value {
    let rings = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(line_positions)
        .collect();
    Value::Array(rings)
}

/// GeoJSON geometry object. Rects and triangles are written as polygons.
pub fn geometry_to_json(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(point) => json!({ "type": "Point", "coordinates": position(point.0) }),
        Geometry::MultiPoint(points) => json!({
            "type": "MultiPoint",
            "coordinates": points.iter().map(|p| position(p.0)).collect::<Vec<_>>(),
        }),
        Geometry::Line(line) => json!({
            "type": "LineString",
            "coordinates": [position(line.start), position(line.end)],
        }),
        Geometry::LineString(line) => {
            json!({ "type": "LineString", "coordinates": line_positions(line) })
        }
        Geometry::MultiLineString(lines) => json!({
            "type": "MultiLineString",
            "coordinates": lines.iter().map(line_positions).collect::<Vec<_>>(),
        }),
        Geometry::Polygon(polygon) => {
            json!({ "type": "Polygon", "coordinates": polygon_positions(polygon) })
        }
        Geometry::MultiPolygon(polygons) => json!({
            "type": "MultiPolygon",
            "coordinates": polygons.iter().map(polygon_positions).collect::<Vec<_>>(),
        }),
        Geometry::Rect(rect) => geometry_to_json(&Geometry::Polygon(rect.to_polygon())),
        Geometry::Triangle(triangle) => {
            geometry_to_json(&Geometry::Polygon(triangle.to_polygon()))
        }
        Geometry::GeometryCollection(collection) => json!({
            "type": "GeometryCollection",
            "geometries": collection.iter().map(geometry_to_json).collect::<Vec<_>>(),
        }),
    }
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::Integer(number) => json!(number),
        AttributeValue::Real(number) => json!(number),
        AttributeValue::Text(text) => Value::String(text.clone()),
    }
}

/// The layer as a FeatureCollection. Every declared field appears on every
/// feature, null when the feature lacks it.
pub fn layer_to_geojson(layer: &Layer) -> Value {
    let features: Vec<Value> = layer
        .features
        .iter()
        .map(|feature| {
            let mut properties = Map::new();
            for field in &layer.fields {
                let value = feature
                    .attribute(field)
                    .map_or(Value::Null, attribute_to_json);
                properties.insert(field.clone(), value);
            }
            json!({
                "type": "Feature",
                "id": feature.id,
                "properties": properties,
                "geometry": feature.geometry.as_ref().map_or(Value::Null, geometry_to_json),
            })
        })
        .collect();
    json!({
        "type": "FeatureCollection",
        "name": layer.name,
        "crs": { "type": "name", "properties": { "name": layer.crs.auth_id() } },
        "features": features,
    })
}

/// File name for a layer: characters unsafe in paths become `_`.
pub fn layer_file_name(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "layer".to_string() } else { stem };
    format!("{stem}.geojson")
}

pub fn write_layer(path: &Path, layer: &Layer) -> Result<()> {
    let json = serde_json::to_string_pretty(&layer_to_geojson(layer))
        .with_context(|| format!("serialize layer {}", layer.name))?;
    std::fs::write(path, format!("{json}\n")).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use archmap_model::{Crs, Feature};
    use geo::{Point, Rect, coord};

    use super::*;

    #[test]
    fn rect_is_written_as_closed_polygon() {
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 1.0 });
        let json = geometry_to_json(&rect.into());
        assert_eq!(json["type"], "Polygon");
        let ring = json["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn missing_attributes_are_null() {
        let layer = Layer::new("l", "sites", Crs::epsg(5186))
            .with_fields(["유적명", "주소"])
            .with_features(vec![
                Feature::new(1, Some(Point::new(1.0, 2.0).into())).with_attribute("유적명", "A사지"),
            ]);
        let json = layer_to_geojson(&layer);
        assert_eq!(json["crs"]["properties"]["name"], "EPSG:5186");
        assert_eq!(json["features"][0]["properties"]["주소"], Value::Null);
        assert_eq!(json["features"][0]["geometry"]["coordinates"], json!([1.0, 2.0]));
    }

    #[test]
    fn file_names_keep_hangul() {
        assert_eq!(layer_file_name("Buffer_500m"), "Buffer_500m.geojson");
        assert_eq!(layer_file_name("규제구역 / 1"), "규제구역___1.geojson");
        assert_eq!(layer_file_name("  "), "layer.geojson");
    }
}
