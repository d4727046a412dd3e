//! Host layer handles: the feature tables the pipeline reads and produces.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use geo::Geometry;
use serde::{Deserialize, Serialize};

use crate::crs::Crs;

/// Identifier of a layer inside the host registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single attribute cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl AttributeValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Trimmed, non-empty textual rendering of the value.
    pub fn as_text(&self) -> Option<String> {
        let rendered = match self {
            Self::Null => return None,
            Self::Bool(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => value.to_string(),
            Self::Text(value) => value.trim().to_string(),
        };
        let rendered = rendered.trim().to_string();
        if rendered.is_empty() || rendered.eq_ignore_ascii_case("null") {
            None
        } else {
            Some(rendered)
        }
    }

    /// Numeric view; text is parsed after stripping thousands separators.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Real(value) if value.is_finite() => Some(*value),
            Self::Text(value) => value.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Real(value) if value.fract() == 0.0 && value.is_finite() => Some(*value as i64),
            Self::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One row of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: u64,
    pub geometry: Option<Geometry<f64>>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Feature {
    pub fn new(id: u64, geometry: Option<Geometry<f64>>) -> Self {
        Self {
            id,
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, field: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(field.into(), value.into());
        self
    }

    pub fn attribute(&self, field: &str) -> Option<&AttributeValue> {
        self.attributes.get(field)
    }

    /// Text value of a field, `None` when missing, null or blank.
    pub fn text(&self, field: &str) -> Option<String> {
        self.attributes.get(field).and_then(AttributeValue::as_text)
    }
}

/// Geometry family of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
    #[default]
    Unknown,
}

impl GeometryKind {
    pub fn from_geometry(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Self::Point,
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                Self::Line
            }
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Triangle(_) => Self::Polygon,
            Geometry::GeometryCollection(_) => Self::Unknown,
        }
    }

    /// Kind shared by every geometry-bearing feature, `Unknown` when mixed.
    pub fn infer<'a>(geometries: impl IntoIterator<Item = &'a Geometry<f64>>) -> Self {
        let mut kind = None;
        for geometry in geometries {
            let current = Self::from_geometry(geometry);
            match kind {
                None => kind = Some(current),
                Some(existing) if existing != current => return Self::Unknown,
                Some(_) => {}
            }
        }
        kind.unwrap_or_default()
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Point => "point",
            Self::Line => "line",
            Self::Polygon => "polygon",
            Self::Unknown => "unknown",
        })
    }
}

/// Where a layer was loaded from, so the host can reload it with another codepage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub encoding: String,
}

/// A feature table with a CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub crs: Crs,
    pub kind: GeometryKind,
    /// Field names in declaration order.
    pub fields: Vec<String>,
    pub features: Vec<Feature>,
    pub source: Option<SourceFile>,
}

impl Layer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, crs: Crs) -> Self {
        Self {
            id: LayerId::new(id),
            name: name.into(),
            crs,
            kind: GeometryKind::Unknown,
            fields: Vec::new(),
            features: Vec::new(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the features and infers the geometry kind from them.
    #[must_use]
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.kind = GeometryKind::infer(features.iter().filter_map(|f| f.geometry.as_ref()));
        for feature in &features {
            for field in feature.attributes.keys() {
                if !self.fields.iter().any(|existing| existing == field) {
                    self.fields.push(field.clone());
                }
            }
        }
        self.features = features;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: SourceFile) -> Self {
        self.source = Some(source);
        self
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|existing| existing == field)
    }

    pub fn geometries(&self) -> impl Iterator<Item = &Geometry<f64>> {
        self.features.iter().filter_map(|f| f.geometry.as_ref())
    }

    /// Up to `limit` non-empty text values across all fields, in feature order.
    pub fn text_samples(&self, limit: usize) -> Vec<&str> {
        self.features
            .iter()
            .flat_map(|feature| feature.attributes.values())
            .filter_map(|value| match value {
                AttributeValue::Text(text) if !text.trim().is_empty() => Some(text.as_str()),
                _ => None,
            })
            .take(limit)
            .collect()
    }
}
