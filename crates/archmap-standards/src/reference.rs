//! Compiled exact-name reference entries.
//!
//! The file maps a site name to a compact record: `{"A사지": {"e": "통일신라", "t": "사지"}}`.

use std::collections::BTreeMap;
use std::path::Path;

use archmap_model::normalize_name;
use serde::Deserialize;

use crate::error::{Result, StandardsError};

pub const UNKNOWN_ERA: &str = "시대미상";
pub const UNKNOWN_TYPE: &str = "기타";

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    e: Option<String>,
    #[serde(default)]
    t: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub era: String,
    pub site_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    entries: BTreeMap<String, ReferenceEntry>,
}

impl ReferenceData {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceEntry> {
        self.entries.get(&normalize_name(name))
    }
}

/// Drops survey code prefixes such as `0)고분`.
pub fn clean_type(raw: &str) -> String {
    match raw.split_once(')') {
        Some((_, rest)) if !rest.trim().is_empty() => rest.trim().to_string(),
        _ => raw.trim().to_string(),
    }
}

fn label_or(value: Option<String>, fallback: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn parse_reference(text: &str, path: &Path) -> Result<ReferenceData> {
    let raw: BTreeMap<String, RawEntry> =
        serde_json::from_str(text).map_err(|source| StandardsError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let entries = raw
        .into_iter()
        .filter_map(|(name, entry)| {
            let key = normalize_name(&name);
            if key.is_empty() {
                return None;
            }
            let site_type = label_or(entry.t.as_deref().map(clean_type), UNKNOWN_TYPE);
            Some((
                key,
                ReferenceEntry {
                    era: label_or(entry.e, UNKNOWN_ERA),
                    site_type,
                },
            ))
        })
        .collect();
    Ok(ReferenceData { entries })
}

pub fn load_reference(path: &Path) -> Result<ReferenceData> {
    let text = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
    parse_reference(&text, path)
}
