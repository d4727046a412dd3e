//! Heritage status table.

use std::path::Path;

use anyhow::{Context, Result};
use archmap_geometry::measure;
use archmap_model::{AttributeValue, HeritageLayer, HeritageSite, fields};

pub const HERITAGE_TABLE_FILE: &str = "heritage_sites.csv";

/// Attribute columns followed by the representative point.
pub const TABLE_COLUMNS: [&str; 17] = [
    fields::SEQUENCE,
    fields::NAME,
    fields::ADDRESS,
    fields::AREA,
    fields::HERITAGE_NAME,
    fields::PROJECT,
    fields::SOURCE_LAYER,
    fields::CATEGORY,
    fields::DESIGNATED,
    fields::ERA,
    fields::TYPE,
    fields::TIER,
    fields::DISTANCE,
    fields::EXCLUDED,
    fields::EXCLUSION_REASON,
    "X",
    "Y",
];

fn row(site: &HeritageSite) -> Vec<String> {
    let feature = site.to_feature(0);
    let mut cells: Vec<String> = TABLE_COLUMNS[..fields::ALL.len()]
        .iter()
        .map(|column| {
            feature
                .attribute(column)
                .and_then(AttributeValue::as_text)
                .unwrap_or_default()
        })
        .collect();
    match measure::centroid(&site.geometry) {
        Some(point) => {
            cells.push(format!("{:.3}", point.x));
            cells.push(format!("{:.3}", point.y));
        }
        None => cells.extend([String::new(), String::new()]),
    }
    cells
}

/// Writes every site: numbered rows in number order, hidden rows last.
pub fn write_heritage_table(path: &Path, heritage: &HeritageLayer) -> Result<()> {
    let mut sites: Vec<&HeritageSite> = heritage.sites.iter().collect();
    sites.sort_by_key(|site| (site.sequence_number.is_none(), site.sequence_number));

    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer
        .write_record(TABLE_COLUMNS)
        .with_context(|| format!("write header to {}", path.display()))?;
    for site in sites {
        writer
            .write_record(row(site))
            .with_context(|| format!("write row '{}'", site.name))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}
