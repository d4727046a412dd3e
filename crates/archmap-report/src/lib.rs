//! Output generation for completed map runs.
//!
//! - **GeoJSON**: one file per result layer, inside its result-group directory
//! - **Heritage table**: CSV of every site, hidden rows included
//! - **Manifest**: settings, stage counts, warnings and output paths as JSON
//! - **Run log**: the stage-tagged user log

mod geojson;
mod manifest;
mod table;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use archmap_core::{MapProducts, RunContext};
use archmap_model::RunSettings;
use tracing::info;

pub use geojson::{geometry_to_json, layer_file_name, layer_to_geojson, write_layer};
pub use manifest::{
    MANIFEST_FILE, MANIFEST_SCHEMA, MANIFEST_SCHEMA_VERSION, ManifestLayer, RunManifest,
    write_manifest,
};
pub use table::{HERITAGE_TABLE_FILE, TABLE_COLUMNS, write_heritage_table};

pub const RUN_LOG_FILE: &str = "archmap_run.log";

/// Paths written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSet {
    pub layers: Vec<PathBuf>,
    pub heritage_table: PathBuf,
    pub manifest: PathBuf,
    pub log: PathBuf,
}

/// Writes every result layer under `output_dir/<results root>/<group>/`.
pub fn write_result_layers(output_dir: &Path, products: &MapProducts) -> Result<Vec<ManifestLayer>> {
    let mut written = Vec::new();
    for (group, layer) in products.result_layers() {
        let group_dir = output_dir.join(group.path());
        std::fs::create_dir_all(&group_dir)
            .with_context(|| format!("create {}", group_dir.display()))?;
        let relative = PathBuf::from(group.path()).join(layer_file_name(&layer.name));
        write_layer(&output_dir.join(&relative), &layer)?;
        written.push(ManifestLayer {
            group: group.name(),
            layer: layer.name.clone(),
            features: layer.feature_count(),
            path: relative,
        });
    }
    Ok(written)
}

/// Writes the run log to `output_dir`.
pub fn write_run_log(output_dir: &Path, ctx: &RunContext) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;
    let path = output_dir.join(RUN_LOG_FILE);
    std::fs::write(&path, ctx.render_log())
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Writes all outputs of a completed run.
pub fn write_outputs(
    output_dir: &Path,
    products: &MapProducts,
    settings: &RunSettings,
    ctx: &RunContext,
) -> Result<OutputSet> {
    let layers = write_result_layers(output_dir, products)?;
    let heritage_table = output_dir.join(HERITAGE_TABLE_FILE);
    write_heritage_table(&heritage_table, &products.heritage)?;
    let log = write_run_log(output_dir, ctx)?;
    let manifest = RunManifest::new(products, settings, ctx, &layers, Some(RUN_LOG_FILE));
    let manifest_path = write_manifest(output_dir, &manifest)?;
    info!(
        layers = layers.len(),
        output = %output_dir.display(),
        "outputs written"
    );
    Ok(OutputSet {
        layers: layers.iter().map(|layer| output_dir.join(&layer.path)).collect(),
        heritage_table,
        manifest: manifest_path,
        log,
    })
}
