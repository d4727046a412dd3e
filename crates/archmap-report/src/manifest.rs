//! Run manifest: what was produced, with which settings, and what went wrong.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use archmap_core::{ExclusionCandidate, MapProducts, RunContext, RunSummary};
use archmap_model::{DataWarning, RunSettings};
use chrono::Utc;
use serde::Serialize;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_SCHEMA: &str = "archmap.run-manifest";
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// One written result layer. `path` is relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestLayer {
    pub group: &'static str,
    pub layer: String,
    pub features: usize,
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct RunManifest<'a> {
    pub schema: &'static str,
    pub schema_version: u32,
    pub generated_at: String,
    pub working_crs: String,
    pub extent: String,
    pub settings: &'a RunSettings,
    pub summary: &'a RunSummary,
    pub hidden_sites: usize,
    pub layers: &'a [ManifestLayer],
    pub candidates: &'a [ExclusionCandidate],
    pub warnings: &'a [DataWarning],
    pub log: Option<&'a str>,
}

impl<'a> RunManifest<'a> {
    pub fn new(
        products: &'a MapProducts,
        settings: &'a RunSettings,
        ctx: &'a RunContext,
        layers: &'a [ManifestLayer],
        log: Option<&'a str>,
    ) -> Self {
        let extent = &products.extent;
        Self {
            schema: MANIFEST_SCHEMA,
            schema_version: MANIFEST_SCHEMA_VERSION,
            generated_at: Utc::now().to_rfc3339(),
            working_crs: extent.crs.to_string(),
            extent: format!(
                "{:.1} x {:.1} m at 1:{}",
                extent.width_map_units(),
                extent.height_map_units(),
                extent.scale
            ),
            settings,
            summary: &products.summary,
            hidden_sites: products.heritage.excluded_count(),
            layers,
            candidates: &products.candidates,
            warnings: ctx.warnings(),
            log,
        }
    }
}

pub fn write_manifest(output_dir: &Path, manifest: &RunManifest<'_>) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;
    let path = output_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(manifest).context("serialize manifest")?;
    std::fs::write(&path, format!("{json}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
