//! Project files.
//!
//! A project names the input layers of a map run and its settings:
//!
//! ```toml
//! name = "OO 택지개발사업 문화유산 분포지도"
//! output_dir = "output"
//! encoding = "utf-8"
//!
//! [layers]
//! study_area = "layers/study_area.geojson"
//! topo = ["layers/topo_36710.geojson"]
//! heritage = [
//!     "layers/designated.geojson",
//!     { path = "layers/survey.geojson", encoding = "cp949" },
//! ]
//! zones = "layers/zones.geojson"
//!
//! [settings]
//! scale = 5000
//! buffers = [500, 1000]
//! numbering = "distance"
//! ```
//!
//! Relative paths resolve against the project file's directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use archmap_core::MapInputs;
use archmap_ingest::{encoding_for_label, read_layer};
use archmap_model::{Layer, RunSettings};
use archmap_standards::{Standards, standards_root};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_ENCODING: &str = "utf-8";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

// =============================================================================
// FILE FORMAT
// =============================================================================

/// A layer file, optionally with its own text encoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LayerSpec {
    Path(PathBuf),
    Detailed {
        path: PathBuf,
        encoding: Option<String>,
    },
}

impl LayerSpec {
    pub fn path(&self) -> &Path {
        match self {
            Self::Path(path) | Self::Detailed { path, .. } => path,
        }
    }

    pub fn encoding(&self) -> Option<&str> {
        match self {
            Self::Path(_) => None,
            Self::Detailed { encoding, .. } => encoding.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LayerSelection {
    pub study_area: Option<LayerSpec>,
    pub topo: Vec<LayerSpec>,
    pub heritage: Vec<LayerSpec>,
    pub zones: Option<LayerSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Default encoding of every layer file.
    #[serde(default)]
    pub encoding: Option<String>,
    /// Overrides the standards directory lookup.
    #[serde(default)]
    pub standards_dir: Option<PathBuf>,
    #[serde(default)]
    pub layers: LayerSelection,
    #[serde(default)]
    pub settings: RunSettings,
}

// =============================================================================
// RESOLVED PROJECT
// =============================================================================

/// A project file with every path resolved.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
    pub base_dir: PathBuf,
    pub file: ProjectFile,
}

impl Project {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read project {}", path.display()))?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let file: ProjectFile =
            toml::from_str(text).with_context(|| format!("parse project {}", path.display()))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let name = file.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("project")
                .to_string()
        });
        Ok(Self {
            name,
            path: path.to_path_buf(),
            base_dir,
            file,
        })
    }

    pub fn settings(&self) -> &RunSettings {
        &self.file.settings
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        let dir = self
            .file
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        self.resolve(&dir)
    }

    pub fn standards_dir(&self) -> PathBuf {
        match &self.file.standards_dir {
            Some(dir) => self.resolve(dir),
            None => standards_root(),
        }
    }

    pub fn standards(&self) -> Standards {
        Standards::load(&self.standards_dir())
    }

    /// Reads one layer with its own encoding, the project default otherwise.
    pub fn read(&self, spec: &LayerSpec) -> Result<Layer> {
        let label = spec
            .encoding()
            .or(self.file.encoding.as_deref())
            .unwrap_or(DEFAULT_ENCODING);
        let encoding = encoding_for_label(label)?;
        let path = self.resolve(spec.path());
        let layer = read_layer(&path, encoding).with_context(|| format!("load layer {}", path.display()))?;
        debug!(layer = %layer.name, features = layer.feature_count(), "layer loaded");
        Ok(layer)
    }

    fn read_all(&self, specs: &[LayerSpec]) -> Result<Vec<Layer>> {
        specs.iter().map(|spec| self.read(spec)).collect()
    }

    /// Loads every selected layer.
    pub fn load_inputs(&self) -> Result<MapInputs> {
        let layers = &self.file.layers;
        Ok(MapInputs {
            study_area: layers
                .study_area
                .as_ref()
                .map(|spec| self.read(spec))
                .transpose()?,
            topo: self.read_all(&layers.topo)?,
            heritage: self.read_all(&layers.heritage)?,
            zones: layers.zones.as_ref().map(|spec| self.read(spec)).transpose()?,
        })
    }

    pub fn load_heritage(&self) -> Result<Vec<Layer>> {
        self.read_all(&self.file.layers.heritage)
    }

    pub fn load_study_area(&self) -> Result<Option<Layer>> {
        self.file
            .layers
            .study_area
            .as_ref()
            .map(|spec| self.read(spec))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use archmap_model::NumberingPolicy;

    use super::*;

    const PROJECT: &str = r#"
        name = "시굴조사 분포지도"
        encoding = "cp949"

        [layers]
        study_area = "study.geojson"
        heritage = ["a.geojson", { path = "/data/b.geojson", encoding = "utf-8" }]

        [settings]
        buffers = [500, 1000]
        numbering = "distance"
    "#;

    #[test]
    fn layer_specs_accept_plain_and_detailed_forms() {
        let project = Project::parse(PROJECT, Path::new("/work/map/project.toml")).unwrap();
        let heritage = &project.file.layers.heritage;
        assert_eq!(heritage[0], LayerSpec::Path(PathBuf::from("a.geojson")));
        assert_eq!(heritage[1].encoding(), Some("utf-8"));
        assert_eq!(project.resolve(heritage[0].path()), PathBuf::from("/work/map/a.geojson"));
        assert_eq!(project.resolve(heritage[1].path()), PathBuf::from("/data/b.geojson"));
        assert_eq!(project.output_dir(), PathBuf::from("/work/map/output"));
        assert_eq!(project.settings().numbering, NumberingPolicy::DistanceFromStudyArea);
        assert_eq!(project.settings().buffers, vec![500.0, 1000.0]);
    }

    #[test]
    fn name_defaults_to_file_stem() {
        let project = Project::parse("", Path::new("survey.toml")).unwrap();
        assert_eq!(project.name, "survey");
        assert!(project.file.layers.heritage.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Project::parse("scale = 5000", Path::new("p.toml")).is_err());
    }
}
