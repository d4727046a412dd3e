//! Layer host backed by GeoJSON files on disk.

use std::collections::BTreeMap;

use archmap_ingest::read_layer;
use archmap_model::{HostError, Layer, LayerHost, LayerId};
use encoding_rs::Encoding;
use tracing::debug;

/// Reloads layers from their source file and records group assignments.
///
/// Files never move; relocation is bookkeeping reported in the run summary.
#[derive(Debug, Default)]
pub struct FileHost {
    groups: BTreeMap<LayerId, String>,
}

impl FileHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_of(&self, layer: &LayerId) -> Option<&str> {
        self.groups.get(layer).map(String::as_str)
    }

    pub fn relocated(&self) -> usize {
        self.groups.len()
    }
}

impl LayerHost for FileHost {
    fn reload_with_encoding(
        &mut self,
        layer: &Layer,
        encoding: &'static Encoding,
    ) -> Result<Layer, HostError> {
        let source = layer
            .source
            .as_ref()
            .ok_or_else(|| HostError::NoSource(layer.id.clone()))?;
        debug!(path = %source.path.display(), encoding = encoding.name(), "reloading layer");
        let mut reloaded = read_layer(&source.path, encoding).map_err(|error| HostError::Reload {
            layer: layer.id.clone(),
            reason: error.to_string(),
        })?;
        reloaded.id = layer.id.clone();
        Ok(reloaded)
    }

    fn move_layer_to_group(&mut self, layer: &LayerId, group: &str) -> Result<(), HostError> {
        self.groups.insert(layer.clone(), group.to_string());
        Ok(())
    }
}
