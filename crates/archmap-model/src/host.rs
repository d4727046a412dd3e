//! Collaborator interface to the host application that owns the layers.

use encoding_rs::Encoding;
use geo::Coord;
use thiserror::Error;

use crate::layer::{Layer, LayerId};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("layer {0} not found")]
    LayerNotFound(LayerId),

    #[error("layer {0} has no source file to reload")]
    NoSource(LayerId),

    #[error("reload of layer {layer} failed: {reason}")]
    Reload { layer: LayerId, reason: String },

    #[error("cannot move layer {layer} to group '{group}': {reason}")]
    Relocation {
        layer: LayerId,
        group: String,
        reason: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations the pipeline asks of the host. Every call reports success or failure.
pub trait LayerHost {
    /// Reopens the source of `layer` decoding text with `encoding`.
    fn reload_with_encoding(
        &mut self,
        layer: &Layer,
        encoding: &'static Encoding,
    ) -> Result<Layer, HostError>;

    /// Moves a layer into the named group, creating the group when needed.
    fn move_layer_to_group(&mut self, layer: &LayerId, group: &str) -> Result<(), HostError>;

    /// Center of the current view, the extent fallback reference point.
    fn view_center(&self) -> Option<Coord<f64>> {
        None
    }
}
