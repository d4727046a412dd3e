//! Error taxonomy for the map pipeline.
//!
//! Fatal conditions are [`PipelineError`] variants. Recoverable data problems
//! are not errors at all: they are recorded as
//! [`DataWarning`](crate::warning::DataWarning)s and processing continues.

use thiserror::Error;

use crate::stage::Stage;

/// Problems with geometry feeding a spatial operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{what} geometry is empty")]
    Empty { what: String },

    #[error("cannot compute a reference point for {what}")]
    NoCentroid { what: String },

    #[error("{what} contains non-finite coordinates")]
    NonFinite { what: String },

    #[error("unsupported {kind} geometry for {operation}")]
    Unsupported {
        operation: &'static str,
        kind: String,
    },

    #[error("coordinate transform {from} -> {to} failed: {reason}")]
    Transform {
        from: String,
        to: String,
        reason: String,
    },
}

/// Terminal failures. Each one aborts the operation that raised it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input is missing or empty. Raised before any layer mutation.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Parameters that contradict each other or are out of range.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Empty or invalid geometry reached a spatial operation.
    #[error("geometry error during {stage}: {source}")]
    Geometry {
        stage: Stage,
        #[source]
        source: GeometryError,
    },

    /// A layer handed to refresh numbering lacks the expected field.
    #[error("layer '{layer}' is not a numbered heritage layer (missing field '{field}')")]
    Compatibility { layer: String, field: String },
}

impl PipelineError {
    pub fn geometry(stage: Stage, source: GeometryError) -> Self {
        Self::Geometry { stage, source }
    }

    /// Stage that raised a geometry failure, when known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Geometry { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_message_names_layer_and_field() {
        let err = PipelineError::Compatibility {
            layer: "sites".to_string(),
            field: "번호".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "layer 'sites' is not a numbered heritage layer (missing field '번호')"
        );
    }

    #[test]
    fn geometry_error_keeps_source() {
        let err = PipelineError::geometry(
            Stage::Buffers,
            GeometryError::NonFinite {
                what: "study area".to_string(),
            },
        );
        assert_eq!(err.stage(), Some(Stage::Buffers));
        assert!(std::error::Error::source(&err).is_some());
    }
}
