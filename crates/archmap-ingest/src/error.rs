//! Error types for layer ingestion.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Layer file not found.
    #[error("layer file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding label not recognized by the decoder.
    #[error("unknown text encoding '{label}'")]
    UnknownEncoding { label: String },

    /// Not valid JSON after decoding.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Valid JSON but not a GeoJSON feature collection.
    #[error("{path} is not a GeoJSON FeatureCollection")]
    NotFeatureCollection { path: PathBuf },

    /// A geometry member could not be read.
    #[error("invalid geometry in feature {index} of {path}: {reason}")]
    InvalidGeometry {
        path: PathBuf,
        index: usize,
        reason: String,
    },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
