//! Heritage source ingestion.
//!
//! Loads GeoJSON layers with an explicit text encoding, repairs mis-decoded
//! Korean attribute text through the host, discovers conventional field names
//! and merges all source layers into one normalized heritage site set.

pub mod collector;
pub mod encoding;
mod error;
pub mod fields;
pub mod geojson;

// === Error Types ===
pub use error::{IngestError, Result};

// === Collection ===
pub use collector::{Collection, HeritageCollector, LayerReport, display_name};
pub use encoding::{CorruptionReport, RepairOutcome, detect as detect_corruption, repair as repair_encoding};
pub use fields::{FieldMap, find_field};
pub use geojson::{encoding_for_label, parse_layer, read_layer};
