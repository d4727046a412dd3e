//! Data model for the archaeological distribution map engine.
//!
//! Everything the pipeline stages exchange lives here: host layer handles,
//! heritage site records, the extent/buffer frame, zone segments, run settings,
//! the error taxonomy and the recoverable-warning catalogue.

pub mod crs;
pub mod error;
pub mod frame;
pub mod groups;
pub mod heritage;
pub mod host;
pub mod layer;
pub mod options;
pub mod rules;
pub mod stage;
pub mod warning;
pub mod zone;

pub use crs::Crs;
pub use error::{GeometryError, PipelineError, Result};
pub use frame::{BufferRing, BufferSet, Extent, StudyArea};
pub use groups::ResultGroup;
pub use heritage::{
    DisplayFilter, ExclusionReason, HeritageLayer, HeritageSite, fields, normalize_name,
};
pub use host::{HostError, LayerHost};
pub use layer::{AttributeValue, Feature, GeometryKind, Layer, LayerId, SourceFile};
pub use options::{
    LabelStyle, NumberingPolicy, PaperSize, RunSettings, SmartFilterOptions, TierNumbering,
};
pub use rules::ClassificationRule;
pub use stage::Stage;
pub use warning::DataWarning;
pub use zone::{ZoneLayer, ZoneSegment};
