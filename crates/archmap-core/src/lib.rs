//! Distribution map pipeline.
//!
//! Stage implementations ([`dissolve`], [`range`], [`classify`],
//! [`numbering`], [`zone`], [`topo`]) operate on plain model values and a
//! [`RunContext`]; [`pipeline::MapPipeline`] sequences them into a full run.

pub mod classify;
pub mod context;
pub mod dissolve;
pub mod numbering;
pub mod pipeline;
pub mod range;
pub mod topo;
pub mod zone;

pub use classify::{
    CandidateReason, CategoryCount, CategorySource, ClassificationReport, ExclusionCandidate,
    ScanReport, SmartClassifier, scan_categories,
};
pub use context::{CancelToken, LogEntry, LogLevel, Progress, RunContext};
pub use dissolve::{DissolveMerger, DissolveReport, dissolve_sites};
pub use numbering::{NumberingEngine, NumberingReport, collation_key, tier_for};
pub use pipeline::{
    ClassificationPreview, MapInputs, MapPipeline, MapProducts, RunError, RunOutcome, RunSummary,
};
pub use range::{RangeFilter, RangeReport};
pub use topo::{TopoMerger, TopoReport};
pub use zone::ZoneSplitter;
