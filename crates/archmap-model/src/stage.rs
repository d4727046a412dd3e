use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Setup,
    StudyArea,
    TopoMerge,
    Extent,
    Buffers,
    Collection,
    Dissolve,
    RangeFilter,
    Classification,
    Numbering,
    Zones,
    Refresh,
    Scan,
}

impl Stage {
    /// Stages of a full map run, in order.
    pub const RUN: [Stage; 11] = [
        Stage::Setup,
        Stage::StudyArea,
        Stage::TopoMerge,
        Stage::Extent,
        Stage::Buffers,
        Stage::Collection,
        Stage::Dissolve,
        Stage::RangeFilter,
        Stage::Classification,
        Stage::Numbering,
        Stage::Zones,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::StudyArea => "study area",
            Self::TopoMerge => "topo merge",
            Self::Extent => "extent",
            Self::Buffers => "buffers",
            Self::Collection => "heritage collection",
            Self::Dissolve => "dissolve",
            Self::RangeFilter => "range filter",
            Self::Classification => "classification",
            Self::Numbering => "numbering",
            Self::Zones => "zone split",
            Self::Refresh => "refresh numbering",
            Self::Scan => "smart scan",
        }
    }

    /// 1-based position within a full run, used for progress totals.
    pub fn position(self) -> Option<usize> {
        Self::RUN.iter().position(|stage| *stage == self).map(|idx| idx + 1)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
