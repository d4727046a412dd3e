use std::fmt;

use serde::Serialize;

/// Top-level group holding all result layers.
pub const RESULTS_ROOT: &str = "ArchMap_Results";

/// Group receiving the relocated original layers.
pub const SOURCE_DATA: &str = "99_Source_Data";

/// Ordered result subgroups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ResultGroup {
    StudyArea,
    Heritage,
    Extent,
    Buffers,
    Topo,
    Zones,
}

impl ResultGroup {
    pub const ALL: [ResultGroup; 6] = [
        ResultGroup::StudyArea,
        ResultGroup::Heritage,
        ResultGroup::Extent,
        ResultGroup::Buffers,
        ResultGroup::Topo,
        ResultGroup::Zones,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::StudyArea => "00_StudyArea_and_Title",
            Self::Heritage => "01_Heritage_Status",
            Self::Extent => "02_Extent_and_Area",
            Self::Buffers => "03_StudyArea_Buffer",
            Self::Topo => "04_Topo_Map_Merged",
            Self::Zones => "05_Zone_Boundaries",
        }
    }

    /// Slash-separated path below the results root.
    pub fn path(self) -> String {
        format!("{RESULTS_ROOT}/{}", self.name())
    }
}

impl fmt::Display for ResultGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
