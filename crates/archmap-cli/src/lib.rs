//! Library half of the `archmap` command: project files, the file-backed
//! layer host, logging setup and the run workflows.

pub mod host;
pub mod logging;
pub mod project;
pub mod workflow;
