//! Standards directory path resolution.

use std::path::PathBuf;

/// Environment variable for overriding the standards directory.
pub const STANDARDS_ENV_VAR: &str = "ARCHMAP_STANDARDS_DIR";

pub const CLASSIFICATION_RULES_FILE: &str = "classification_rules.toml";
pub const REFERENCE_DATA_FILE: &str = "reference_data.json";
pub const SMART_FILTER_FILE: &str = "smart_filter.toml";

/// Get the standards root directory.
///
/// Resolution order:
/// 1. `ARCHMAP_STANDARDS_DIR` environment variable
/// 2. `standards/` directory relative to workspace root
pub fn standards_root() -> PathBuf {
    if let Ok(root) = std::env::var(STANDARDS_ENV_VAR) {
        return PathBuf::from(root);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../standards")
}

pub fn classification_rules_path() -> PathBuf {
    standards_root().join(CLASSIFICATION_RULES_FILE)
}

pub fn reference_data_path() -> PathBuf {
    standards_root().join(REFERENCE_DATA_FILE)
}

pub fn smart_filter_path() -> PathBuf {
    standards_root().join(SMART_FILTER_FILE)
}
