//! Reference data for heritage classification.
//!
//! Three resources live in the standards directory: ordered pattern rules
//! (`classification_rules.toml`), compiled exact-name entries
//! (`reference_data.json`) and smart-filter patterns (`smart_filter.toml`).
//! Loading never aborts a run: a missing or malformed resource is reported as
//! a [`DataWarning`] and the classifier degrades accordingly.

pub mod error;
pub mod filter;
pub mod paths;
pub mod reference;
pub mod rules;

use std::path::Path;

use archmap_model::DataWarning;
use tracing::{info, warn};

pub use crate::error::{Result, StandardsError};
pub use crate::filter::{CategoryKeywords, SmartFilterPatterns};
pub use crate::paths::{STANDARDS_ENV_VAR, standards_root};
pub use crate::reference::{ReferenceData, ReferenceEntry};
pub use crate::rules::RuleSet;

/// Everything the classifier consults, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct Standards {
    pub rules: Option<RuleSet>,
    pub reference: Option<ReferenceData>,
    pub filter: SmartFilterPatterns,
    pub warnings: Vec<DataWarning>,
}

impl Standards {
    /// Loads from [`standards_root`].
    pub fn load_default() -> Self {
        Self::load(&standards_root())
    }

    pub fn load(root: &Path) -> Self {
        let mut standards = Self::default();

        let rules_path = root.join(paths::CLASSIFICATION_RULES_FILE);
        match rules::load_rules(&rules_path) {
            Ok(rules) => {
                info!(count = rules.len(), path = %rules_path.display(), "classification rules loaded");
                standards.rules = Some(rules);
            }
            Err(error) => standards.unavailable(paths::CLASSIFICATION_RULES_FILE, &error),
        }

        let reference_path = root.join(paths::REFERENCE_DATA_FILE);
        if reference_path.exists() {
            match reference::load_reference(&reference_path) {
                Ok(reference) => {
                    info!(count = reference.len(), "reference entries loaded");
                    standards.reference = Some(reference);
                }
                Err(error) => standards.unavailable(paths::REFERENCE_DATA_FILE, &error),
            }
        }

        let filter_path = root.join(paths::SMART_FILTER_FILE);
        if filter_path.exists() {
            match filter::load_filter(&filter_path) {
                Ok(filter) => standards.filter = filter,
                Err(error) => standards.unavailable(paths::SMART_FILTER_FILE, &error),
            }
        }
        standards
    }

    /// True when neither rules nor reference entries are available.
    pub fn is_degraded(&self) -> bool {
        self.rules.is_none() && self.reference.is_none()
    }

    fn unavailable(&mut self, resource: &str, error: &StandardsError) {
        warn!(resource, error = %error, "reference data unavailable");
        self.warnings.push(DataWarning::ReferenceDataUnavailable {
            resource: resource.to_string(),
            reason: error.to_string(),
        });
    }
}
