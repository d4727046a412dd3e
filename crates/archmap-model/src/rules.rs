use serde::{Deserialize, Serialize};

/// Pattern to era/type mapping. Rules are evaluated in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Regular expression matched against the site name.
    pub pattern: String,
    #[serde(default)]
    pub era: Option<String>,
    #[serde(default, rename = "type")]
    pub site_type: Option<String>,
}

impl ClassificationRule {
    /// A rule must assign at least one label to be useful.
    pub fn assigns_anything(&self) -> bool {
        self.era.is_some() || self.site_type.is_some()
    }
}
