//! Ordered pattern rules assigning era and type from a site name.

use std::path::Path;

use archmap_model::ClassificationRule;
use regex::Regex;
use serde::Deserialize;

use crate::error::{Result, StandardsError};

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default, rename = "rule")]
    rules: Vec<ClassificationRule>,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: ClassificationRule,
    regex: Regex,
}

/// Compiled rules in declaration order; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ClassificationRule>) -> Result<Self> {
        let compiled = rules
            .into_iter()
            .enumerate()
            .map(|(index, rule)| {
                if !rule.assigns_anything() {
                    return Err(StandardsError::EmptyRule {
                        index: index + 1,
                        pattern: rule.pattern,
                    });
                }
                let regex =
                    Regex::new(&rule.pattern).map_err(|source| StandardsError::InvalidPattern {
                        index: index + 1,
                        pattern: rule.pattern.clone(),
                        source,
                    })?;
                Ok(CompiledRule { rule, regex })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules: compiled })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &ClassificationRule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    /// First rule whose pattern matches `name`.
    pub fn first_match(&self, name: &str) -> Option<&ClassificationRule> {
        self.rules
            .iter()
            .find(|compiled| compiled.regex.is_match(name))
            .map(|compiled| &compiled.rule)
    }
}

/// Parses `[[rule]]` tables from TOML text.
pub fn parse_rules(text: &str, path: &Path) -> Result<RuleSet> {
    let file: RuleFile = toml::from_str(text).map_err(|source| StandardsError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    RuleSet::new(file.rules)
}

pub fn load_rules(path: &Path) -> Result<RuleSet> {
    let text = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
    parse_rules(&text, path)
}
