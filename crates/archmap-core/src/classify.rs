//! Era/type classification, exclusion candidates and the smart category scan.

use std::collections::BTreeMap;

use archmap_ingest::FieldMap;
use archmap_ingest::fields::is_designated_layer;
use archmap_model::{HeritageSite, Layer, SmartFilterOptions};
use archmap_standards::Standards;
use serde::Serialize;
use tracing::debug;

use crate::context::RunContext;

/// Why a site is proposed for manual exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CandidateReason {
    /// No reference entry or rule matched the name.
    Unclassified,
    /// Category or type names non-site heritage.
    NonSite { category: String },
    /// Era label is modern.
    ModernEra { era: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionCandidate {
    pub name: String,
    pub source_layer: String,
    #[serde(flatten)]
    pub reason: CandidateReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ClassificationReport {
    pub by_reference: usize,
    pub by_rule: usize,
    pub unmatched: usize,
    /// Designated sites kept despite a smart-filter match.
    pub preserved: usize,
    pub candidates: Vec<ExclusionCandidate>,
}

pub struct SmartClassifier<'a> {
    standards: &'a Standards,
    options: SmartFilterOptions,
}

impl<'a> SmartClassifier<'a> {
    pub fn new(standards: &'a Standards, options: SmartFilterOptions) -> Self {
        Self { standards, options }
    }

    /// Classifies every site and collects exclusion candidates among the
    /// non-excluded ones. Never fails; missing reference data makes the
    /// lookup a no-op.
    pub fn classify(&self, sites: &mut [HeritageSite], ctx: &mut RunContext) -> ClassificationReport {
        for warning in &self.standards.warnings {
            ctx.warn(warning.clone());
        }
        let mut report = ClassificationReport::default();
        for site in sites.iter_mut() {
            let matched = self.assign(site, &mut report);
            if site.excluded {
                continue;
            }
            if let Some(reason) = self.filter_reason(site) {
                if site.designated {
                    debug!(name = %site.name, "designated heritage preserved");
                    report.preserved += 1;
                } else {
                    report.candidates.push(candidate(site, reason));
                }
            } else if !matched && !self.standards.is_degraded() {
                report.candidates.push(candidate(site, CandidateReason::Unclassified));
            }
        }
        let classified = report.by_reference + report.by_rule;
        ctx.count(
            classified,
            format!(
                "{classified} classified ({} by reference, {} by rule), {} unmatched, {} exclusion candidates",
                report.by_reference,
                report.by_rule,
                report.unmatched,
                report.candidates.len()
            ),
        );
        report
    }

    fn assign(&self, site: &mut HeritageSite, report: &mut ClassificationReport) -> bool {
        if let Some(entry) = self
            .standards
            .reference
            .as_ref()
            .and_then(|reference| reference.get(&site.name))
        {
            site.era = Some(entry.era.clone());
            site.site_type = Some(entry.site_type.clone());
            report.by_reference += 1;
            return true;
        }
        if let Some(rule) = self
            .standards
            .rules
            .as_ref()
            .and_then(|rules| rules.first_match(&site.name))
        {
            if let Some(era) = &rule.era {
                site.era = Some(era.clone());
            }
            if let Some(site_type) = &rule.site_type {
                site.site_type = Some(site_type.clone());
            }
            report.by_rule += 1;
            return true;
        }
        report.unmatched += 1;
        false
    }

    fn filter_reason(&self, site: &HeritageSite) -> Option<CandidateReason> {
        let filter = &self.standards.filter;
        if self.options.exclude_non_sites {
            let hit = [site.category.as_deref(), site.site_type.as_deref()]
                .into_iter()
                .flatten()
                .find_map(|value| filter.non_site_category(value));
            if let Some(category) = hit {
                return Some(CandidateReason::NonSite {
                    category: category.to_string(),
                });
            }
        }
        if self.options.exclude_modern
            && let Some(era) = site.era.as_deref()
            && filter.modern_keyword(era).is_some()
        {
            return Some(CandidateReason::ModernEra {
                era: era.to_string(),
            });
        }
        None
    }
}

fn candidate(site: &HeritageSite, reason: CandidateReason) -> ExclusionCandidate {
    ExclusionCandidate {
        name: site.name.clone(),
        source_layer: site.source_layer_name.clone(),
        reason,
    }
}

/// Where a scanned category came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    Designated,
    Attribute,
    Inferred,
    Unclassified,
}

pub const DESIGNATED_CATEGORY: &str = "지정유산";
pub const UNCLASSIFIED_CATEGORY: &str = "미분류";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub source: CategorySource,
    pub count: usize,
    /// The smart filter would propose these for exclusion.
    pub non_site: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ScanReport {
    pub total: usize,
    /// Features assigned a category other than unclassified.
    pub matched: usize,
    pub categories: Vec<CategoryCount>,
}

/// Enumerates heritage categories across `layers`, most frequent first.
pub fn scan_categories(layers: &[Layer], standards: &Standards, ctx: &mut RunContext) -> ScanReport {
    let filter = &standards.filter;
    let mut counts: BTreeMap<(String, CategorySource), usize> = BTreeMap::new();
    let mut total = 0;
    for layer in layers {
        let fields = FieldMap::resolve(layer);
        let designated_layer = is_designated_layer(&layer.name);
        for feature in &layer.features {
            total += 1;
            let text = |field: &Option<String>| field.as_deref().and_then(|f| feature.text(f));
            let key = if designated_layer || text(&fields.heritage_name).is_some() {
                (DESIGNATED_CATEGORY.to_string(), CategorySource::Designated)
            } else if let Some(category) = text(&fields.category) {
                (category, CategorySource::Attribute)
            } else if let Some(category) = text(&fields.name)
                .as_deref()
                .and_then(|name| filter.infer_category(name))
            {
                (category.to_string(), CategorySource::Inferred)
            } else {
                (UNCLASSIFIED_CATEGORY.to_string(), CategorySource::Unclassified)
            };
            *counts.entry(key).or_default() += 1;
        }
    }
    let mut categories: Vec<CategoryCount> = counts
        .into_iter()
        .map(|((category, source), count)| CategoryCount {
            non_site: source == CategorySource::Attribute && filter.non_site_category(&category).is_some(),
            category,
            source,
            count,
        })
        .collect();
    categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    let matched = categories
        .iter()
        .filter(|c| c.source != CategorySource::Unclassified)
        .map(|c| c.count)
        .sum();
    ctx.count(
        categories.len(),
        format!("scan found {} categories ({matched}/{total} features matched)", categories.len()),
    );
    ScanReport {
        total,
        matched,
        categories,
    }
}

#[cfg(test)]
mod tests {
    use archmap_model::{Crs, Feature};
    use archmap_standards::rules::parse_rules;
    use geo::Point;

    use super::*;

    fn standards() -> Standards {
        let rules = parse_rules(
            "[[rule]]\npattern = \"사지$\"\ntype = \"사지\"\nera = \"통일신라\"\n",
            std::path::Path::new("r.toml"),
        )
        .unwrap();
        Standards {
            rules: Some(rules),
            ..Standards::default()
        }
    }

    fn site(name: &str) -> HeritageSite {
        let source = Layer::new("l", "l", Crs::default());
        HeritageSite::new(name, Point::new(0.0, 0.0).into(), &source)
    }

    #[test]
    fn designated_sites_survive_the_filter() {
        let standards = standards();
        let mut vip = site("근대 건물");
        vip.era = Some("근대".to_string());
        vip.designated = true;
        let mut plain = site("공장");
        plain.era = Some("근대".to_string());
        let options = SmartFilterOptions {
            exclude_non_sites: true,
            exclude_modern: true,
        };
        let mut sites = vec![vip, plain];
        let report = SmartClassifier::new(&standards, options).classify(&mut sites, &mut RunContext::new());
        assert_eq!(report.preserved, 1);
        assert_eq!(
            report.candidates,
            vec![ExclusionCandidate {
                name: "공장".to_string(),
                source_layer: "l".to_string(),
                reason: CandidateReason::ModernEra {
                    era: "근대".to_string()
                },
            }]
        );
    }

    #[test]
    fn scan_counts_by_source() {
        let layer = Layer::new("s", "지표조사", Crs::default()).with_features(vec![
            Feature::new(1, None).with_attribute("유적명", "A사지").with_attribute("구분", "신도비"),
            Feature::new(2, None).with_attribute("유적명", "B사지"),
            Feature::new(3, None).with_attribute("유적명", "무명"),
        ]);
        let report = scan_categories(&[layer], &Standards::default(), &mut RunContext::new());
        assert_eq!(report.total, 3);
        assert_eq!(report.matched, 2);
        let stele = report.categories.iter().find(|c| c.category == "신도비").unwrap();
        assert!(stele.non_site);
        let inferred = report.categories.iter().find(|c| c.category == "사지").unwrap();
        assert_eq!(inferred.source, CategorySource::Inferred);
    }
}
