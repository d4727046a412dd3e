//! Sequence numbering of retained sites.

use std::cmp::Ordering;

use archmap_geometry::measure;
use archmap_model::{
    DataWarning, HeritageLayer, HeritageSite, Layer, NumberingPolicy, PipelineError, Result,
    TierNumbering,
};
use geo::Geometry;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::context::RunContext;

/// Buffer tier of a site at `distance` from the study area.
///
/// Tier `k` covers `thresholds[k-1] <= d < thresholds[k]` with an implicit
/// leading threshold of zero; sites beyond the outer threshold get
/// `thresholds.len()`. `thresholds` must be ascending.
pub fn tier_for(distance: f64, thresholds: &[f64]) -> usize {
    thresholds
        .iter()
        .take_while(|threshold| **threshold <= distance)
        .count()
}

/// Sort key for Korean names: digits, then Latin letters (case-folded), then
/// Hangul syllables in dictionary order, then everything else. Whitespace is
/// ignored.
pub fn collation_key(name: &str) -> Vec<(u8, char)> {
    name.nfc()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .map(|ch| {
            let class = match ch {
                '0'..='9' => 0,
                'a'..='z' => 1,
                '\u{AC00}'..='\u{D7A3}' => 2,
                _ => 3,
            };
            (class, ch)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NumberingReport {
    pub numbered: usize,
    pub tiering_applied: bool,
    /// Numbered sites per tier, when tiering applied.
    pub per_tier: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingEngine {
    pub policy: NumberingPolicy,
    pub tier_numbering: TierNumbering,
    /// Group by buffer tier when the policy allows it.
    pub buffer_tiers: bool,
}

impl NumberingEngine {
    pub fn new(policy: NumberingPolicy) -> Self {
        Self {
            policy,
            tier_numbering: TierNumbering::default(),
            buffer_tiers: true,
        }
    }

    pub fn with_tier_numbering(mut self, tier_numbering: TierNumbering) -> Self {
        self.tier_numbering = tier_numbering;
        self
    }

    pub fn with_buffer_tiers(mut self, buffer_tiers: bool) -> Self {
        self.buffer_tiers = buffer_tiers;
        self
    }

    /// Assigns 1-based contiguous numbers to the non-excluded sites.
    ///
    /// Distances to `study_area` are recorded on every site when it is given;
    /// otherwise stored distances are kept.
    /// `thresholds` are the ascending buffer distances.
    pub fn number(
        &self,
        sites: &mut [HeritageSite],
        study_area: Option<&Geometry<f64>>,
        thresholds: &[f64],
        ctx: &mut RunContext,
    ) -> Result<NumberingReport> {
        if self.policy == NumberingPolicy::DistanceFromStudyArea && study_area.is_none() {
            return Err(PipelineError::Configuration(
                "distance numbering requires a study area".to_string(),
            ));
        }
        for site in sites.iter_mut() {
            site.sequence_number = None;
            site.tier_index = None;
            if let Some(area) = study_area {
                site.distance_to_study_area = Some(measure::distance(&site.geometry, area))
                    .filter(|distance| distance.is_finite());
            }
        }

        let tiering = self.buffer_tiers && !thresholds.is_empty();
        let tiering = if tiering && self.policy != NumberingPolicy::DistanceFromStudyArea {
            ctx.notice("buffer tiers apply only to distance numbering; tiering skipped");
            false
        } else {
            tiering
        };

        let mut order: Vec<usize> = (0..sites.len()).filter(|&i| !sites[i].excluded).collect();
        self.sort(&mut order, sites);

        let mut report = NumberingReport {
            numbered: order.len(),
            tiering_applied: tiering,
            per_tier: if tiering {
                vec![0; thresholds.len() + 1]
            } else {
                Vec::new()
            },
        };
        let mut next = 1u32;
        let mut current_tier = None;
        for &index in &order {
            let site = &mut sites[index];
            if tiering {
                let distance = site.distance_to_study_area.unwrap_or(f64::INFINITY);
                let tier = tier_for(distance, thresholds);
                if self.tier_numbering == TierNumbering::RestartPerTier
                    && current_tier.is_some_and(|current| current != tier)
                {
                    next = 1;
                }
                current_tier = Some(tier);
                site.tier_index = Some(tier);
                report.per_tier[tier] += 1;
            }
            site.sequence_number = Some(next);
            next += 1;
        }
        ctx.count(
            report.numbered,
            format!("{} sites numbered ({})", report.numbered, policy_label(self.policy)),
        );
        Ok(report)
    }

    /// Re-numbers a previously produced result layer.
    pub fn refresh(
        &self,
        layer: &Layer,
        study_area: Option<&Geometry<f64>>,
        thresholds: &[f64],
        ctx: &mut RunContext,
    ) -> Result<(HeritageLayer, NumberingReport)> {
        let mut heritage = HeritageLayer::from_layer(layer)?;
        if !heritage.unreadable.is_empty() {
            ctx.warn(DataWarning::UnreadableRows {
                layer: layer.name.clone(),
                count: heritage.unreadable.len(),
            });
        }
        let report = self.number(&mut heritage.sites, study_area, thresholds, ctx)?;
        Ok((heritage, report))
    }

    fn sort(&self, order: &mut [usize], sites: &[HeritageSite]) {
        match self.policy {
            NumberingPolicy::TopToBottom => {
                let centroids: Vec<_> = sites
                    .iter()
                    .map(|site| measure::centroid(&site.geometry))
                    .collect();
                order.sort_by(|&a, &b| match (centroids[a], centroids[b]) {
                    (Some(a), Some(b)) => b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                });
            }
            NumberingPolicy::DistanceFromStudyArea => {
                let keys: Vec<_> = sites.iter().map(|site| collation_key(&site.name)).collect();
                order.sort_by(|&a, &b| {
                    let da = sites[a].distance_to_study_area.unwrap_or(f64::INFINITY);
                    let db = sites[b].distance_to_study_area.unwrap_or(f64::INFINITY);
                    da.total_cmp(&db).then_with(|| keys[a].cmp(&keys[b]))
                });
            }
            NumberingPolicy::Alphabetical => {
                let keys: Vec<_> = sites.iter().map(|site| collation_key(&site.name)).collect();
                // Stable: equal names keep insertion order.
                order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
            }
        }
    }
}

fn policy_label(policy: NumberingPolicy) -> &'static str {
    match policy {
        NumberingPolicy::TopToBottom => "top to bottom",
        NumberingPolicy::DistanceFromStudyArea => "distance from study area",
        NumberingPolicy::Alphabetical => "alphabetical",
    }
}

#[cfg(test)]
mod tests {
    use archmap_model::{Crs, ExclusionReason};
    use geo::Point;

    use super::*;

    fn sites(points: &[(&str, f64, f64)]) -> Vec<HeritageSite> {
        let source = Layer::new("l", "l", Crs::default());
        points
            .iter()
            .map(|(name, x, y)| HeritageSite::new(*name, Point::new(*x, *y).into(), &source))
            .collect()
    }

    fn numbers(sites: &[HeritageSite]) -> Vec<Option<u32>> {
        sites.iter().map(|site| site.sequence_number).collect()
    }

    #[test]
    fn tiers_follow_thresholds() {
        let thresholds = [500.0, 1000.0];
        assert_eq!(tier_for(0.0, &thresholds), 0);
        assert_eq!(tier_for(499.9, &thresholds), 0);
        assert_eq!(tier_for(500.0, &thresholds), 1);
        assert_eq!(tier_for(800.0, &thresholds), 1);
        assert_eq!(tier_for(1000.0, &thresholds), 2);
        assert_eq!(tier_for(1500.0, &thresholds), 2);
    }

    #[test]
    fn top_to_bottom_breaks_ties_by_easting() {
        let mut s = sites(&[("a", 5.0, 0.0), ("b", 0.0, 10.0), ("c", 1.0, 0.0)]);
        NumberingEngine::new(NumberingPolicy::TopToBottom)
            .number(&mut s, None, &[], &mut RunContext::new())
            .unwrap();
        assert_eq!(numbers(&s), vec![Some(3), Some(1), Some(2)]);
    }

    #[test]
    fn hangul_collation_orders_syllables() {
        let mut s = sites(&[("다 유적", 0.0, 0.0), ("가 유적", 0.0, 0.0), ("A유적", 0.0, 0.0), ("나", 0.0, 0.0)]);
        NumberingEngine::new(NumberingPolicy::Alphabetical)
            .number(&mut s, None, &[], &mut RunContext::new())
            .unwrap();
        assert_eq!(numbers(&s), vec![Some(4), Some(2), Some(1), Some(3)]);
    }

    #[test]
    fn alphabetical_ties_keep_insertion_order() {
        let mut s = sites(&[("같음", 0.0, 0.0), ("같음", 9.0, 9.0)]);
        NumberingEngine::new(NumberingPolicy::Alphabetical)
            .number(&mut s, None, &[], &mut RunContext::new())
            .unwrap();
        assert_eq!(numbers(&s), vec![Some(1), Some(2)]);
    }

    #[test]
    fn excluded_sites_consume_no_number() {
        let mut s = sites(&[("a", 0.0, 3.0), ("b", 0.0, 2.0), ("c", 0.0, 1.0)]);
        s[1].exclude(ExclusionReason::OutOfRange);
        NumberingEngine::new(NumberingPolicy::TopToBottom)
            .number(&mut s, None, &[], &mut RunContext::new())
            .unwrap();
        assert_eq!(numbers(&s), vec![Some(1), None, Some(2)]);
    }

    #[test]
    fn stored_distances_survive_numbering_without_study_area() {
        let mut s = sites(&[("a", 0.0, 1.0), ("b", 0.0, 2.0)]);
        s[0].distance_to_study_area = Some(120.5);
        NumberingEngine::new(NumberingPolicy::TopToBottom)
            .number(&mut s, None, &[], &mut RunContext::new())
            .unwrap();
        assert_eq!(s[0].distance_to_study_area, Some(120.5));
        assert_eq!(s[1].distance_to_study_area, None);
        assert_eq!(numbers(&s), vec![Some(2), Some(1)]);
    }

    #[test]
    fn distance_without_study_area_is_configuration_error() {
        let mut s = sites(&[("a", 0.0, 0.0)]);
        let err = NumberingEngine::new(NumberingPolicy::DistanceFromStudyArea)
            .number(&mut s, None, &[], &mut RunContext::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn tiers_skipped_outside_distance_order() {
        let mut s = sites(&[("a", 0.0, 0.0)]);
        let mut ctx = RunContext::new();
        let report = NumberingEngine::new(NumberingPolicy::Alphabetical)
            .number(&mut s, None, &[500.0], &mut ctx)
            .unwrap();
        assert!(!report.tiering_applied);
        assert_eq!(s[0].tier_index, None);
        assert!(ctx.render_log().contains("tiering skipped"));
    }

    #[test]
    fn restart_per_tier_resets_counter() {
        let area: Geometry<f64> = Point::new(0.0, 0.0).into();
        let mut s = sites(&[("a", 100.0, 0.0), ("b", 600.0, 0.0), ("c", 700.0, 0.0), ("d", 200.0, 0.0)]);
        let report = NumberingEngine::new(NumberingPolicy::DistanceFromStudyArea)
            .with_tier_numbering(TierNumbering::RestartPerTier)
            .number(&mut s, Some(&area), &[500.0, 1000.0], &mut RunContext::new())
            .unwrap();
        assert_eq!(numbers(&s), vec![Some(1), Some(1), Some(2), Some(2)]);
        assert_eq!(report.per_tier, vec![2, 2, 0]);
    }
}
