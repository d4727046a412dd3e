//! In-range test against the retained area. Out-of-range sites are hidden,
//! never removed.

use std::collections::HashSet;

use archmap_geometry::measure;
use archmap_model::{BufferSet, ExclusionReason, Extent, HeritageSite, normalize_name};
use geo::Geometry;
use serde::Serialize;

use crate::context::RunContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RangeReport {
    pub total: usize,
    /// In range at the initial scan.
    pub in_range: usize,
    pub out_of_range: usize,
    pub manually_excluded: usize,
    /// Left for numbering after every exclusion.
    pub included: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeFilter {
    pub exclude_outside_buffer: bool,
}

impl RangeFilter {
    pub fn new(exclude_outside_buffer: bool) -> Self {
        Self {
            exclude_outside_buffer,
        }
    }

    /// The outer buffer when buffers exist and the flag is set, the extent otherwise.
    pub fn retained_area(&self, extent: &Extent, buffers: &BufferSet) -> Geometry<f64> {
        match buffers.outer() {
            Some(outer) if self.exclude_outside_buffer => outer.geometry.clone().into(),
            _ => extent.polygon().into(),
        }
    }

    /// Marks sites outside `retained` and the named manual exclusions.
    ///
    /// Earlier exclusions are cleared first so the filter can be re-run.
    pub fn apply(
        &self,
        sites: &mut [HeritageSite],
        retained: &Geometry<f64>,
        manual_exclusions: &[String],
        ctx: &mut RunContext,
    ) -> RangeReport {
        let manual: HashSet<String> = manual_exclusions
            .iter()
            .map(|name| normalize_name(name))
            .filter(|name| !name.is_empty())
            .collect();
        let mut report = RangeReport {
            total: sites.len(),
            ..RangeReport::default()
        };
        for site in sites.iter_mut() {
            site.restore();
            if !measure::intersects(&site.geometry, retained) {
                site.exclude(ExclusionReason::OutOfRange);
                report.out_of_range += 1;
            }
        }
        report.in_range = report.total - report.out_of_range;
        ctx.count(
            report.in_range,
            format!("{} of {} sites in range", report.in_range, report.total),
        );

        for site in sites.iter_mut().filter(|site| !site.excluded) {
            if manual.contains(&site.key()) {
                site.exclude(ExclusionReason::Manual);
                report.manually_excluded += 1;
            }
        }
        report.included = report.in_range - report.manually_excluded;
        ctx.count(
            report.included,
            format!(
                "{} sites retained after exclusion ({} out of range, {} manual)",
                report.included, report.out_of_range, report.manually_excluded
            ),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use archmap_model::{Crs, Layer};
    use geo::{Coord, Point};

    use super::*;

    fn extent() -> Extent {
        Extent {
            center: Coord { x: 0.0, y: 0.0 },
            width_mm: 160.0,
            height_mm: 240.0,
            scale: 5000,
            crs: Crs::default(),
        }
    }

    #[test]
    fn out_of_range_sites_are_hidden_not_removed() {
        let source = Layer::new("l", "l", Crs::default());
        let mut sites = vec![
            HeritageSite::new("inside", Point::new(100.0, 100.0).into(), &source),
            HeritageSite::new("outside", Point::new(5000.0, 0.0).into(), &source),
            HeritageSite::new("manual", Point::new(-100.0, 0.0).into(), &source),
        ];
        let filter = RangeFilter::new(false);
        let retained = filter.retained_area(&extent(), &BufferSet::default());
        let mut ctx = RunContext::new();
        let report = filter.apply(&mut sites, &retained, &["manual".to_string()], &mut ctx);

        assert_eq!(sites.len(), 3);
        assert_eq!(
            report,
            RangeReport {
                total: 3,
                in_range: 2,
                out_of_range: 1,
                manually_excluded: 1,
                included: 1,
            }
        );
        assert_eq!(sites[1].exclusion, Some(ExclusionReason::OutOfRange));
        assert_eq!(sites[2].exclusion, Some(ExclusionReason::Manual));
    }

    #[test]
    fn rerun_restores_previous_exclusions() {
        let source = Layer::new("l", "l", Crs::default());
        let mut sites = vec![HeritageSite::new("a", Point::new(0.0, 0.0).into(), &source)];
        sites[0].exclude(ExclusionReason::Manual);
        let filter = RangeFilter::new(false);
        let retained = filter.retained_area(&extent(), &BufferSet::default());
        filter.apply(&mut sites, &retained, &[], &mut RunContext::new());
        assert!(!sites[0].excluded);
    }
}
