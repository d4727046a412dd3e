use archmap_core::{NumberingEngine, RangeFilter, RunContext, tier_for};
use archmap_model::{
    BufferSet, Crs, Extent, ExclusionReason, HeritageSite, Layer, NumberingPolicy, TierNumbering,
};
use geo::{Coord, Geometry, Point, polygon};
use proptest::prelude::*;

fn study_area() -> Geometry<f64> {
    polygon![(x: -10.0, y: -10.0), (x: 10.0, y: -10.0), (x: 10.0, y: 10.0), (x: -10.0, y: 10.0)]
        .into()
}

fn sites_from(points: &[(f64, f64, bool)]) -> Vec<HeritageSite> {
    let source = Layer::new("src", "src", Crs::epsg(5186));
    points
        .iter()
        .enumerate()
        .map(|(index, &(x, y, excluded))| {
            let mut site = HeritageSite::new(format!("유적{index}"), Point::new(x, y).into(), &source);
            if excluded {
                site.exclude(ExclusionReason::Manual);
            }
            site
        })
        .collect()
}

fn policy() -> impl Strategy<Value = NumberingPolicy> {
    prop_oneof![
        Just(NumberingPolicy::TopToBottom),
        Just(NumberingPolicy::DistanceFromStudyArea),
        Just(NumberingPolicy::Alphabetical),
    ]
}

fn site_points() -> impl Strategy<Value = Vec<(f64, f64, bool)>> {
    prop::collection::vec((-3000.0..3000.0f64, -3000.0..3000.0f64, any::<bool>()), 0..40)
}

proptest! {
    #[test]
    fn continuous_numbers_are_contiguous(points in site_points(), policy in policy()) {
        let mut sites = sites_from(&points);
        let engine = NumberingEngine::new(policy);
        let report = engine
            .number(&mut sites, Some(&study_area()), &[500.0, 1000.0], &mut RunContext::new())
            .unwrap();

        let mut numbers: Vec<u32> = sites.iter().filter_map(|s| s.sequence_number).collect();
        numbers.sort_unstable();
        let included = sites.iter().filter(|s| !s.excluded).count();
        prop_assert_eq!(report.numbered, included);
        prop_assert_eq!(numbers, (1..=included as u32).collect::<Vec<_>>());
        prop_assert!(sites.iter().filter(|s| s.excluded).all(|s| s.sequence_number.is_none()));
    }

    #[test]
    fn restart_per_tier_is_contiguous_within_each_tier(points in site_points()) {
        let mut sites = sites_from(&points);
        let thresholds = [500.0, 1000.0];
        NumberingEngine::new(NumberingPolicy::DistanceFromStudyArea)
            .with_tier_numbering(TierNumbering::RestartPerTier)
            .number(&mut sites, Some(&study_area()), &thresholds, &mut RunContext::new())
            .unwrap();

        for tier in 0..=thresholds.len() {
            let mut numbers: Vec<u32> = sites
                .iter()
                .filter(|s| s.tier_index == Some(tier))
                .filter_map(|s| s.sequence_number)
                .collect();
            numbers.sort_unstable();
            let expected: Vec<u32> = (1..=numbers.len() as u32).collect();
            prop_assert_eq!(numbers, expected);
        }
    }

    #[test]
    fn tier_matches_threshold_bracket(distance in 0.0..5000.0f64) {
        let thresholds = [500.0, 1000.0, 2000.0];
        let tier = tier_for(distance, &thresholds);
        let lower = if tier == 0 { 0.0 } else { thresholds[tier - 1] };
        prop_assert!(lower <= distance);
        if let Some(upper) = thresholds.get(tier) {
            prop_assert!(distance < *upper);
        }
    }

    #[test]
    fn distance_order_is_non_decreasing(points in site_points()) {
        let mut sites = sites_from(&points);
        NumberingEngine::new(NumberingPolicy::DistanceFromStudyArea)
            .number(&mut sites, Some(&study_area()), &[], &mut RunContext::new())
            .unwrap();
        let mut numbered: Vec<(u32, f64)> = sites
            .iter()
            .filter_map(|s| Some((s.sequence_number?, s.distance_to_study_area?)))
            .collect();
        numbered.sort_by_key(|(number, _)| *number);
        prop_assert!(numbered.windows(2).all(|pair| pair[0].1 <= pair[1].1));
    }

    #[test]
    fn range_filter_never_drops_sites(points in site_points()) {
        let mut sites = sites_from(&points);
        let count = sites.len();
        let extent = Extent {
            center: Coord { x: 0.0, y: 0.0 },
            width_mm: 160.0,
            height_mm: 240.0,
            scale: 5000,
            crs: Crs::epsg(5186),
        };
        let filter = RangeFilter::new(false);
        let retained = filter.retained_area(&extent, &BufferSet::default());
        let report = filter.apply(&mut sites, &retained, &[], &mut RunContext::new());
        prop_assert_eq!(sites.len(), count);
        prop_assert_eq!(report.total, count);
        prop_assert_eq!(report.in_range + report.out_of_range, count);
    }
}
