use archmap_core::{DissolveMerger, RunContext, dissolve_sites};
use archmap_model::{Crs, HeritageSite, Layer};
use geo::{Area, Geometry, Point, polygon};

fn sources() -> (Layer, Layer) {
    (
        Layer::new("a", "국가지정", Crs::epsg(5186)),
        Layer::new("b", "지표조사", Crs::epsg(5186)),
    )
}

fn temple_parts() -> Vec<HeritageSite> {
    let (designated, survey) = sources();
    let hall = polygon![(x: 0.0, y: 0.0), (x: 30.0, y: 0.0), (x: 30.0, y: 20.0), (x: 0.0, y: 20.0)];
    let pagoda = polygon![(x: 20.0, y: 0.0), (x: 50.0, y: 0.0), (x: 50.0, y: 20.0), (x: 20.0, y: 20.0)];
    let mut first = HeritageSite::new("A사지", hall.into(), &designated);
    first.designated = true;
    first.address = Some("경주시 배반동".to_string());
    vec![
        first,
        HeritageSite::new("B고분군", Point::new(500.0, 500.0).into(), &survey),
        HeritageSite::new(" A사지", pagoda.into(), &survey),
    ]
}

#[test]
fn same_name_polygons_across_layers_become_one_site() {
    let merged = dissolve_sites(&temple_parts()).unwrap();
    assert_eq!(merged.len(), 2);

    let temple = &merged[0];
    assert_eq!(temple.name, "A사지");
    assert!(temple.designated, "first member's attributes are kept");
    assert_eq!(temple.address.as_deref(), Some("경주시 배반동"));
    assert!(matches!(temple.geometry, Geometry::Polygon(_)), "overlapping parts union into one polygon");
    assert!((temple.geometry.unsigned_area() - 1000.0).abs() < 1e-6);
    assert_eq!(merged[1].name, "B고분군");
}

#[test]
fn dissolving_twice_changes_nothing() {
    let once = dissolve_sites(&temple_parts()).unwrap();
    let twice = dissolve_sites(&once).unwrap();
    assert_eq!(once.len(), twice.len());
    for (a, b) in once.iter().zip(&twice) {
        assert_eq!(a.name, b.name);
        assert!((a.geometry.unsigned_area() - b.geometry.unsigned_area()).abs() < 1e-6);
    }
}

#[test]
fn merger_reports_counts() {
    let mut ctx = RunContext::new();
    let (sites, report) = DissolveMerger.apply(temple_parts(), &mut ctx);
    assert_eq!((report.before, report.after, report.fell_back), (3, 2, false));
    assert_eq!(sites.len(), 2);
    assert!(ctx.warnings().is_empty());
}
