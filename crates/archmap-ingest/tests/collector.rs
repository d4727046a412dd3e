use std::fs;
use std::path::{Path, PathBuf};

use archmap_ingest::{HeritageCollector, detect_corruption, read_layer};
use archmap_model::{Crs, DataWarning, Feature, HostError, Layer, LayerHost, LayerId};
use encoding_rs::{EUC_KR, Encoding, UTF_8};
use geo::{Point, polygon};

/// Host that re-reads layer files from disk.
struct DiskHost;

impl LayerHost for DiskHost {
    fn reload_with_encoding(
        &mut self,
        layer: &Layer,
        encoding: &'static Encoding,
    ) -> Result<Layer, HostError> {
        let source = layer
            .source
            .as_ref()
            .ok_or_else(|| HostError::NoSource(layer.id.clone()))?;
        read_layer(&source.path, encoding).map_err(|error| HostError::Reload {
            layer: layer.id.clone(),
            reason: error.to_string(),
        })
    }

    fn move_layer_to_group(&mut self, _layer: &LayerId, _group: &str) -> Result<(), HostError> {
        Ok(())
    }
}

/// Host whose reload always loses features.
struct LossyHost;

impl LayerHost for LossyHost {
    fn reload_with_encoding(
        &mut self,
        layer: &Layer,
        _encoding: &'static Encoding,
    ) -> Result<Layer, HostError> {
        let mut reloaded = layer.clone();
        reloaded.features.truncate(1);
        Ok(reloaded)
    }

    fn move_layer_to_group(&mut self, _layer: &LayerId, _group: &str) -> Result<(), HostError> {
        Ok(())
    }
}

fn write_cp949_layer(dir: &Path) -> PathBuf {
    let text = r#"{
        "type": "FeatureCollection",
        "name": "sites",
        "crs": { "type": "name", "properties": { "name": "EPSG:5186" } },
        "features": [
            { "type": "Feature", "properties": { "유적명": "황룡사지" },
              "geometry": { "type": "Point", "coordinates": [200100.0, 550200.0] } },
            { "type": "Feature", "properties": { "유적명": "분황사지" },
              "geometry": { "type": "Point", "coordinates": [200300.0, 550400.0] } }
        ]
    }"#;
    let (bytes, _, unmappable) = EUC_KR.encode(text);
    assert!(!unmappable);
    let path = dir.join("sites.geojson");
    fs::write(&path, bytes.as_ref()).unwrap();
    path
}

#[test]
fn cp949_file_read_as_utf8_is_repaired_by_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cp949_layer(dir.path());

    let broken = read_layer(&path, UTF_8).unwrap();
    assert!(detect_corruption(&broken).is_corrupted());

    let collection =
        HeritageCollector::new(Crs::epsg(5186)).collect(vec![broken], &mut DiskHost);
    assert!(collection.warnings.is_empty(), "{:?}", collection.warnings);
    assert!(collection.layers[0].encoding_repaired);
    let names: Vec<_> = collection.sites.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["황룡사지", "분황사지"]);
}

#[test]
fn reload_with_fewer_features_keeps_original_and_warns() {
    let features = (1..=3)
        .map(|id| {
            Feature::new(id, Some(Point::new(id as f64, 0.0).into()))
                .with_attribute("NAME", format!("site \u{FFFD}{id}"))
        })
        .collect();
    let layer = Layer::new("broken", "broken", Crs::epsg(5186)).with_features(features);

    let collection = HeritageCollector::new(Crs::epsg(5186)).collect(vec![layer], &mut LossyHost);
    assert_eq!(collection.count(), 3);
    assert!(matches!(
        collection.warnings.as_slice(),
        [DataWarning::EncodingRepairFailed {
            original: 3,
            reloaded: Some(1),
            ..
        }]
    ));
}

#[test]
fn layer_without_name_field_is_excluded_and_reported() {
    let layer = Layer::new("codes", "codes", Crs::epsg(5186)).with_features(vec![
        Feature::new(1, Some(Point::new(0.0, 0.0).into())).with_attribute("CODE", "X1"),
    ]);
    let collection = HeritageCollector::new(Crs::epsg(5186)).collect(vec![layer], &mut DiskHost);
    assert_eq!(collection.count(), 0);
    assert!(matches!(
        collection.warnings.as_slice(),
        [DataWarning::MissingNameField { layer, .. }] if layer == "codes"
    ));
}

#[test]
fn unnamed_and_geometryless_features_are_counted() {
    let square = polygon![(x: 0.0, y: 0.0), (x: 20.0, y: 0.0), (x: 20.0, y: 10.0), (x: 0.0, y: 10.0)];
    let layer = Layer::new("mixed", "국가지정문화유산", Crs::epsg(5186)).with_features(vec![
        Feature::new(1, Some(square.into())).with_attribute("명칭", "A사지"),
        Feature::new(2, Some(Point::new(5.0, 5.0).into())).with_attribute("명칭", ""),
        Feature::new(3, None).with_attribute("명칭", "C사지"),
    ]);
    let collection = HeritageCollector::new(Crs::epsg(5186)).collect(vec![layer], &mut DiskHost);
    assert_eq!(collection.count(), 1);
    let site = &collection.sites[0];
    assert!(site.designated);
    assert_eq!(site.area_m2, Some(200.0));
    let report = &collection.layers[0];
    assert_eq!((report.unnamed, report.without_geometry), (1, 1));
    assert_eq!(collection.warnings.len(), 2);
}

#[test]
fn layers_in_other_crs_are_reprojected() {
    let layer = Layer::new("wgs", "wgs", Crs::wgs84()).with_features(vec![
        Feature::new(1, Some(Point::new(127.0, 38.0).into())).with_attribute("유적명", "기준점"),
    ]);
    let collection = HeritageCollector::new(Crs::epsg(5186)).collect(vec![layer], &mut DiskHost);
    let geo::Geometry::Point(point) = &collection.sites[0].geometry else {
        panic!("expected point");
    };
    assert!((point.x() - 200_000.0).abs() < 1e-6);
}
