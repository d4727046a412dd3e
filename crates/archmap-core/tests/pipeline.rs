use archmap_core::{CancelToken, MapInputs, MapPipeline, RunContext, RunOutcome};
use archmap_model::{
    Crs, DataWarning, Feature, HostError, Layer, LayerHost, LayerId, NumberingPolicy,
    PipelineError, ResultGroup, RunSettings, Stage, fields,
};
use archmap_standards::Standards;
use encoding_rs::Encoding;
use geo::{LineString, Point, polygon};

#[derive(Default)]
struct RecordingHost {
    moved: Vec<(LayerId, String)>,
    refuse_moves: bool,
}

impl LayerHost for RecordingHost {
    fn reload_with_encoding(
        &mut self,
        layer: &Layer,
        _encoding: &'static Encoding,
    ) -> Result<Layer, HostError> {
        Err(HostError::NoSource(layer.id.clone()))
    }

    fn move_layer_to_group(&mut self, layer: &LayerId, group: &str) -> Result<(), HostError> {
        if self.refuse_moves {
            return Err(HostError::Relocation {
                layer: layer.clone(),
                group: group.to_string(),
                reason: "group is locked".to_string(),
            });
        }
        self.moved.push((layer.clone(), group.to_string()));
        Ok(())
    }
}

fn crs() -> Crs {
    Crs::epsg(5186)
}

fn study_area() -> Layer {
    let square = polygon![(x: -50.0, y: -50.0), (x: 50.0, y: -50.0), (x: 50.0, y: 50.0), (x: -50.0, y: 50.0)];
    Layer::new("study", "조사구역", crs()).with_features(vec![Feature::new(1, Some(square.into()))])
}

fn heritage() -> Layer {
    let site = |id: u64, name: &str, x: f64| {
        Feature::new(id, Some(Point::new(x, 0.0).into())).with_attribute("유적명", name)
    };
    Layer::new("survey", "지표조사", crs()).with_features(vec![
        site(1, "중심 유적", 0.0),
        site(2, "동쪽 유적", 850.0),
        site(3, "먼 유적", 1550.0),
    ])
}

fn inputs() -> MapInputs {
    MapInputs {
        study_area: Some(study_area()),
        heritage: vec![heritage()],
        ..MapInputs::default()
    }
}

fn tiered_settings() -> RunSettings {
    RunSettings {
        buffers: vec![1000.0, 500.0],
        numbering: NumberingPolicy::DistanceFromStudyArea,
        exclude_outside_buffer: true,
        ..RunSettings::default()
    }
}

fn completed(outcome: RunOutcome) -> Box<archmap_core::MapProducts> {
    match outcome {
        RunOutcome::Completed(products) => products,
        RunOutcome::Cancelled { after } => panic!("cancelled after {after}"),
    }
}

#[test]
fn outer_buffer_excludes_far_site_and_tiers_the_rest() {
    let pipeline = MapPipeline::new(tiered_settings(), Standards::default());
    let mut host = RecordingHost::default();
    let mut ctx = RunContext::new();
    let products = completed(pipeline.run(inputs(), &mut host, &mut ctx).unwrap());

    let sites = &products.heritage.sites;
    assert_eq!(sites.len(), 3, "hidden sites stay in the layer");
    let by_name = |name: &str| sites.iter().find(|s| s.name == name).unwrap();

    let far = by_name("먼 유적");
    assert!(far.excluded);
    assert_eq!(far.sequence_number, None);

    let east = by_name("동쪽 유적");
    assert_eq!(east.tier_index, Some(1));
    assert_eq!(east.sequence_number, Some(2));
    assert!((east.distance_to_study_area.unwrap() - 800.0).abs() < 1e-9);

    let center = by_name("중심 유적");
    assert_eq!((center.tier_index, center.sequence_number), (Some(0), Some(1)));

    assert_eq!(products.summary.range.out_of_range, 1);
    assert_eq!(products.buffers.thresholds(), vec![500.0, 1000.0]);
}

#[test]
fn extent_matches_paper_and_scale() {
    let pipeline = MapPipeline::new(RunSettings::default(), Standards::default());
    let products = completed(
        pipeline
            .run(inputs(), &mut RecordingHost::default(), &mut RunContext::new())
            .unwrap(),
    );
    assert_eq!(products.extent.width_map_units(), 800.0);
    assert_eq!(products.extent.height_map_units(), 1200.0);
    assert_eq!((products.extent.center.x, products.extent.center.y), (0.0, 0.0));
    // Without buffers the extent is the retained area.
    let far = products.heritage.sites.iter().find(|s| s.name == "먼 유적").unwrap();
    assert!(far.excluded);
    let east = products.heritage.sites.iter().find(|s| s.name == "동쪽 유적").unwrap();
    assert!(east.excluded);
}

#[test]
fn result_layers_follow_group_order() {
    let pipeline = MapPipeline::new(tiered_settings(), Standards::default());
    let mut run_inputs = inputs();
    run_inputs.topo = vec![Layer::new("topo", "도엽", crs()).with_features(vec![Feature::new(
        1,
        Some(LineString::from(vec![(0.0, 0.0), (10.0, 10.0)]).into()),
    )])];
    let products = completed(
        pipeline
            .run(run_inputs, &mut RecordingHost::default(), &mut RunContext::new())
            .unwrap(),
    );
    let groups: Vec<ResultGroup> = products.result_layers().iter().map(|(g, _)| *g).collect();
    assert_eq!(
        groups,
        vec![
            ResultGroup::StudyArea,
            ResultGroup::Heritage,
            ResultGroup::Extent,
            ResultGroup::Buffers,
            ResultGroup::Buffers,
            ResultGroup::Topo,
        ]
    );
    let heritage = &products.result_layers()[1].1;
    assert!(heritage.has_field(fields::SEQUENCE));
    assert_eq!(heritage.feature_count(), 3);
}

#[test]
fn originals_relocate_and_failures_are_warnings() {
    let pipeline = MapPipeline::new(RunSettings::default(), Standards::default());
    let mut host = RecordingHost::default();
    completed(pipeline.run(inputs(), &mut host, &mut RunContext::new()).unwrap());
    assert_eq!(host.moved.len(), 2);
    assert!(host.moved.iter().all(|(_, group)| group == "99_Source_Data"));

    let mut refusing = RecordingHost {
        refuse_moves: true,
        ..RecordingHost::default()
    };
    let mut ctx = RunContext::new();
    completed(pipeline.run(inputs(), &mut refusing, &mut ctx).unwrap());
    let relocation_warnings = ctx
        .warnings()
        .iter()
        .filter(|w| matches!(w, DataWarning::RelocationFailed { .. }))
        .count();
    assert_eq!(relocation_warnings, 2);
}

#[test]
fn missing_study_area_is_a_precondition_failure() {
    let pipeline = MapPipeline::new(RunSettings::default(), Standards::default());
    let mut host = RecordingHost::default();
    let err = pipeline
        .run(
            MapInputs {
                heritage: vec![heritage()],
                ..MapInputs::default()
            },
            &mut host,
            &mut RunContext::new(),
        )
        .unwrap_err();
    assert_eq!(err.stage, Stage::Setup);
    assert!(matches!(err.source, PipelineError::Precondition(_)));
    assert!(host.moved.is_empty());
}

#[test]
fn invalid_buffer_distance_fails_before_collection() {
    let settings = RunSettings {
        buffers: vec![-5.0],
        ..RunSettings::default()
    };
    let err = MapPipeline::new(settings, Standards::default())
        .run(inputs(), &mut RecordingHost::default(), &mut RunContext::new())
        .unwrap_err();
    assert_eq!(err.stage, Stage::Setup);
    assert!(matches!(err.source, PipelineError::Configuration(_)));
}

#[test]
fn cancelled_run_stops_between_stages() {
    let token = CancelToken::new();
    token.cancel();
    let mut ctx = RunContext::new().with_cancel(token);
    let outcome = MapPipeline::new(RunSettings::default(), Standards::default())
        .run(inputs(), &mut RecordingHost::default(), &mut ctx)
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Cancelled { after: Stage::Setup }));
}

#[test]
fn zones_are_clipped_and_split() {
    let near = polygon![(x: -100.0, y: -100.0), (x: 100.0, y: -100.0), (x: 100.0, y: 100.0), (x: -100.0, y: 100.0)];
    let also_near = polygon![(x: 100.0, y: -100.0), (x: 200.0, y: -100.0), (x: 200.0, y: 100.0), (x: 100.0, y: 100.0)];
    let far = polygon![(x: 5000.0, y: 0.0), (x: 5100.0, y: 0.0), (x: 5100.0, y: 100.0), (x: 5000.0, y: 100.0)];
    let zones = Layer::new("zones", "규제구역", crs()).with_features(vec![
        Feature::new(1, Some(near.into())).with_attribute("구역명", "1구역"),
        Feature::new(2, Some(also_near.into())).with_attribute("구역명", "1구역"),
        Feature::new(3, Some(far.into())).with_attribute("구역명", "2구역"),
    ]);
    let mut run_inputs = inputs();
    run_inputs.zones = Some(zones);
    let products = completed(
        MapPipeline::new(RunSettings::default(), Standards::default())
            .run(run_inputs, &mut RecordingHost::default(), &mut RunContext::new())
            .unwrap(),
    );
    let zones = products.zones.expect("zone output");
    assert_eq!(zones.field, "구역명");
    assert_eq!(zones.segments.len(), 1);
    assert_eq!(zones.segments[0].value, "1구역");
    assert_eq!(zones.segments[0].feature_count, 2);
}

#[test]
fn zone_layer_outside_extent_yields_no_output() {
    let far = polygon![(x: 5000.0, y: 0.0), (x: 5100.0, y: 0.0), (x: 5100.0, y: 100.0), (x: 5000.0, y: 100.0)];
    let mut run_inputs = inputs();
    run_inputs.zones = Some(
        Layer::new("zones", "규제구역", crs())
            .with_features(vec![Feature::new(1, Some(far.into())).with_attribute("구역명", "2구역")]),
    );
    let mut ctx = RunContext::new();
    let products = completed(
        MapPipeline::new(RunSettings::default(), Standards::default())
            .run(run_inputs, &mut RecordingHost::default(), &mut ctx)
            .unwrap(),
    );
    assert!(products.zones.is_none());
    assert!(ctx.render_log().contains("does not intersect"));
}

#[test]
fn refresh_requires_sequence_field() {
    let pipeline = MapPipeline::new(RunSettings::default(), Standards::default());
    let err = pipeline
        .refresh(&heritage(), None, &mut RunContext::new())
        .unwrap_err();
    assert_eq!(err.stage, Stage::Refresh);
    assert!(matches!(err.source, PipelineError::Compatibility { .. }));
}

#[test]
fn refresh_renumbers_a_result_layer() {
    let pipeline = MapPipeline::new(tiered_settings(), Standards::default());
    let products = completed(
        pipeline
            .run(inputs(), &mut RecordingHost::default(), &mut RunContext::new())
            .unwrap(),
    );
    let layer = products.heritage.to_layer("result");
    let alphabetical = MapPipeline::new(
        RunSettings {
            numbering: NumberingPolicy::Alphabetical,
            ..RunSettings::default()
        },
        Standards::default(),
    );
    let refreshed = alphabetical
        .refresh(&layer, None, &mut RunContext::new())
        .unwrap();
    let numbered: Vec<(String, Option<u32>)> = refreshed
        .sites
        .iter()
        .map(|s| (s.name.clone(), s.sequence_number))
        .collect();
    // "동" sorts before "중"; the excluded site stays unnumbered.
    assert!(numbered.contains(&("동쪽 유적".to_string(), Some(1))));
    assert!(numbered.contains(&("중심 유적".to_string(), Some(2))));
    assert!(numbered.contains(&("먼 유적".to_string(), None)));
}

#[test]
fn refresh_keeps_rows_without_name_or_geometry() {
    let pipeline = MapPipeline::new(tiered_settings(), Standards::default());
    let products = completed(
        pipeline
            .run(inputs(), &mut RecordingHost::default(), &mut RunContext::new())
            .unwrap(),
    );
    let mut layer = products.heritage.to_layer("result");
    layer.features.push(
        Feature::new(10, Some(Point::new(5.0, 5.0).into()))
            .with_attribute(fields::SEQUENCE, 9i64)
            .with_attribute(fields::NAME, ""),
    );
    layer
        .features
        .push(Feature::new(11, None).with_attribute(fields::NAME, "위치 미상 유적"));
    let before = layer.feature_count();

    let mut ctx = RunContext::new();
    let refreshed = MapPipeline::new(
        RunSettings {
            numbering: NumberingPolicy::Alphabetical,
            ..RunSettings::default()
        },
        Standards::default(),
    )
    .refresh(&layer, None, &mut ctx)
    .unwrap();

    let written = refreshed.to_layer("result");
    assert_eq!(written.feature_count(), before);
    assert_eq!(refreshed.unreadable.len(), 2);
    assert!(
        written.features[3..]
            .iter()
            .all(|feature| feature.attribute(fields::SEQUENCE).and_then(|v| v.as_i64()).is_none())
    );
    assert!(matches!(
        ctx.warnings(),
        [DataWarning::UnreadableRows { count: 2, .. }]
    ));
    // Distances stored by the first run are not wiped by a study-area-less refresh.
    let east = refreshed.sites.iter().find(|s| s.name == "동쪽 유적").unwrap();
    assert!((east.distance_to_study_area.unwrap() - 800.0).abs() < 1e-9);
}

#[test]
fn extent_is_centered_on_the_study_area_centroid() {
    let l_shape = polygon![
        (x: 0.0, y: 0.0), (x: 1000.0, y: 0.0), (x: 1000.0, y: 400.0),
        (x: 400.0, y: 400.0), (x: 400.0, y: 1000.0), (x: 0.0, y: 1000.0)
    ];
    let mut map_inputs = inputs();
    map_inputs.study_area = Some(
        Layer::new("study", "조사구역", crs()).with_features(vec![Feature::new(1, Some(l_shape.into()))]),
    );
    let products = completed(
        MapPipeline::new(RunSettings::default(), Standards::default())
            .run(map_inputs, &mut RecordingHost::default(), &mut RunContext::new())
            .unwrap(),
    );
    let center = products.extent.center;
    assert!((center.x - 387.5).abs() < 1e-9, "{center:?}");
    assert!((center.y - 387.5).abs() < 1e-9, "{center:?}");
}
