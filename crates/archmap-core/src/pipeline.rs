//! The staged map run.
//!
//! Stages run in [`Stage::RUN`] order against one [`RunContext`]. The cancel
//! token is checked after every stage; a cancelled run ends with
//! [`RunOutcome::Cancelled`] rather than an error. A fatal error aborts the
//! run and names the stage that raised it.

use archmap_geometry::{BufferEngine, ExtentCalculator, check_working_crs, reproject_layer};
use archmap_ingest::HeritageCollector;
use archmap_model::{
    BufferSet, Crs, DataWarning, Extent, Feature, HeritageLayer, HeritageSite, Layer, LayerHost,
    LayerId, PipelineError, ResultGroup, RunSettings, Stage, StudyArea, ZoneLayer, groups,
};
use archmap_standards::Standards;
use serde::Serialize;
use thiserror::Error;
use tracing::info_span;

use crate::classify::{ClassificationReport, ExclusionCandidate, ScanReport, SmartClassifier, scan_categories};
use crate::context::RunContext;
use crate::dissolve::{DissolveMerger, DissolveReport};
use crate::numbering::{NumberingEngine, NumberingReport};
use crate::range::{RangeFilter, RangeReport};
use crate::topo::{TopoMerger, TopoReport};
use crate::zone::ZoneSplitter;

pub const HERITAGE_LAYER_NAME: &str = "Heritage_Sites";
pub const STUDY_AREA_LAYER_NAME: &str = "Study_Area";
pub const EXTENT_LAYER_NAME: &str = "Extent";

/// A fatal failure together with the stage that raised it.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct RunError {
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

impl RunError {
    fn at(stage: Stage) -> impl FnOnce(PipelineError) -> Self {
        move |source| Self { stage, source }
    }

    fn precondition(stage: Stage, message: &str) -> Self {
        Self {
            stage,
            source: PipelineError::Precondition(message.to_string()),
        }
    }
}

/// Layers selected for a run.
#[derive(Debug, Clone, Default)]
pub struct MapInputs {
    pub study_area: Option<Layer>,
    pub topo: Vec<Layer>,
    pub heritage: Vec<Layer>,
    pub zones: Option<Layer>,
}

impl MapInputs {
    fn source_ids(&self) -> Vec<LayerId> {
        self.study_area
            .iter()
            .chain(&self.topo)
            .chain(&self.heritage)
            .chain(&self.zones)
            .map(|layer| layer.id.clone())
            .collect()
    }
}

/// Counts reported by each stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RunSummary {
    pub collected: usize,
    pub topo: Option<TopoReport>,
    pub dissolve: Option<DissolveReport>,
    pub range: RangeReport,
    pub classification: ClassificationReport,
    pub numbering: NumberingReport,
    pub zone_segments: usize,
}

/// Everything a completed run produces.
#[derive(Debug, Clone)]
pub struct MapProducts {
    pub study_area: StudyArea,
    pub extent: Extent,
    pub buffers: BufferSet,
    pub topo: Option<Layer>,
    pub heritage: HeritageLayer,
    pub zones: Option<ZoneLayer>,
    pub candidates: Vec<ExclusionCandidate>,
    pub summary: RunSummary,
}

impl MapProducts {
    /// Result layers paired with their group, in group order.
    pub fn result_layers(&self) -> Vec<(ResultGroup, Layer)> {
        let crs = &self.extent.crs;
        let mut layers = Vec::new();

        let study = Layer::new(STUDY_AREA_LAYER_NAME, STUDY_AREA_LAYER_NAME, crs.clone())
            .with_features(vec![
                Feature::new(1, Some(self.study_area.as_geometry()))
                    .with_attribute("name", self.study_area.name.as_str()),
            ]);
        layers.push((ResultGroup::StudyArea, study));

        layers.push((ResultGroup::Heritage, self.heritage.to_layer(HERITAGE_LAYER_NAME)));

        let extent_name = format!("{EXTENT_LAYER_NAME}_1_{}", self.extent.scale);
        let extent = Layer::new(extent_name.clone(), extent_name, crs.clone()).with_features(vec![
            Feature::new(1, Some(self.extent.polygon().into()))
                .with_attribute("scale", i64::from(self.extent.scale))
                .with_attribute("width_m", self.extent.width_map_units())
                .with_attribute("height_m", self.extent.height_map_units()),
        ]);
        layers.push((ResultGroup::Extent, extent));

        for ring in self.buffers.rings() {
            let name = format!("Buffer_{}m", ring.distance_m);
            let layer = Layer::new(name.clone(), name, crs.clone()).with_features(vec![
                Feature::new(1, Some(ring.geometry.clone().into()))
                    .with_attribute("distance_m", ring.distance_m),
            ]);
            layers.push((ResultGroup::Buffers, layer));
        }

        if let Some(topo) = &self.topo {
            layers.push((ResultGroup::Topo, topo.clone()));
        }
        if let Some(zones) = &self.zones {
            layers.push((ResultGroup::Zones, zones.to_layer(zones.name.clone())));
        }
        layers
    }
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(Box<MapProducts>),
    Cancelled { after: Stage },
}

/// Result of the standalone classification preview.
#[derive(Debug, Clone)]
pub struct ClassificationPreview {
    pub sites: Vec<HeritageSite>,
    pub scan: ScanReport,
    pub report: ClassificationReport,
}

#[derive(Debug, Clone)]
pub struct MapPipeline {
    settings: RunSettings,
    standards: Standards,
}

impl MapPipeline {
    pub fn new(settings: RunSettings, standards: Standards) -> Self {
        Self {
            settings,
            standards,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn run<H: LayerHost + ?Sized>(
        &self,
        inputs: MapInputs,
        host: &mut H,
        ctx: &mut RunContext,
    ) -> Result<RunOutcome, RunError> {
        let settings = &self.settings;
        let _span = info_span!("map_run", scale = settings.scale).entered();
        let source_ids = inputs.source_ids();
        let mut summary = RunSummary::default();

        // Setup
        let stage = enter(ctx, Stage::Setup);
        settings.validate().map_err(RunError::at(stage))?;
        let Some(study_layer) = inputs.study_area else {
            return Err(RunError::precondition(stage, "no study area layer selected"));
        };
        if inputs.heritage.is_empty() {
            return Err(RunError::precondition(stage, "no heritage layer selected"));
        }
        let working_crs = settings
            .working_crs
            .clone()
            .unwrap_or_else(|| study_layer.crs.clone());
        if let Some(warning) = check_working_crs(&working_crs) {
            ctx.warn(warning);
        }
        ctx.info(format!("working CRS {working_crs}"));
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        // Study area
        let stage = enter(ctx, Stage::StudyArea);
        let (study_layer, warning) = reproject_layer(study_layer, &working_crs);
        ctx.warn_opt(warning);
        let study_area = StudyArea::from_layer(&study_layer).map_err(RunError::at(stage))?;
        let study_geometry = study_area.as_geometry();
        ctx.count(
            study_area.geometry.0.len(),
            format!("study area '{}' with {} polygons", study_area.name, study_area.geometry.0.len()),
        );
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        // Topographic merge
        let stage = enter(ctx, Stage::TopoMerge);
        let topo = if inputs.topo.is_empty() {
            ctx.info("no topographic layers selected");
            None
        } else {
            TopoMerger::new(working_crs.clone())
                .merge(inputs.topo, ctx)
                .map(|(layer, report)| {
                    summary.topo = Some(report);
                    layer
                })
        };
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        // Extent
        let stage = enter(ctx, Stage::Extent);
        let calculator = ExtentCalculator::new(settings.paper, settings.scale);
        let extent = ExtentCalculator::reference(Some(&study_area.geometry), host.view_center())
            .and_then(|center| calculator.compute(center, &working_crs))
            .map_err(|error| RunError {
                stage,
                source: PipelineError::geometry(stage, error),
            })?;
        ctx.info(ExtentCalculator::describe(&extent));
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        // Buffers
        let stage = enter(ctx, Stage::Buffers);
        let buffers = BufferEngine
            .build(&study_area.geometry, &working_crs, &settings.buffers)
            .map_err(RunError::at(stage))?;
        if buffers.is_empty() {
            ctx.info("no buffer distances configured");
        } else {
            let distances: Vec<String> = buffers.thresholds().iter().map(|d| format!("{d}m")).collect();
            ctx.count(buffers.len(), format!("buffers built: {}", distances.join(", ")));
        }
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        // Heritage collection
        let stage = enter(ctx, Stage::Collection);
        let collection = HeritageCollector::new(working_crs.clone()).collect(inputs.heritage, host);
        for warning in collection.warnings.iter().cloned() {
            ctx.warn(warning);
        }
        summary.collected = collection.count();
        if collection.sites.is_empty() {
            ctx.notice("no heritage sites collected from the selected layers");
        } else {
            ctx.count(
                summary.collected,
                format!("{} sites collected from {} layers", summary.collected, collection.layers.len()),
            );
        }
        let source_layers = collection.layers;
        let mut sites = collection.sites;
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        // Dissolve
        let stage = enter(ctx, Stage::Dissolve);
        if settings.dissolve {
            let (merged, report) = DissolveMerger.apply_merged(sites, &source_layers, ctx);
            sites = merged;
            summary.dissolve = Some(report);
        } else {
            ctx.info("dissolve disabled");
        }
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        // Range filter
        let stage = enter(ctx, Stage::RangeFilter);
        let filter = RangeFilter::new(settings.exclude_outside_buffer);
        let retained = filter.retained_area(&extent, &buffers);
        summary.range = filter.apply(&mut sites, &retained, &settings.manual_exclusions, ctx);
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        // Classification
        let stage = enter(ctx, Stage::Classification);
        summary.classification =
            SmartClassifier::new(&self.standards, settings.smart_filter).classify(&mut sites, ctx);
        let candidates = summary.classification.candidates.clone();
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        // Numbering
        let stage = enter(ctx, Stage::Numbering);
        summary.numbering = self
            .numbering_engine()
            .number(&mut sites, Some(&study_geometry), &buffers.thresholds(), ctx)
            .map_err(RunError::at(stage))?;
        let heritage = HeritageLayer::new(HERITAGE_LAYER_NAME, working_crs.clone(), sites);
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        // Zones
        let stage = enter(ctx, Stage::Zones);
        let zones = match inputs.zones {
            Some(zone_layer) => {
                let (zone_layer, warning) = reproject_layer(zone_layer, &working_crs);
                ctx.warn_opt(warning);
                let splitter = ZoneSplitter::new(settings.clip_zone_to_buffer);
                let retained = splitter.retained_area(&extent, &buffers, ctx);
                splitter.split(&zone_layer, &retained, ctx)
            }
            None => {
                ctx.info("no zone layer selected");
                None
            }
        };
        summary.zone_segments = zones.as_ref().map_or(0, |zones| zones.segments.len());
        relocate_sources(&source_ids, host, ctx);
        if let Some(outcome) = checkpoint(ctx, stage) {
            return Ok(outcome);
        }

        Ok(RunOutcome::Completed(Box::new(MapProducts {
            study_area,
            extent,
            buffers,
            topo,
            heritage,
            zones,
            candidates,
            summary,
        })))
    }

    /// Collects, dissolves, scans and classifies without building a map.
    pub fn classify<H: LayerHost + ?Sized>(
        &self,
        heritage: Vec<Layer>,
        working_crs: &Crs,
        host: &mut H,
        ctx: &mut RunContext,
    ) -> Result<ClassificationPreview, RunError> {
        let _span = info_span!("classify_preview").entered();
        let stage = enter(ctx, Stage::Scan);
        if heritage.is_empty() {
            return Err(RunError::precondition(stage, "no heritage layer selected"));
        }
        let scan = scan_categories(&heritage, &self.standards, ctx);

        enter(ctx, Stage::Collection);
        let collection = HeritageCollector::new(working_crs.clone()).collect(heritage, host);
        for warning in collection.warnings.iter().cloned() {
            ctx.warn(warning);
        }
        let mut sites = collection.sites;
        if self.settings.dissolve {
            enter(ctx, Stage::Dissolve);
            sites = DissolveMerger.apply_merged(sites, &collection.layers, ctx).0;
        }

        enter(ctx, Stage::Classification);
        let report =
            SmartClassifier::new(&self.standards, self.settings.smart_filter).classify(&mut sites, ctx);
        Ok(ClassificationPreview {
            sites,
            scan,
            report,
        })
    }

    /// Re-numbers an existing result layer with the configured policy.
    ///
    /// `study_area` is required for distance numbering.
    pub fn refresh(
        &self,
        layer: &Layer,
        study_area: Option<&Layer>,
        ctx: &mut RunContext,
    ) -> Result<HeritageLayer, RunError> {
        let _span = info_span!("refresh", layer = %layer.name).entered();
        let stage = enter(ctx, Stage::Refresh);
        let study_geometry = match study_area {
            Some(study_layer) => {
                let (study_layer, warning) = reproject_layer(study_layer.clone(), &layer.crs);
                ctx.warn_opt(warning);
                Some(
                    StudyArea::from_layer(&study_layer)
                        .map_err(RunError::at(stage))?
                        .as_geometry(),
                )
            }
            None => None,
        };
        let (heritage, report) = self
            .numbering_engine()
            .refresh(layer, study_geometry.as_ref(), &self.settings.sorted_buffers(), ctx)
            .map_err(RunError::at(stage))?;
        ctx.info(format!(
            "layer '{}' renumbered: {} of {} sites",
            layer.name,
            report.numbered,
            heritage.len()
        ));
        Ok(heritage)
    }

    fn numbering_engine(&self) -> NumberingEngine {
        NumberingEngine::new(self.settings.numbering)
            .with_tier_numbering(self.settings.tier_numbering)
            .with_buffer_tiers(self.settings.buffer_tiers)
    }
}

fn enter(ctx: &mut RunContext, stage: Stage) -> Stage {
    ctx.enter(stage);
    stage
}

fn checkpoint(ctx: &mut RunContext, stage: Stage) -> Option<RunOutcome> {
    if ctx.is_cancelled() {
        ctx.notice(format!("run cancelled after {stage}"));
        Some(RunOutcome::Cancelled { after: stage })
    } else {
        None
    }
}

/// Moves the original input layers into the source-data group.
fn relocate_sources<H: LayerHost + ?Sized>(ids: &[LayerId], host: &mut H, ctx: &mut RunContext) {
    let mut moved = 0;
    for id in ids {
        match host.move_layer_to_group(id, groups::SOURCE_DATA) {
            Ok(()) => moved += 1,
            Err(error) => ctx.warn(DataWarning::RelocationFailed {
                layer: id.to_string(),
                reason: error.to_string(),
            }),
        }
    }
    ctx.info(format!("{moved} source layers moved to {}", groups::SOURCE_DATA));
}
