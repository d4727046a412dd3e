//! Run workflows behind the subcommands.
//!
//! Each workflow loads its layers, drives one pipeline operation against a
//! caller-built [`RunContext`] and writes the artifacts. Rendering is left to
//! the binary.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use archmap_core::{
    ClassificationPreview, ExclusionCandidate, MapPipeline, RunContext, RunOutcome, RunSummary,
};
use archmap_ingest::{encoding_for_label, read_layer};
use archmap_model::{Crs, DataWarning, RunSettings, Stage};
use archmap_report::{OutputSet, write_layer, write_outputs, write_run_log};
use archmap_standards::Standards;
use tracing::{info, info_span};

use crate::host::FileHost;
use crate::project::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled { after: Stage },
}

#[derive(Debug)]
pub struct MapRunResult {
    pub project: String,
    pub output_dir: PathBuf,
    pub status: RunStatus,
    /// Present when the run completed.
    pub summary: Option<RunSummary>,
    pub outputs: Option<OutputSet>,
    pub candidates: Vec<ExclusionCandidate>,
    pub warnings: Vec<DataWarning>,
    /// Source layers moved to the source-data group.
    pub relocated: usize,
    pub log: PathBuf,
    pub elapsed: Duration,
}

/// Runs the full map pipeline for `project` and writes every output.
///
/// The run log is written even when the run fails or is cancelled.
pub fn run_map(project: &Project, output_dir: &Path, mut ctx: RunContext) -> Result<MapRunResult> {
    let span = info_span!("project", name = %project.name);
    let _guard = span.enter();
    let started = Instant::now();

    let inputs = project.load_inputs()?;
    let pipeline = MapPipeline::new(project.settings().clone(), project.standards());
    let mut host = FileHost::new();
    let outcome = pipeline.run(inputs, &mut host, &mut ctx);

    let (status, products) = match outcome {
        Ok(RunOutcome::Completed(products)) => (RunStatus::Completed, Some(products)),
        Ok(RunOutcome::Cancelled { after }) => (RunStatus::Cancelled { after }, None),
        Err(error) => {
            let log = write_run_log(output_dir, &ctx)?;
            return Err(anyhow::Error::new(error)
                .context(format!("map run failed (run log: {})", log.display())));
        }
    };

    let (summary, outputs, candidates, log) = match products {
        Some(products) => {
            let outputs = write_outputs(output_dir, &products, project.settings(), &ctx)
                .context("write outputs")?;
            let log = outputs.log.clone();
            (
                Some(products.summary.clone()),
                Some(outputs),
                products.candidates.clone(),
                log,
            )
        }
        None => (None, None, Vec::new(), write_run_log(output_dir, &ctx)?),
    };
    info!(status = ?status, elapsed_ms = started.elapsed().as_millis() as u64, "map run finished");
    Ok(MapRunResult {
        project: project.name.clone(),
        output_dir: output_dir.to_path_buf(),
        status,
        summary,
        outputs,
        candidates,
        warnings: ctx.warnings().to_vec(),
        relocated: host.relocated(),
        log,
        elapsed: started.elapsed(),
    })
}

/// Inputs of a standalone renumbering.
#[derive(Debug, Clone)]
pub struct RenumberRequest {
    pub layer: PathBuf,
    pub encoding: String,
    /// Required for distance numbering.
    pub study_area: Option<PathBuf>,
    pub settings: RunSettings,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct RenumberResult {
    pub layer: String,
    pub total: usize,
    pub numbered: usize,
    pub hidden: usize,
    pub output: PathBuf,
    pub warnings: Vec<DataWarning>,
}

/// Re-numbers a previously written heritage layer.
pub fn renumber(request: &RenumberRequest, ctx: &mut RunContext) -> Result<RenumberResult> {
    request.settings.validate()?;
    let encoding = encoding_for_label(&request.encoding)?;
    let layer = read_layer(&request.layer, encoding)
        .with_context(|| format!("load layer {}", request.layer.display()))?;
    let study_area = request
        .study_area
        .as_deref()
        .map(|path| {
            read_layer(path, encoding).with_context(|| format!("load study area {}", path.display()))
        })
        .transpose()?;

    let pipeline = MapPipeline::new(request.settings.clone(), Standards::default());
    let heritage = pipeline.refresh(&layer, study_area.as_ref(), ctx)?;
    if let Some(parent) = request.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    write_layer(&request.output, &heritage.to_layer(layer.id.as_str()))?;
    Ok(RenumberResult {
        layer: heritage.name.clone(),
        total: heritage.len() + heritage.unreadable.len(),
        numbered: heritage.sites.iter().filter(|s| s.sequence_number.is_some()).count(),
        hidden: heritage.excluded_count(),
        output: request.output.clone(),
        warnings: ctx.warnings().to_vec(),
    })
}

/// Scans and classifies the project's heritage layers without building a map.
pub fn classify(project: &Project, ctx: &mut RunContext) -> Result<ClassificationPreview> {
    let span = info_span!("classify", project = %project.name);
    let _guard = span.enter();
    let working_crs = match &project.settings().working_crs {
        Some(crs) => crs.clone(),
        None => project
            .load_study_area()?
            .map_or_else(Crs::default, |layer| layer.crs),
    };
    let heritage = project.load_heritage()?;
    let pipeline = MapPipeline::new(project.settings().clone(), project.standards());
    let preview = pipeline.classify(heritage, &working_crs, &mut FileHost::new(), ctx)?;
    Ok(preview)
}
