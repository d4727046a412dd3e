use anyhow::Result;
use archmap_cli::project::Project;
use archmap_cli::workflow::{
    MapRunResult, RenumberRequest, RenumberResult, classify, renumber, run_map,
};
use archmap_core::{CancelToken, ClassificationPreview, Progress, RunContext};
use archmap_model::{RunSettings, Stage};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info_span;

use crate::cli::{ClassifyArgs, RenumberArgs, RunArgs, StageArg, tier_numbering};

const PROGRESS_TEMPLATE: &str = "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}";

fn progress_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(Stage::RUN.len() as u64);
    let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar
}

/// Progress sink: advances the bar and trips the cancel token on `stop_after`.
fn progress_callback(
    bar: ProgressBar,
    cancel: CancelToken,
    stop_after: Option<Stage>,
) -> impl FnMut(&Progress) + 'static {
    move |progress: &Progress| {
        if let Some(position) = progress.position {
            bar.set_position(position as u64);
        }
        bar.set_message(progress.message.clone());
        if progress.count.is_none() && stop_after == Some(progress.stage) {
            cancel.cancel();
        }
    }
}

pub fn run_project(args: &RunArgs) -> Result<MapRunResult> {
    let project = Project::load(&args.project)?;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| project.output_dir());

    let bar = progress_bar(args.no_progress);
    let cancel = CancelToken::new();
    let ctx = RunContext::new()
        .with_cancel(cancel.clone())
        .with_progress(progress_callback(
            bar.clone(),
            cancel,
            args.stop_after.map(StageArg::stage),
        ));
    let result = run_map(&project, &output_dir, ctx);
    bar.finish_and_clear();
    result
}

pub fn run_renumber(args: &RenumberArgs) -> Result<RenumberResult> {
    let span = info_span!("renumber", layer = %args.layer.display());
    let _guard = span.enter();
    let request = RenumberRequest {
        layer: args.layer.clone(),
        encoding: args.encoding.clone(),
        study_area: args.study_area.clone(),
        settings: RunSettings {
            numbering: args.numbering.policy(),
            tier_numbering: tier_numbering(args.restart_per_tier),
            buffers: args.buffers.clone(),
            ..RunSettings::default()
        },
        output: args.output.clone().unwrap_or_else(|| args.layer.clone()),
    };
    renumber(&request, &mut RunContext::new())
}

pub fn run_classify(args: &ClassifyArgs) -> Result<ClassificationPreview> {
    let project = Project::load(&args.project)?;
    classify(&project, &mut RunContext::new())
}
