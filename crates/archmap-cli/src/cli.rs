//! CLI argument definitions.

use std::path::PathBuf;

use archmap_model::{NumberingPolicy, Stage, TierNumbering};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "archmap",
    version,
    about = "Archaeological distribution maps for heritage survey reports",
    long_about = "Build archaeological distribution maps from a study area and heritage layers.\n\n\
                  Computes the paper-scale extent and study-area buffers, merges and numbers\n\
                  heritage sites, and clips regulatory zones. Results are written as GeoJSON\n\
                  result groups with a heritage table, a manifest and a run log."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write diagnostic logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full map pipeline for a project file.
    Run(RunArgs),

    /// Re-number a previously produced heritage layer.
    Renumber(RenumberArgs),

    /// Scan heritage categories and preview classification.
    Classify(ClassifyArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Project file (TOML).
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Output directory (default: the project's output_dir).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Cancel the run once this stage has completed.
    #[arg(long = "stop-after", value_enum, value_name = "STAGE")]
    pub stop_after: Option<StageArg>,

    /// Hide the progress bar.
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

#[derive(Args)]
pub struct RenumberArgs {
    /// Heritage result layer (GeoJSON).
    #[arg(value_name = "LAYER")]
    pub layer: PathBuf,

    /// Where to write the renumbered layer (default: overwrite LAYER).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Numbering order.
    #[arg(long = "numbering", value_enum, default_value = "top-to-bottom")]
    pub numbering: NumberingArg,

    /// Study area layer, required for distance numbering.
    #[arg(long = "study-area", value_name = "PATH")]
    pub study_area: Option<PathBuf>,

    /// Buffer distance in meters for tiering; repeat for several tiers.
    #[arg(long = "buffer", value_name = "METERS")]
    pub buffers: Vec<f64>,

    /// Restart numbering at 1 inside every buffer tier.
    #[arg(long = "restart-per-tier")]
    pub restart_per_tier: bool,

    /// Text encoding of the layer files.
    #[arg(long = "encoding", default_value = "utf-8")]
    pub encoding: String,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// Project file (TOML).
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// List every site instead of only exclusion candidates.
    #[arg(long = "all")]
    pub all: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum NumberingArg {
    TopToBottom,
    Distance,
    Alphabetical,
}

impl NumberingArg {
    pub fn policy(self) -> NumberingPolicy {
        match self {
            Self::TopToBottom => NumberingPolicy::TopToBottom,
            Self::Distance => NumberingPolicy::DistanceFromStudyArea,
            Self::Alphabetical => NumberingPolicy::Alphabetical,
        }
    }
}

pub fn tier_numbering(restart_per_tier: bool) -> TierNumbering {
    if restart_per_tier {
        TierNumbering::RestartPerTier
    } else {
        TierNumbering::Continuous
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StageArg {
    Setup,
    StudyArea,
    TopoMerge,
    Extent,
    Buffers,
    Collection,
    Dissolve,
    RangeFilter,
    Classification,
    Numbering,
}

impl StageArg {
    pub fn stage(self) -> Stage {
        match self {
            Self::Setup => Stage::Setup,
            Self::StudyArea => Stage::StudyArea,
            Self::TopoMerge => Stage::TopoMerge,
            Self::Extent => Stage::Extent,
            Self::Buffers => Stage::Buffers,
            Self::Collection => Stage::Collection,
            Self::Dissolve => Stage::Dissolve,
            Self::RangeFilter => Stage::RangeFilter,
            Self::Classification => Stage::Classification,
            Self::Numbering => Stage::Numbering,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
