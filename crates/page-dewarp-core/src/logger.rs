//! Stage-tagged stderr logger.
//!
//! Every record is attributed to the dewarping stage whose module emitted it
//! and printed as `[elapsed LEVEL stage] message`. Workspace records pass at
//! the configured level; records from other crates only at warn or above,
//! so `-vvv` does not drown the pipeline in decoder chatter.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

/// Crates whose records follow the configured verbosity.
const WORKSPACE_CRATES: [&str; 4] = [
    "page_dewarp",
    "page_dewarp_core",
    "page_dewarp_spans",
    "page_dewarp_model",
];

/// Pipeline stage a log record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Binarization and blob extraction.
    Mask,
    /// Per-blob summaries and filtering.
    Contours,
    /// Edge scoring and span assembly.
    Spans,
    /// Baseline fits and the aggregated keypoints.
    Keypoints,
    Optimize,
    Remap,
    /// Debug overlays and trace dumps.
    Debug,
    /// Orchestration, configuration and the command line.
    Pipeline,
    /// Shared numerics.
    Core,
}

/// Module prefixes in match order; the first hit wins.
const STAGE_MODULES: [(&str, Stage); 15] = [
    ("page_dewarp::preprocess", Stage::Mask),
    ("page_dewarp::detect", Stage::Mask),
    ("page_dewarp::render", Stage::Debug),
    ("page_dewarp::trace", Stage::Debug),
    ("page_dewarp_spans::contour", Stage::Contours),
    ("page_dewarp_spans::edge", Stage::Spans),
    ("page_dewarp_spans::assembler", Stage::Spans),
    ("page_dewarp_spans::sampler", Stage::Keypoints),
    ("page_dewarp_spans::span_info", Stage::Keypoints),
    ("page_dewarp_model::remap", Stage::Remap),
    ("page_dewarp_model", Stage::Optimize),
    ("page_dewarp_spans", Stage::Spans),
    ("page_dewarp_core", Stage::Core),
    ("page_dewarp::pipeline", Stage::Pipeline),
    ("page_dewarp", Stage::Pipeline),
];

/// `target` is `module` or one of its submodules.
fn within(target: &str, module: &str) -> bool {
    target
        .strip_prefix(module)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl Stage {
    /// Stage of a record target (a module path by default); `None` outside
    /// the workspace.
    pub fn of_target(target: &str) -> Option<Self> {
        STAGE_MODULES
            .iter()
            .find(|(module, _)| within(target, module))
            .map(|&(_, stage)| stage)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Mask => "mask",
            Stage::Contours => "contours",
            Stage::Spans => "spans",
            Stage::Keypoints => "keypoints",
            Stage::Optimize => "optimize",
            Stage::Remap => "remap",
            Stage::Debug => "debug",
            Stage::Pipeline => "pipeline",
            Stage::Core => "core",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

struct StageLogger {
    level: LevelFilter,
    started: Instant,
}

impl StageLogger {
    fn passes(&self, level: Level, target: &str) -> bool {
        let limit = if Stage::of_target(target).is_some() {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        };
        level <= limit
    }
}

/// One output line, without the trailing newline.
fn format_line(elapsed: f64, record: &Record) -> String {
    match Stage::of_target(record.target()) {
        Some(stage) => format!(
            "[{elapsed:7.3}s {:>5} {stage:<9}] {}",
            record.level(),
            record.args()
        ),
        None => format!(
            "[{elapsed:7.3}s {:>5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        ),
    }
}

impl Log for StageLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.passes(metadata.level(), metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(self.started.elapsed().as_secs_f64(), record);
        let _ = writeln!(std::io::stderr(), "{line}");
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<StageLogger> = OnceLock::new();

/// Install the stage logger with the provided level filter.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StageLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Map a `-v` count onto a level: 0 → warn, 1 → info, 2 → debug, 3+ → trace.
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// `EnvFilter` directives equivalent to the stage logger at `level`.
pub fn filter_directives(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    let mut directives = String::from("warn");
    for krate in WORKSPACE_CRATES {
        directives.push_str(&format!(",{krate}={level}"));
    }
    directives
}

/// Install a `tracing` fmt subscriber. `RUST_LOG` wins when set; otherwise
/// the workspace crates log at the level of the `-v` count.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level_from_verbosity(verbose))));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    if json {
        let _ = builder.json().flatten_event(true).finish().try_init();
    } else {
        let _ = builder
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}
