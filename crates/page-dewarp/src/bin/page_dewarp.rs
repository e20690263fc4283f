//! page-dewarp CLI: flatten photos of curved book pages.

use clap::{ArgAction, Args, Parser, Subcommand};
use page_dewarp::render::write_debug_images;
use page_dewarp::{DewarpParams, Dewarper, Outcome};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "page-dewarp")]
#[command(about = "Flatten photographs of curved printed pages")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dewarp a page photo and write the flattened grayscale image.
    Dewarp(DewarpArgs),
    /// Print the detected page outline as JSON.
    Detect(DetectArgs),
    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Args)]
struct DewarpArgs {
    /// Path to the input image.
    #[arg(long)]
    input: PathBuf,

    /// Path of the flattened output image.
    #[arg(long)]
    output: PathBuf,

    /// JSON config; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for debug overlays and `trace.json`.
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

#[derive(Args)]
struct DetectArgs {
    /// Path to the input image.
    #[arg(long)]
    input: PathBuf,

    /// JSON config; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Dewarp(args) => run_dewarp(&args),
        Commands::Detect(args) => run_detect(&args),
        Commands::DefaultConfig => {
            println!("{}", DewarpParams::default().to_json_string()?);
            Ok(())
        }
    }
}

#[cfg(feature = "tracing")]
fn init_logging(verbose: u8) -> CliResult<()> {
    page_dewarp::init_tracing(false, verbose);
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8) -> CliResult<()> {
    let level = page_dewarp::core::level_from_verbosity(verbose);
    page_dewarp::core::init_with_level(level)?;
    Ok(())
}

fn load_params(path: Option<&Path>) -> CliResult<DewarpParams> {
    match path {
        Some(path) => DewarpParams::from_json_file(path).map_err(|e| -> CliError {
            format!("failed to load config {}: {e}", path.display()).into()
        }),
        None => Ok(DewarpParams::default()),
    }
}

fn load_gray(path: &Path) -> CliResult<image::GrayImage> {
    let img = image::open(path).map_err(|e| -> CliError {
        format!("failed to open image {}: {e}", path.display()).into()
    })?;
    Ok(img.to_luma8())
}

fn run_dewarp(args: &DewarpArgs) -> CliResult<()> {
    let params = load_params(args.config.as_deref())?;
    let gray = load_gray(&args.input)?;
    log::info!(
        "loaded {} ({}x{})",
        args.input.display(),
        gray.width(),
        gray.height()
    );

    let dewarper = Dewarper::new(params).with_trace(args.debug_dir.is_some());
    let result = dewarper.dewarp_image(&gray, None);
    match &result.outcome {
        Outcome::Flattened {
            initial_residual,
            residual,
            iterations,
            elapsed,
            stalled,
        } => log::info!(
            "flattened: residual {initial_residual:.6} -> {residual:.6} in {iterations} iterations ({:.2}s){}",
            elapsed.as_secs_f64(),
            if *stalled { ", stalled" } else { "" }
        ),
        Outcome::Unchanged(err) => log::warn!("{err}; writing the input unchanged"),
    }

    result.image.save(&args.output)?;
    log::info!(
        "wrote {} ({}x{})",
        args.output.display(),
        result.image.width(),
        result.image.height()
    );

    if let (Some(dir), Some(trace)) = (args.debug_dir.as_deref(), result.trace.as_ref()) {
        write_debug_images(dir, &gray, trace)?;
    }
    Ok(())
}

fn run_detect(args: &DetectArgs) -> CliResult<()> {
    let params = load_params(args.config.as_deref())?;
    let gray = load_gray(&args.input)?;
    let outline = page_dewarp::detect(&gray, &params).map_err(|e| -> CliError {
        format!("{}: {e}", args.input.display()).into()
    })?;
    println!("{}", serde_json::to_string_pretty(&outline)?);
    Ok(())
}
