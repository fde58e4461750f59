use capture::{ImageDirectorySource, Runner, RunSummary};
use clap::{Parser, Subcommand};
use cli::{AppConfig, Overrides, report_points};
use color_eyre::eyre::{Result, bail};
use schemars::schema_for;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Track a colored marker through a stream of frames", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture frames, track the marker and report the collected points
    Run {
        /// Path to a TOML or JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory of frames to play back
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// Number of ticks to run
        #[arg(long)]
        frame_limit: Option<u64>,
        /// Run until Ctrl-C
        #[arg(long, conflicts_with = "frame_limit")]
        continuous: bool,
        /// Record processed frames into this directory
        #[arg(long)]
        record: Option<PathBuf>,
        /// Save cleaned masks into this directory
        #[arg(long)]
        snapshots: Option<PathBuf>,
        /// Write tracked points as JSON to this file
        #[arg(long)]
        points_output: Option<PathBuf>,
    },
    /// Print the JSON schema of the configuration file
    Schema {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the default configuration (.toml or .json)
    InitConfig {
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level))
        )
        .init();

    match cli.command {
        Commands::Run {
            config,
            source,
            frame_limit,
            continuous,
            record,
            snapshots,
            points_output,
        } => {
            let mut app_config = match config {
                Some(path) => AppConfig::from_file(&path)?,
                None => AppConfig::default(),
            };
            app_config.apply(Overrides {
                source,
                frame_limit,
                continuous,
                record,
                snapshots,
                points_output,
            });
            run(app_config).await?;
        }
        Commands::Schema { output } => {
            let schema = serde_json::to_string_pretty(&schema_for!(AppConfig))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, schema)?;
                    info!(path = %path.display(), "wrote configuration schema");
                }
                None => println!("{schema}"),
            }
        }
        Commands::InitConfig { path, force } => {
            init_config(&path, force)?;
        }
    }

    Ok(())
}

async fn run(config: AppConfig) -> Result<()> {
    config.validate()?;

    let mut pipeline = config.build_pipeline()?;
    let source = ImageDirectorySource::new(&config.source.path)
        .with_loop_playback(config.source.loop_playback);
    let runner = Runner::new(source, config.capture.clone())?.with_boxed_sink(config.build_sink()?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping capture");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => warn!(error = %err, "cannot listen for Ctrl-C"),
        }
    });

    let summary = runner.run(&mut pipeline, shutdown_rx).await?;
    log_summary(&summary);

    report_points(&config.report, &pipeline.into_points())?;
    Ok(())
}

fn log_summary(summary: &RunSummary) {
    info!(
        ticks = summary.ticks,
        frames = summary.frames_produced,
        empty_ticks = summary.empty_ticks,
        written = summary.frames_written,
        cancelled = summary.cancelled,
        "capture finished"
    );
    if summary.sink_failures > 0 {
        warn!(failures = summary.sink_failures, "some frames could not be recorded");
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists, use --force to overwrite", path.display());
    }
    AppConfig::default().to_file(path)?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}
