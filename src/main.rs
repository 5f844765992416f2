use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use backdrop::{config::Config, pipeline::PipelineOrchestrator};

#[derive(Parser)]
#[command(
    name = "backdrop",
    version,
    about = "Replace the background of every frame in a video",
    long_about = "Backdrop decodes a video, replaces the background of every frame in parallel chunks, \
                  and reassembles the result in order with the original audio track."
)]
struct Cli {
    /// Source video
    #[arg(short, long, required_unless_present = "print_config")]
    input: Option<PathBuf>,

    /// Replacement background image (PNG or JPEG)
    #[arg(short, long, required_unless_present = "print_config")]
    background: Option<PathBuf>,

    /// Output video file path
    #[arg(short, long, required_unless_present = "print_config")]
    output: Option<PathBuf>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames per chunk (overrides the configuration file)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Worker threads, 0 for one per CPU (overrides the configuration file)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Overwrite the output file if it exists
    #[arg(short, long)]
    force: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                Config::from_file(path).with_context(|| format!("loading {:?}", path))?
            }
            None => Config::default(),
        };

        if let Some(chunk_size) = self.chunk_size {
            config.pipeline.chunk_size = chunk_size;
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
        if self.force {
            config.pipeline.overwrite_output = true;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = cli.load_config()?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(ExitCode::SUCCESS);
    }

    info!("Backdrop v{}", env!("CARGO_PKG_VERSION"));

    let (input, background, output) = match (&cli.input, &cli.background, &cli.output) {
        (Some(input), Some(background), Some(output)) => (input, background, output),
        _ => anyhow::bail!("--input, --background and --output are required"),
    };

    let orchestrator = PipelineOrchestrator::new(config);
    match orchestrator.run(input, background, output).await {
        Ok(summary) => {
            info!(
                "Output saved to {:?} ({}x{}, {} frames, audio: {})",
                summary.output,
                summary.properties.width,
                summary.properties.height,
                summary.frames,
                if summary.has_audio { "yes" } else { "no" }
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
