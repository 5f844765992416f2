//! # Backdrop
//!
//! Replace the background of every frame in a video, processing the frames in
//! parallel chunks and reassembling them in order with the original audio.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use backdrop::{config::Config, pipeline::PipelineOrchestrator};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut config = Config::default();
//! config.pipeline.chunk_size = 50;
//!
//! let orchestrator = PipelineOrchestrator::new(config);
//! orchestrator.run("interview.mp4", "office.png", "interview_office.mp4").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - Decoding, segment encoding and concatenation through ffmpeg
//! - [`removal`] - The background-removal collaborator and its worker pool
//! - [`audio`] - Extracting the original audio track and muxing it back
//! - [`pipeline`] - The orchestrator and its chunked stages
//! - [`config`] - Configuration management
//!
//! Memory use is bounded by the chunk size: frames are read, processed and
//! encoded one chunk at a time, and only the encoded segments stay on disk
//! until they are joined.

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod removal;
pub mod video;

use std::path::Path;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{BackdropError, Result},
    pipeline::{PipelineOrchestrator, RunSummary},
    removal::{BackgroundRemover, RemoverRegistry},
};

/// Run the whole pipeline with the default configuration
pub async fn replace_background<P: AsRef<Path>>(input: P, background: P, output: P) -> Result<RunSummary> {
    PipelineOrchestrator::new(Config::default())
        .run(input, background, output)
        .await
}
