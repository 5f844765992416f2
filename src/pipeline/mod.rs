//! # Pipeline Module
//!
//! Orchestration of a full run: the state machine, the chunking of the frame
//! stream, the decode/process/encode stages and the scratch workspace that
//! holds intermediate files.
//!
//! ```rust,no_run
//! use backdrop::{config::Config, pipeline::PipelineOrchestrator};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let orchestrator = PipelineOrchestrator::new(Config::default());
//! let summary = orchestrator.run("input.mp4", "beach.jpg", "output.mp4").await?;
//! println!("{} frames in {} chunks", summary.frames, summary.chunks);
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod orchestrator;
pub mod stages;
pub mod state;
pub mod workspace;

pub use chunker::{chunk_count, Chunker};
pub use orchestrator::{PipelineOrchestrator, RunSummary};
pub use stages::{ChunkStages, StageReport};
pub use state::{PipelineState, StateTracker};
pub use workspace::{SegmentLayout, Workspace};
