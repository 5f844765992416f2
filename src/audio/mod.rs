//! # Audio Module
//!
//! The pipeline never decodes audio itself. The original track is copied out
//! of the source before any video work starts and put back onto the processed
//! video at the very end, so it is carried through the run untouched.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use backdrop::audio::{AudioExtractor, AudioMuxer};
//! use backdrop::config::AudioConfig;
//! use backdrop::video::Toolkit;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let toolkit = Toolkit::default();
//! let audio = AudioExtractor::new(toolkit.clone())
//!     .extract(Path::new("input.mp4"), Path::new("audio.mka"))
//!     .await?;
//!
//! AudioMuxer::new(toolkit, AudioConfig::default())
//!     .mux(Path::new("processed.mp4"), &audio.path, Path::new("output.mp4"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod extractor;
pub mod muxer;

pub use extractor::{AudioExtractor, AudioRef};
pub use muxer::AudioMuxer;
