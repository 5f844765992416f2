//! # Background Removal
//!
//! The remover itself is a collaborator behind the [`BackgroundRemover`] trait.
//! This module wires it into the pipeline:
//!
//! - [`RemoverRegistry`] builds remover instances by name
//! - [`FrameProcessor`] applies one remover to one frame, handling channel order
//! - [`ParallelChunkWorker`] fans the frames of a chunk out over a thread pool
//!
//! ## Custom removers
//!
//! ```rust,no_run
//! use backdrop::removal::{BackgroundRemover, RemoverRegistry};
//! use backdrop::video::types::Frame;
//! use backdrop::Result;
//!
//! struct Passthrough;
//!
//! impl BackgroundRemover for Passthrough {
//!     fn name(&self) -> &str {
//!         "passthrough"
//!     }
//!
//!     fn replace_background(&self, frame: &Frame, _background: &Frame) -> Result<Frame> {
//!         Ok(frame.clone())
//!     }
//! }
//!
//! let mut registry = RemoverRegistry::new();
//! registry.register("passthrough", |_| Ok(Box::new(Passthrough)));
//! ```

pub mod chroma;
pub mod processor;
pub mod registry;
pub mod traits;
pub mod worker;

pub use chroma::ChromaKeyRemover;
pub use processor::FrameProcessor;
pub use registry::RemoverRegistry;
pub use traits::{Background, BackgroundRemover};
pub use worker::ParallelChunkWorker;
