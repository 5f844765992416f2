use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::Result;

/// Where the segments of a run are written
#[derive(Debug, Clone)]
pub struct SegmentLayout {
    dir: PathBuf,
    extension: String,
}

impl SegmentLayout {
    pub fn new<P: Into<PathBuf>>(dir: P, extension: &str) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.to_string(),
        }
    }

    pub fn segment_path(&self, chunk_index: usize) -> PathBuf {
        self.dir.join(format!("chunk_{:05}.{}", chunk_index, self.extension))
    }
}

/// Scratch directory for one run
///
/// Holds the extracted audio, the per-chunk segments, the concat manifest and
/// the joined video. The directory and everything in it is removed when the
/// workspace is dropped, whether the run succeeded or not.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    extension: String,
}

impl Workspace {
    /// Create a fresh directory under `root`, or under the system temp dir
    pub fn create(root: Option<&Path>, extension: &str) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("backdrop-");

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        debug!("Workspace created at {:?}", dir.path());
        Ok(Self {
            dir,
            extension: extension.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn audio_path(&self) -> PathBuf {
        self.path().join("audio.mka")
    }

    /// Segment naming for this workspace, detached from its lifetime
    pub fn segments(&self) -> SegmentLayout {
        SegmentLayout::new(self.path(), &self.extension)
    }

    pub fn segment_path(&self, chunk_index: usize) -> PathBuf {
        self.segments().segment_path(chunk_index)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path().join("concat_list.txt")
    }

    pub fn concatenated_path(&self) -> PathBuf {
        self.path().join(format!("concatenated.{}", self.extension))
    }

    /// Remove the directory now, logging instead of failing if that is not possible
    pub fn close(self) {
        let path = self.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Workspace {:?} removed", path),
            Err(e) => warn!("Failed to remove workspace {:?}: {}", path, e),
        }
    }
}
