//! Shared fixtures for the integration tests.
//!
//! Every test renders its own synthetic clip with ffmpeg and returns early
//! when ffmpeg/ffprobe are not installed.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use backdrop::config::Config;
use backdrop::video::{SyntheticClip, Toolkit};
use image::{ImageBuffer, Rgb};
use tempfile::TempDir;

pub const BLUE: [u8; 3] = [0, 0, 255];

pub fn toolkit() -> Option<Toolkit> {
    let toolkit = Toolkit::default();
    if toolkit.is_available() {
        Some(toolkit)
    } else {
        eprintln!("Skipping: ffmpeg/ffprobe not available");
        None
    }
}

/// A temp directory with an input clip, a background image and a scratch root
pub struct Fixture {
    pub dir: TempDir,
    pub clip: SyntheticClip,
    pub input: PathBuf,
    pub background: PathBuf,
    pub output: PathBuf,
    pub scratch: PathBuf,
}

impl Fixture {
    pub fn new(toolkit: &Toolkit, clip: SyntheticClip) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let background = dir.path().join("background.png");
        let output = dir.path().join("output.mp4");
        let scratch = dir.path().join("scratch");

        clip.render(toolkit, &input).unwrap();
        ImageBuffer::from_pixel(clip.width, clip.height, Rgb(BLUE))
            .save(&background)
            .unwrap();
        std::fs::create_dir_all(&scratch).unwrap();

        Fixture {
            dir,
            clip,
            input,
            background,
            output,
            scratch,
        }
    }

    /// Configuration that keeps run workspaces inside `scratch`
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.pipeline.temp_root = Some(self.scratch.clone());
        config.pipeline.workers = 2;
        config
    }

    /// Nothing may be left behind in the scratch root after a run
    pub fn assert_scratch_empty(&self) {
        assert!(scratch_is_empty(&self.scratch), "workspace left behind in {:?}", self.scratch);
    }
}

pub fn scratch_is_empty(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// True when every channel of `actual` is within `tolerance` of `expected`
pub fn close_to(actual: [u8; 3], expected: [u8; 3], tolerance: u8) -> bool {
    actual.iter().zip(expected).all(|(a, e)| a.abs_diff(e) <= tolerance)
}
