//! Failed runs must not leave a workspace or a partial output behind.

mod common;

use std::path::{Path, PathBuf};

use backdrop::config::MissingAudioPolicy;
use backdrop::error::{BackdropError, RemovalError, Result, VideoError};
use backdrop::video::{Frame, SyntheticClip, Toolkit};
use backdrop::{BackgroundRemover, PipelineOrchestrator, RemoverRegistry};

use common::{scratch_is_empty, toolkit, Fixture};

/// Re-encode `input` as YUV4MPEG and overwrite the marker of frame `frame_index`
fn y4m_with_corrupt_frame(toolkit: &Toolkit, input: &Path, clip: &SyntheticClip, frame_index: usize) -> PathBuf {
    let y4m = input.with_extension("y4m");
    let mut cmd = toolkit.ffmpeg();
    cmd.arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-an", "-pix_fmt", "yuv420p", "-f", "yuv4mpegpipe"])
        .arg(&y4m);
    Toolkit::run(&mut cmd).unwrap();

    let mut bytes = std::fs::read(&y4m).unwrap();
    let header = bytes.iter().position(|&b| b == b'\n').unwrap() + 1;
    let picture = (clip.width * clip.height * 3 / 2) as usize;
    let offset = header + frame_index * (b"FRAME\n".len() + picture);
    assert_eq!(&bytes[offset..offset + 6], b"FRAME\n");

    bytes[offset..offset + 5].copy_from_slice(b"JUNK!");
    std::fs::write(&y4m, bytes).unwrap();
    y4m
}

#[tokio::test]
async fn decode_failure_midway_removes_workspace() {
    let Some(toolkit) = toolkit() else { return };
    let fixture = Fixture::new(&toolkit, SyntheticClip::default());
    let corrupt = y4m_with_corrupt_frame(&toolkit, &fixture.input, &fixture.clip, 150);

    for depth in [0, 1] {
        let mut config = fixture.config();
        config.pipeline.encode_queue_depth = depth;
        config.pipeline.missing_audio = MissingAudioPolicy::VideoOnly;

        let result = PipelineOrchestrator::new(config)
            .run(&corrupt, &fixture.background, &fixture.output)
            .await;

        match result {
            Err(BackdropError::Video(VideoError::Decode { frame_index, .. })) => {
                assert!(frame_index > 0 && frame_index <= 150, "failed at frame {}", frame_index)
            }
            Err(other) => panic!("expected Decode error, got {}", other),
            Ok(_) => panic!("run should have failed"),
        }

        assert!(!fixture.output.exists());
        fixture.assert_scratch_empty();
    }
}

#[tokio::test]
async fn missing_background_fails_before_any_segment() {
    let Some(toolkit) = toolkit() else { return };
    let clip = SyntheticClip {
        duration: 1.0,
        ..SyntheticClip::default()
    };
    let fixture = Fixture::new(&toolkit, clip);
    let missing = fixture.dir.path().join("no-such-background.png");

    let result = PipelineOrchestrator::new(fixture.config())
        .run(&fixture.input, &missing, &fixture.output)
        .await;

    assert!(matches!(
        result,
        Err(BackdropError::Removal(RemovalError::BackgroundLoad { .. }))
    ));
    assert!(!fixture.output.exists());
    assert!(scratch_is_empty(&fixture.scratch));
}

/// Keys nothing out and fails on one frame
struct RejectsFrame(u64);

impl BackgroundRemover for RejectsFrame {
    fn name(&self) -> &str {
        "rejects-frame"
    }

    fn replace_background(&self, frame: &Frame, _background: &Frame) -> Result<Frame> {
        if frame.index() == self.0 {
            return Err(RemovalError::Segmentation {
                reason: "no foreground found".to_string(),
            }
            .into());
        }
        Ok(frame.clone())
    }
}

#[tokio::test]
async fn processing_failure_names_chunk_and_frame() {
    let Some(toolkit) = toolkit() else { return };
    let clip = SyntheticClip {
        duration: 2.0,
        ..SyntheticClip::default()
    };
    let fixture = Fixture::new(&toolkit, clip);

    let mut registry = RemoverRegistry::new();
    registry.register("rejects-frame", |_| Ok(Box::new(RejectsFrame(37))));

    let mut config = fixture.config();
    config.removal.method = "rejects-frame".to_string();
    config.pipeline.chunk_size = 25;

    let result = PipelineOrchestrator::with_registry(config, registry)
        .run(&fixture.input, &fixture.background, &fixture.output)
        .await;

    match result {
        Err(BackdropError::Video(VideoError::Processing {
            chunk_index,
            frame_index,
            ..
        })) => {
            assert_eq!(chunk_index, Some(1));
            assert_eq!(frame_index, 37);
        }
        Err(other) => panic!("expected Processing error, got {}", other),
        Ok(_) => panic!("run should have failed"),
    }

    assert!(!fixture.output.exists());
    fixture.assert_scratch_empty();
}
