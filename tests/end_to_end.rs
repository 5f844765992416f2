//! Full runs against real ffmpeg.

mod common;

use std::path::Path;
use std::process::Command;

use backdrop::config::MissingAudioPolicy;
use backdrop::error::{AudioError, BackdropError};
use backdrop::video::{FfmpegFrameSource, FrameSource, MediaProbe, PixelOrder, SyntheticClip, Toolkit};
use backdrop::PipelineOrchestrator;
use rustfft::{num_complex::Complex, FftPlanner};

use common::{close_to, toolkit, Fixture, BLUE};

/// Decode `path` completely; returns the frame count and the first frame's
/// center and corner pixels in RGB order
fn inspect_video(toolkit: &Toolkit, path: &Path) -> (u64, [u8; 3], [u8; 3]) {
    let mut source = FfmpegFrameSource::open(path, toolkit).unwrap();
    let props = source.properties();

    let first = source.next_frame().unwrap().unwrap().into_order(PixelOrder::Rgb);
    let center = first.get_pixel(props.width / 2, props.height / 2);
    let corner = first.get_pixel(2, 2);

    let mut count = 1;
    while source.next_frame().unwrap().is_some() {
        count += 1;
    }
    (count, center, corner)
}

/// Dominant frequency of the audio track of `path`
fn dominant_frequency(path: &Path, dir: &Path) -> f64 {
    let wav = dir.join("tone.wav");
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
        .arg(path)
        .args(["-vn", "-ac", "1", "-ar", "44100", "-c:a", "pcm_s16le"])
        .arg(&wav)
        .status()
        .unwrap();
    assert!(status.success());

    let mut reader = hound::WavReader::open(&wav).unwrap();
    let sample_rate = reader.spec().sample_rate as f64;
    let samples: Vec<f32> = reader
        .samples::<i16>()
        .skip(8192)
        .take(16384)
        .map(|s| s.unwrap() as f32 / i16::MAX as f32)
        .collect();
    assert_eq!(samples.len(), 16384);

    let mut buffer: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    FftPlanner::<f32>::new().plan_fft_forward(buffer.len()).process(&mut buffer);

    let (peak, _) = buffer[1..buffer.len() / 2]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
        .unwrap();
    (peak + 1) as f64 * sample_rate / buffer.len() as f64
}

#[tokio::test]
async fn replaces_background_and_keeps_frames_and_audio() {
    let Some(toolkit) = toolkit() else { return };
    let fixture = Fixture::new(&toolkit, SyntheticClip::default());

    let summary = PipelineOrchestrator::new(fixture.config())
        .run(&fixture.input, &fixture.background, &fixture.output)
        .await
        .unwrap();

    assert_eq!(summary.frames, 300);
    assert_eq!(summary.chunks, 3);
    assert!(summary.has_audio);
    assert_eq!((summary.properties.width, summary.properties.height), (160, 120));

    let (frames, center, corner) = inspect_video(&toolkit, &fixture.output);
    assert_eq!(frames, 300);
    assert!(close_to(center, fixture.clip.subject_color, 40), "center pixel {:?}", center);
    assert!(close_to(corner, BLUE, 40), "corner pixel {:?}", corner);

    let probe = MediaProbe::new(toolkit);
    assert!(probe.has_audio(&fixture.output).unwrap());
    let tone = dominant_frequency(&fixture.output, fixture.dir.path());
    assert!((tone - 440.0).abs() < 10.0, "dominant frequency {:.1} Hz", tone);

    fixture.assert_scratch_empty();
}

#[tokio::test]
async fn sequential_and_pipelined_modes_agree() {
    let Some(toolkit) = toolkit() else { return };
    let clip = SyntheticClip {
        duration: 2.0,
        ..SyntheticClip::default()
    };
    let fixture = Fixture::new(&toolkit, clip);

    for depth in [0, 2] {
        let mut config = fixture.config();
        config.pipeline.chunk_size = 25;
        config.pipeline.encode_queue_depth = depth;
        config.pipeline.overwrite_output = true;

        let summary = PipelineOrchestrator::new(config)
            .run(&fixture.input, &fixture.background, &fixture.output)
            .await
            .unwrap();

        assert_eq!(summary.frames, 60);
        assert_eq!(summary.chunks, 3);

        let (frames, _, corner) = inspect_video(&toolkit, &fixture.output);
        assert_eq!(frames, 60);
        assert!(close_to(corner, BLUE, 40));
        fixture.assert_scratch_empty();
    }
}

#[tokio::test]
async fn silent_source_follows_missing_audio_policy() {
    let Some(toolkit) = toolkit() else { return };
    let clip = SyntheticClip {
        duration: 1.0,
        tone_hz: None,
        ..SyntheticClip::default()
    };
    let fixture = Fixture::new(&toolkit, clip);

    // Default policy refuses to drop the audio silently
    let result = PipelineOrchestrator::new(fixture.config())
        .run(&fixture.input, &fixture.background, &fixture.output)
        .await;
    assert!(matches!(
        result,
        Err(BackdropError::Audio(AudioError::NoAudioTrack { .. }))
    ));
    assert!(!fixture.output.exists());
    fixture.assert_scratch_empty();

    let mut config = fixture.config();
    config.pipeline.missing_audio = MissingAudioPolicy::VideoOnly;
    let summary = PipelineOrchestrator::new(config)
        .run(&fixture.input, &fixture.background, &fixture.output)
        .await
        .unwrap();

    assert!(!summary.has_audio);
    assert_eq!(summary.frames, 30);
    assert!(!MediaProbe::new(toolkit).has_audio(&fixture.output).unwrap());
    fixture.assert_scratch_empty();
}
