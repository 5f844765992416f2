use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::task;
use tracing::{debug, info, warn};

use crate::{
    audio::{AudioExtractor, AudioMuxer, AudioRef},
    config::{Config, MissingAudioPolicy},
    error::{AudioError, BackdropError, ConfigError, RemovalError, Result, VideoError},
    pipeline::{
        stages::{ChunkStages, StageReport},
        state::{PipelineState, StateTracker},
        workspace::Workspace,
    },
    removal::{Background, ParallelChunkWorker, RemoverRegistry},
    video::{
        concat::{ConcatenatedVideo, SegmentConcatenator},
        encoder::ChunkEncoder,
        ffmpeg::Toolkit,
        source::{FfmpegFrameSource, FrameSource},
        types::VideoProperties,
    },
};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: PathBuf,
    pub properties: VideoProperties,
    pub frames: u64,
    pub chunks: usize,
    pub has_audio: bool,
    pub elapsed: Duration,
}

/// Drives a whole background-replacement run
///
/// The run follows a fixed sequence of steps:
/// 1. Init - check tools and output, open the source, load the background
/// 2. Audio - copy the original audio track into the workspace
/// 3. Chunks - decode, replace the background and encode chunk by chunk
/// 4. Concatenate - join the segments without re-encoding
/// 5. Mux - put the original audio back and write the output
///
/// A failing step ends the run. Nothing is retried, and the scratch
/// workspace is removed on every exit path.
pub struct PipelineOrchestrator {
    config: Config,
    registry: RemoverRegistry,
    toolkit: Toolkit,
}

impl PipelineOrchestrator {
    /// Create an orchestrator with the built-in removers
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, RemoverRegistry::new())
    }

    /// Create an orchestrator that resolves `removal.method` in `registry`
    pub fn with_registry(config: Config, registry: RemoverRegistry) -> Self {
        let toolkit = Toolkit::from_config(&config.toolkit);
        Self {
            config,
            registry,
            toolkit,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn toolkit(&self) -> &Toolkit {
        &self.toolkit
    }

    /// Replace the background of `input` with the image at `background`
    /// and write the result to `output`
    pub async fn run<P: AsRef<Path>>(&self, input: P, background: P, output: P) -> Result<RunSummary> {
        let (input, background, output) = (input.as_ref(), background.as_ref(), output.as_ref());

        self.announce(input, background, output);
        let mut state = StateTracker::new();

        let source = self
            .preflight(output)
            .and_then(|_| FfmpegFrameSource::open(input, &self.toolkit));

        let result = match source {
            Ok(source) => self.execute(&mut state, Box::new(source), input, background, output).await,
            Err(e) => Err(e),
        };
        self.finish(&mut state, result)
    }

    /// Like [`run`](Self::run), but frames come from an already opened source
    ///
    /// `input` is still read for its audio track.
    pub async fn run_with_source<P: AsRef<Path>>(
        &self,
        source: Box<dyn FrameSource>,
        input: P,
        background: P,
        output: P,
    ) -> Result<RunSummary> {
        let (input, background, output) = (input.as_ref(), background.as_ref(), output.as_ref());

        self.announce(input, background, output);
        let mut state = StateTracker::new();

        let result = match self.preflight(output) {
            Ok(()) => self.execute(&mut state, source, input, background, output).await,
            Err(e) => Err(e),
        };
        self.finish(&mut state, result)
    }

    fn announce(&self, input: &Path, background: &Path, output: &Path) {
        info!("🎬 Starting Backdrop run");
        info!("   Input: {:?}", input);
        info!("   Background: {:?}", background);
        info!("   Output: {:?}", output);
        info!("   Remover: {}", self.config.removal.method);
    }

    fn finish(&self, state: &mut StateTracker, result: Result<RunSummary>) -> Result<RunSummary> {
        match &result {
            Ok(summary) => {
                info!(
                    "🎉 Done! {} frames in {} chunks written to {:?} in {:.1?}",
                    summary.frames, summary.chunks, summary.output, summary.elapsed
                );
            }
            Err(e) => {
                let failed_in = state.current();
                state.fail();
                warn!("❌ Run failed during {} [{}]: {}", failed_in, e.stage(), e);
            }
        }
        result
    }

    /// Checks that need nothing but the configuration and the file system
    fn preflight(&self, output: &Path) -> Result<()> {
        self.config.validate()?;

        if output.exists() && !self.config.pipeline.overwrite_output {
            return Err(ConfigError::OutputExists {
                path: output.display().to_string(),
            }
            .into());
        }

        if !self.registry.has_method(&self.config.removal.method) {
            return Err(RemovalError::UnknownMethod {
                name: self.config.removal.method.clone(),
            }
            .into());
        }

        self.toolkit.ensure_available()
    }

    fn build_worker(&self) -> Result<ParallelChunkWorker> {
        let removal = &self.config.removal;
        ParallelChunkWorker::new(self.config.pipeline.worker_threads(), removal.model_policy, || {
            self.registry.create(removal)
        })
    }

    async fn execute(
        &self,
        state: &mut StateTracker,
        source: Box<dyn FrameSource>,
        input: &Path,
        background_path: &Path,
        output: &Path,
    ) -> Result<RunSummary> {
        let started = Instant::now();

        // Init: everything that can fail cheaply happens before the workspace exists
        let properties = source.properties();
        let background = Background::open(background_path, properties.width, properties.height)?;
        let worker = self.build_worker()?;
        let workspace = Workspace::create(self.config.pipeline.temp_root.as_deref(), &self.config.encoder.container)?;

        debug!(
            "Init complete: {}x{} @ {}, {} workers, workspace {:?}",
            properties.width,
            properties.height,
            properties.frame_rate,
            worker.threads(),
            workspace.path()
        );

        let audio = self.extract_audio(input, &workspace).await?;
        state.advance(PipelineState::AudioExtracted);

        let report = self
            .process_chunks(source, worker, background, &workspace, properties)
            .await?;
        state.advance(PipelineState::ChunksProcessed);

        let joined = self.concatenate(&report, &workspace).await?;
        state.advance(PipelineState::Concatenated);

        self.mux(&joined, audio.as_ref(), output).await?;
        state.advance(PipelineState::Muxed);

        workspace.close();
        state.advance(PipelineState::Done);

        Ok(RunSummary {
            output: output.to_path_buf(),
            properties,
            frames: report.frames,
            chunks: report.segments.len(),
            has_audio: audio.is_some(),
            elapsed: started.elapsed(),
        })
    }

    // ==========================================
    // STEP 1: AUDIO
    // ==========================================

    async fn extract_audio(&self, input: &Path, workspace: &Workspace) -> Result<Option<AudioRef>> {
        info!("🎵 Step 1: Extracting audio track...");

        let extractor = AudioExtractor::new(self.toolkit.clone());
        match extractor.extract(input, &workspace.audio_path()).await {
            Ok(audio) => Ok(Some(audio)),
            Err(BackdropError::Audio(AudioError::NoAudioTrack { path }))
                if self.config.pipeline.missing_audio == MissingAudioPolicy::VideoOnly =>
            {
                warn!("   {} has no audio track; the output will be video only", path);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // ==========================================
    // STEP 2: CHUNKS
    // ==========================================

    async fn process_chunks(
        &self,
        source: Box<dyn FrameSource>,
        worker: ParallelChunkWorker,
        background: Background,
        workspace: &Workspace,
        properties: VideoProperties,
    ) -> Result<StageReport> {
        let pipeline = &self.config.pipeline;
        info!(
            "🎨 Step 2: Replacing background in chunks of {} frames ({} workers)...",
            pipeline.chunk_size,
            worker.threads()
        );

        let encoder = ChunkEncoder::new(self.toolkit.clone(), self.config.encoder.clone());
        let stages = ChunkStages::new(worker, encoder, background, workspace.segments(), properties)
            .with_chunk_size(pipeline.chunk_size)
            .with_queue_depth(pipeline.encode_queue_depth);

        let report = task::spawn_blocking(move || {
            let mut source = source;
            stages.run(source.as_mut())
        })
        .await
        .map_err(|e| BackdropError::generic(format!("chunk stage task failed: {}", e)))??;

        if report.segments.is_empty() {
            return Err(VideoError::Decode {
                frame_index: 0,
                reason: "source produced no frames".to_string(),
            }
            .into());
        }

        info!("   ✅ Chunks complete:");
        info!("      Frames processed: {}", report.frames);
        info!("      Segments written: {}", report.segments.len());
        Ok(report)
    }

    // ==========================================
    // STEP 3: CONCATENATION
    // ==========================================

    async fn concatenate(&self, report: &StageReport, workspace: &Workspace) -> Result<ConcatenatedVideo> {
        info!("🔗 Step 3: Joining {} segments...", report.segments.len());

        SegmentConcatenator::new(self.toolkit.clone())
            .concatenate(&report.segments, &workspace.manifest_path(), &workspace.concatenated_path())
            .await
    }

    // ==========================================
    // STEP 4: MUX
    // ==========================================

    async fn mux(&self, joined: &ConcatenatedVideo, audio: Option<&AudioRef>, output: &Path) -> Result<()> {
        info!("🎬 Step 4: Writing final output...");

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let muxer = AudioMuxer::new(self.toolkit.clone(), self.config.audio.clone());
        let result = match audio {
            Some(audio) => muxer.mux(&joined.path, &audio.path, output).await,
            None => muxer.video_only(&joined.path, output).await,
        };

        if let Err(e) = result {
            // Do not leave a half-written output behind
            if output.exists() {
                if let Err(remove_error) = std::fs::remove_file(output) {
                    warn!("Failed to remove partial output {:?}: {}", output, remove_error);
                }
            }
            return Err(e);
        }

        Ok(())
    }
}
