use std::sync::mpsc;
use std::thread;

use tracing::{debug, info};

use crate::{
    error::{BackdropError, Result},
    pipeline::{chunker::Chunker, workspace::SegmentLayout},
    removal::{Background, ParallelChunkWorker},
    video::{
        encoder::SegmentWriter,
        source::FrameSource,
        types::{ProcessedChunk, SegmentRef, VideoProperties},
    },
};

/// What the chunk stages produced
#[derive(Debug, Clone)]
pub struct StageReport {
    /// One segment per chunk, in chunk order
    pub segments: Vec<SegmentRef>,
    pub frames: u64,
}

/// Decode, process and encode every chunk of a source
///
/// With a queue depth of zero each chunk is processed and encoded before the
/// next one is read, so at most one chunk of raw frames is held in memory.
/// With a positive depth the encoder runs on its own thread behind a bounded
/// queue and encodes chunk N while chunk N+1 is being processed. Segments are
/// produced in chunk order in both modes.
pub struct ChunkStages<W: SegmentWriter> {
    worker: ParallelChunkWorker,
    writer: W,
    background: Background,
    layout: SegmentLayout,
    properties: VideoProperties,
    chunk_size: usize,
    queue_depth: usize,
}

impl<W: SegmentWriter> ChunkStages<W> {
    pub fn new(
        worker: ParallelChunkWorker,
        writer: W,
        background: Background,
        layout: SegmentLayout,
        properties: VideoProperties,
    ) -> Self {
        Self {
            worker,
            writer,
            background,
            layout,
            properties,
            chunk_size: 100,
            queue_depth: 0,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    pub fn run(&self, source: &mut dyn FrameSource) -> Result<StageReport> {
        if self.queue_depth == 0 {
            self.run_sequential(source)
        } else {
            self.run_pipelined(source)
        }
    }

    fn encode(&self, processed: &ProcessedChunk) -> Result<SegmentRef> {
        let dest = self.layout.segment_path(processed.index);
        let segment = self.writer.write_segment(processed, &dest, &self.properties)?;

        info!(
            "   Chunk {} encoded: {} frames ({:.2}s)",
            segment.chunk_index, segment.frame_count, segment.duration
        );
        Ok(segment)
    }

    fn run_sequential(&self, source: &mut dyn FrameSource) -> Result<StageReport> {
        let mut segments = Vec::new();
        let mut frames = 0u64;

        for chunk in Chunker::new(source, self.chunk_size) {
            let chunk = chunk?;
            frames += chunk.len() as u64;

            let processed = self.worker.process_chunk(chunk, &self.background)?;
            segments.push(self.encode(&processed)?);
        }

        Ok(StageReport { segments, frames })
    }

    fn run_pipelined(&self, source: &mut dyn FrameSource) -> Result<StageReport> {
        let (sender, receiver) = mpsc::sync_channel::<ProcessedChunk>(self.queue_depth);
        debug!("Encode stage running behind a queue of {} chunks", self.queue_depth);

        thread::scope(|scope| -> Result<StageReport> {
            let encode_stage = thread::Builder::new()
                .name("backdrop-encoder".to_string())
                .spawn_scoped(scope, move || -> Result<Vec<SegmentRef>> {
                    let mut segments = Vec::new();
                    // A failure drops the receiver, which stops the producer
                    for processed in receiver {
                        segments.push(self.encode(&processed)?);
                    }
                    Ok(segments)
                })?;

            let mut frames = 0u64;
            let produced = (|| -> Result<()> {
                for chunk in Chunker::new(source, self.chunk_size) {
                    let chunk = chunk?;
                    frames += chunk.len() as u64;

                    let processed = self.worker.process_chunk(chunk, &self.background)?;
                    if sender.send(processed).is_err() {
                        // Encoder gave up; its error is reported below
                        break;
                    }
                }
                Ok(())
            })();
            drop(sender);

            let encoded = encode_stage
                .join()
                .map_err(|_| BackdropError::generic("encode stage panicked"))?;

            produced?;
            Ok(StageReport {
                segments: encoded?,
                frames,
            })
        })
    }
}
