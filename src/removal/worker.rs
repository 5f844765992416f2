use std::time::Instant;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::{
    config::ModelPolicy,
    error::{BackdropError, RemovalError, Result, VideoError},
    removal::{Background, BackgroundRemover, FrameProcessor},
    video::{
        encoder::ENCODER_ORDER,
        types::{Chunk, Frame, PixelOrder, ProcessedChunk},
    },
};

enum Instances {
    Shared(Box<dyn BackgroundRemover>),
    PerWorker(Vec<Box<dyn BackgroundRemover>>),
}

/// Runs background replacement over the frames of a chunk on a fixed pool
///
/// The pool and the remover instances are created once and reused for every
/// chunk of a run. Output frames come back in input order no matter which
/// thread finished first.
pub struct ParallelChunkWorker {
    pool: ThreadPool,
    instances: Instances,
    output_order: PixelOrder,
}

impl ParallelChunkWorker {
    /// Start `threads` workers and build remover instances according to `policy`
    ///
    /// `factory` is called once for [`ModelPolicy::Shared`] and once per thread
    /// for [`ModelPolicy::PerWorker`].
    pub fn new<F>(threads: usize, policy: ModelPolicy, mut factory: F) -> Result<Self>
    where
        F: FnMut() -> Result<Box<dyn BackgroundRemover>>,
    {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("backdrop-worker-{}", i))
            .build()
            .map_err(|e| RemovalError::WorkerPool { reason: e.to_string() })?;

        let instances = match policy {
            ModelPolicy::Shared => Instances::Shared(factory()?),
            ModelPolicy::PerWorker => {
                let removers = (0..threads).map(|_| factory()).collect::<Result<Vec<_>>>()?;
                Instances::PerWorker(removers)
            }
        };

        debug!("Worker pool ready: {} threads, {:?} model policy", threads, policy);

        Ok(Self {
            pool,
            instances,
            output_order: ENCODER_ORDER,
        })
    }

    /// Channel order of the frames returned by [`process_chunk`](Self::process_chunk)
    pub fn with_output_order(mut self, order: PixelOrder) -> Self {
        self.output_order = order;
        self
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Number of remover instances held by the pool
    pub fn instances(&self) -> usize {
        match &self.instances {
            Instances::Shared(_) => 1,
            Instances::PerWorker(removers) => removers.len(),
        }
    }

    fn remover_for_current_thread(&self) -> &dyn BackgroundRemover {
        match &self.instances {
            Instances::Shared(remover) => remover.as_ref(),
            Instances::PerWorker(removers) => {
                let slot = self.pool.current_thread_index().unwrap_or(0) % removers.len();
                removers[slot].as_ref()
            }
        }
    }

    /// Replace the background of every frame in `chunk`
    ///
    /// Any frame failure fails the whole chunk; the error names the chunk and
    /// the frame.
    pub fn process_chunk(&self, chunk: Chunk, background: &Background) -> Result<ProcessedChunk> {
        let chunk_index = chunk.index;
        let frame_count = chunk.len();
        let started = Instant::now();

        let frames = self
            .pool
            .install(|| {
                chunk
                    .frames
                    .into_par_iter()
                    .map(|frame| {
                        FrameProcessor::new(self.remover_for_current_thread())
                            .process(&frame, background)
                            .map(|output| output.into_order(self.output_order))
                    })
                    .collect::<Result<Vec<Frame>>>()
            })
            .map_err(|e| attach_chunk(e, chunk_index))?;

        debug!(
            "Chunk {}: {} frames processed in {:.2?}",
            chunk_index,
            frame_count,
            started.elapsed()
        );

        Ok(ProcessedChunk {
            index: chunk_index,
            frames,
        })
    }
}

fn attach_chunk(error: BackdropError, chunk_index: usize) -> BackdropError {
    match error {
        BackdropError::Video(VideoError::Processing {
            chunk_index: None,
            frame_index,
            reason,
        }) => VideoError::Processing {
            chunk_index: Some(chunk_index),
            frame_index,
            reason,
        }
        .into(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackdropError;
    use image::{ImageBuffer, Rgb};
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use std::thread;
    use std::time::Duration;

    /// Returns the frame unchanged after a random delay
    struct Jittery;

    impl BackgroundRemover for Jittery {
        fn name(&self) -> &str {
            "jittery"
        }

        fn replace_background(&self, frame: &Frame, _background: &Frame) -> Result<Frame> {
            let mut rng = SmallRng::seed_from_u64(frame.index());
            thread::sleep(Duration::from_millis(rng.gen_range(0..8)));
            Ok(frame.clone())
        }
    }

    struct FailsAt(u64);

    impl BackgroundRemover for FailsAt {
        fn name(&self) -> &str {
            "fails-at"
        }

        fn replace_background(&self, frame: &Frame, _background: &Frame) -> Result<Frame> {
            if frame.index() == self.0 {
                return Err(RemovalError::Segmentation {
                    reason: "no subject found".to_string(),
                }
                .into());
            }
            Ok(frame.clone())
        }
    }

    fn chunk(index: usize, first: u64, len: u64) -> Chunk {
        Chunk {
            index,
            frames: (first..first + len)
                .map(|i| Frame::new_filled(i, PixelOrder::Bgr, 4, 4, [1, 2, 3]))
                .collect(),
        }
    }

    fn background() -> Background {
        Background::from_image(ImageBuffer::from_pixel(4, 4, Rgb([0u8, 0, 255])), 4, 4)
    }

    #[test]
    fn test_output_order_matches_input_order() {
        let worker = ParallelChunkWorker::new(4, ModelPolicy::PerWorker, || Ok(Box::new(Jittery))).unwrap();

        let processed = worker.process_chunk(chunk(2, 200, 64), &background()).unwrap();

        assert_eq!(processed.index, 2);
        let indices: Vec<u64> = processed.frames.iter().map(Frame::index).collect();
        assert_eq!(indices, (200..264).collect::<Vec<_>>());
        assert!(processed.frames.iter().all(|f| f.order() == PixelOrder::Bgr));
        assert_eq!(processed.frames[0].get_pixel(0, 0), [1, 2, 3]);
    }

    #[test]
    fn test_one_bad_frame_fails_the_chunk() {
        let worker = ParallelChunkWorker::new(3, ModelPolicy::Shared, || Ok(Box::new(FailsAt(13)))).unwrap();

        match worker.process_chunk(chunk(1, 10, 10), &background()) {
            Err(BackdropError::Video(VideoError::Processing {
                chunk_index,
                frame_index,
                ..
            })) => {
                assert_eq!(chunk_index, Some(1));
                assert_eq!(frame_index, 13);
            }
            Err(other) => panic!("expected Processing error, got {}", other),
            Ok(_) => panic!("expected chunk failure"),
        }
    }

    #[test]
    fn test_instance_count_follows_policy() {
        let mut created = 0;
        let worker = ParallelChunkWorker::new(3, ModelPolicy::PerWorker, || {
            created += 1;
            Ok(Box::new(Jittery))
        })
        .unwrap();
        assert_eq!(worker.instances(), 3);
        assert_eq!(worker.threads(), 3);
        drop(worker);
        assert_eq!(created, 3);

        let mut created = 0;
        let worker = ParallelChunkWorker::new(3, ModelPolicy::Shared, || {
            created += 1;
            Ok(Box::new(Jittery))
        })
        .unwrap();
        assert_eq!(worker.instances(), 1);
        drop(worker);
        assert_eq!(created, 1);
    }

    #[test]
    fn test_instances_are_reused_across_chunks() {
        let mut created = 0;
        let worker = ParallelChunkWorker::new(2, ModelPolicy::PerWorker, || {
            created += 1;
            Ok(Box::new(Jittery))
        })
        .unwrap();

        for index in 0..3 {
            worker.process_chunk(chunk(index, index as u64 * 5, 5), &background()).unwrap();
        }
        drop(worker);
        assert_eq!(created, 2);
    }

    #[test]
    fn test_factory_failure_is_reported() {
        let result = ParallelChunkWorker::new(2, ModelPolicy::PerWorker, || {
            Err(BackdropError::generic("model file missing"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_output_order() {
        let worker = ParallelChunkWorker::new(1, ModelPolicy::Shared, || Ok(Box::new(Jittery)))
            .unwrap()
            .with_output_order(PixelOrder::Rgb);

        let processed = worker.process_chunk(chunk(0, 0, 2), &background()).unwrap();
        assert_eq!(processed.frames[0].order(), PixelOrder::Rgb);
        assert_eq!(processed.frames[0].get_pixel(0, 0), [3, 2, 1]);
    }
}
