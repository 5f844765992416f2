use crate::error::Result;
use crate::video::{
    source::FrameSource,
    types::{Chunk, Frame},
};

/// Frames reserved up front when a chunk starts filling
const INITIAL_CAPACITY: usize = 256;

/// Number of chunks `frames` frames split into at `chunk_size` per chunk
pub fn chunk_count(frames: u64, chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    frames.div_ceil(chunk_size as u64)
}

/// Groups frames from a source into consecutive chunks
///
/// Every chunk holds `chunk_size` frames except possibly the last. The
/// iterator stops after the first decode error.
pub struct Chunker<'a> {
    source: &'a mut dyn FrameSource,
    chunk_size: usize,
    next_index: usize,
    done: bool,
}

impl<'a> Chunker<'a> {
    pub fn new(source: &'a mut dyn FrameSource, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
            next_index: 0,
            done: false,
        }
    }

    fn fill(&mut self) -> Result<Option<Chunk>> {
        let mut frames: Vec<Frame> = Vec::with_capacity(self.chunk_size.min(INITIAL_CAPACITY));

        while frames.len() < self.chunk_size {
            match self.source.next_frame()? {
                Some(frame) => frames.push(frame),
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if frames.is_empty() {
            return Ok(None);
        }

        let chunk = Chunk {
            index: self.next_index,
            frames,
        };
        self.next_index += 1;
        Ok(Some(chunk))
    }
}

impl Iterator for Chunker<'_> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.fill() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
