use std::fmt;

use tracing::debug;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    AudioExtracted,
    ChunksProcessed,
    Concatenated,
    Muxed,
    Done,
    Failed,
}

impl PipelineState {
    /// The state a successful step leads to, `None` for terminal states
    pub fn next(self) -> Option<PipelineState> {
        match self {
            Self::Init => Some(Self::AudioExtracted),
            Self::AudioExtracted => Some(Self::ChunksProcessed),
            Self::ChunksProcessed => Some(Self::Concatenated),
            Self::Concatenated => Some(Self::Muxed),
            Self::Muxed => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn can_transition_to(self, to: PipelineState) -> bool {
        match to {
            Self::Failed => !self.is_terminal(),
            _ => self.next() == Some(to),
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::AudioExtracted => "audio-extracted",
            Self::ChunksProcessed => "chunks-processed",
            Self::Concatenated => "concatenated",
            Self::Muxed => "muxed",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Records the state of one run and refuses out-of-order transitions
#[derive(Debug)]
pub struct StateTracker {
    current: PipelineState,
    history: Vec<PipelineState>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            current: PipelineState::Init,
            history: vec![PipelineState::Init],
        }
    }

    pub fn current(&self) -> PipelineState {
        self.current
    }

    /// Every state visited so far, starting with `Init`
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Move to `to`; returns false (and stays put) if the move is not allowed
    pub fn advance(&mut self, to: PipelineState) -> bool {
        if !self.current.can_transition_to(to) {
            debug!("Rejected state transition {} -> {}", self.current, to);
            return false;
        }

        debug!("State {} -> {}", self.current, to);
        self.current = to;
        self.history.push(to);
        true
    }

    /// Move to `Failed` unless the run already ended
    pub fn fail(&mut self) {
        self.advance(PipelineState::Failed);
    }
}
