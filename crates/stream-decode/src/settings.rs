//! Settings for `stream-decode`.
//!
//! The geometry defaults match the intended use (large decode chunks, small
//! realtime blocks); both knobs are validated once at construction so the
//! hot path can rely on them unconditionally.

use crate::error::{StreamError, StreamResult};
use crate::model::ChunkLayout;

/// Configuration for a [`crate::Streamer`].
#[derive(Debug, Clone)]
pub struct StreamerSettings {
    /// Frames per decoded chunk.
    /// Larger chunks mean fewer seeks and fewer snapshots at the cost of
    /// decode latency per chunk. Default: 65536.
    pub chunk_frames: usize,

    /// Frames per rendered output block; the renderer writes exactly this
    /// many samples per channel per call. Must divide `chunk_frames`.
    /// Default: 64.
    pub block_frames: usize,
}

impl Default for StreamerSettings {
    fn default() -> Self {
        Self {
            chunk_frames: 1 << 16,
            block_frames: 64,
        }
    }
}

impl StreamerSettings {
    /// Create default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set frames per decoded chunk.
    pub fn with_chunk_frames(mut self, chunk_frames: usize) -> Self {
        self.chunk_frames = chunk_frames;
        self
    }

    /// Set frames per rendered block.
    pub fn with_block_frames(mut self, block_frames: usize) -> Self {
        self.block_frames = block_frames;
        self
    }

    /// Check the geometry and freeze it into a [`ChunkLayout`].
    pub(crate) fn validate(&self) -> StreamResult<ChunkLayout> {
        if self.chunk_frames == 0 {
            return Err(StreamError::InvalidSettings("chunk_frames must be nonzero"));
        }
        if self.block_frames == 0 {
            return Err(StreamError::InvalidSettings("block_frames must be nonzero"));
        }
        if self.chunk_frames % self.block_frames != 0 {
            return Err(StreamError::InvalidSettings(
                "chunk_frames must be a multiple of block_frames",
            ));
        }
        Ok(ChunkLayout {
            chunk_frames: self.chunk_frames,
            block_frames: self.block_frames,
        })
    }
}
