//! Core data model for the chunked decode state.
//!
//! This module is intentionally focused on *pure* types, with no threading or
//! I/O concerns. Higher-level modules (`loader`, `engine`, `streamer`) build
//! on top of these types.
//!
//! The central idea: decoded audio lives in fixed-size, immutable, planar
//! [`PlanarChunk`]s addressed by their chunk index, collected in a
//! structurally-shared map so that a new [`StreamModel`] snapshot can be
//! published cheaply after every insertion.

use std::sync::Arc;

/// Container/codec family of an opened source, as far as the loader cares.
///
/// MP3 has no cheap, exact random seeking, so the loader reads it strictly
/// forward. Everything else is assumed cheaply seekable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Mp3,
    Other,
}

impl SourceFormat {
    /// Whether the loader may seek this source to arbitrary chunk starts.
    #[inline]
    pub fn cheap_random_seek(self) -> bool {
        !matches!(self, SourceFormat::Mp3)
    }
}

/// Immutable description of an opened frame source.
///
/// `frame_count` is `None` for containers that do not declare their length
/// up front (typically MP3); in that case the model carries a running
/// estimate until the loader discovers the real end of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceHeader {
    /// Number of interleaved channels produced by `read_frames`.
    pub channel_count: u16,
    /// Source sample rate in Hz.
    pub sample_rate: u32,
    /// Total frames in the source, when the container knows it.
    pub frame_count: Option<u64>,
    /// Total byte length of the underlying stream (used for estimation).
    pub byte_len: u64,
    /// Format family, consumed by the loader's chunk-selection policy.
    pub format: SourceFormat,
}

/// One decoded chunk: a planar f32 matrix of `channel_count` rows, each
/// `chunk_frames` samples long.
///
/// Chunks are immutable after construction and shared by `Arc`; the
/// reference count is the only cross-thread mutation they ever see. A short
/// final chunk is zero-padded to the full length, with the valid prefix
/// implied by the header's frame count.
#[derive(Debug)]
pub struct PlanarChunk {
    planes: Vec<Vec<f32>>,
}

impl PlanarChunk {
    /// Deinterleave `frames` frames of `channels`-channel audio into a new
    /// planar chunk. `interleaved` must hold at least `frames * channels`
    /// samples.
    pub fn from_interleaved(interleaved: &[f32], channels: usize, frames: usize) -> Self {
        let mut planes = vec![vec![0.0f32; frames]; channels];
        for (ch, plane) in planes.iter_mut().enumerate() {
            for (fr, sample) in plane.iter_mut().enumerate() {
                *sample = interleaved[fr * channels + ch];
            }
        }
        Self { planes }
    }

    /// Sample at (channel, local frame).
    #[inline]
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        self.planes[channel][frame]
    }
}

/// Chunk id (= chunk index) to decoded chunk.
///
/// `im::HashMap` gives O(log n) lookup with structural sharing, so cloning
/// the map for a new snapshot is O(1) and old snapshots stay valid
/// indefinitely while new ones advance.
pub type ChunkMap = im::HashMap<usize, Arc<PlanarChunk>>;

/// Immutable snapshot of the decode state shared across threads.
///
/// A `StreamModel` is never mutated in place; writers derive a new value
/// from the previous one and publish it through the model store. `Clone` is
/// cheap: the chunk map shares structure and the header is `Copy`.
#[derive(Debug, Clone)]
pub struct StreamModel {
    pub chunks: ChunkMap,
    pub header: SourceHeader,
    /// Requested playback start, quantized to a block boundary. Picked up by
    /// the renderer at the start of its next block.
    pub seek_target: u64,
    /// Running estimate of the total frame count; meaningful only while
    /// `header.frame_count` is `None`.
    pub estimated_frames: u64,
}

impl StreamModel {
    pub fn new(header: SourceHeader) -> Self {
        Self {
            chunks: ChunkMap::new(),
            header,
            seek_target: 0,
            estimated_frames: 0,
        }
    }

    /// The known frame count when the header has one, else the estimate.
    #[inline]
    pub fn known_or_estimated_frames(&self) -> u64 {
        self.header.frame_count.unwrap_or(self.estimated_frames)
    }
}

/// Validated chunk/block geometry.
///
/// `chunk_frames` is the length of every decoded chunk in source frames;
/// `block_frames` is the length of one rendered output block. The settings
/// layer guarantees `chunk_frames % block_frames == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub chunk_frames: usize,
    pub block_frames: usize,
}

impl ChunkLayout {
    /// Chunk index containing an integral frame position.
    #[inline]
    pub fn chunk_index(self, frame: u64) -> usize {
        (frame / self.chunk_frames as u64) as usize
    }

    /// Chunk index containing a fractional frame position.
    #[inline]
    pub fn chunk_index_at(self, pos: f64) -> usize {
        (pos / self.chunk_frames as f64).floor() as usize
    }

    /// First frame covered by a chunk.
    #[inline]
    pub fn chunk_start(self, index: usize) -> u64 {
        index as u64 * self.chunk_frames as u64
    }

    /// Frame position relative to the start of its chunk.
    #[inline]
    pub fn local_frame(self, frame: u64) -> usize {
        (frame % self.chunk_frames as u64) as usize
    }

    /// Fractional frame position relative to the start of its chunk.
    #[inline]
    pub fn local_pos(self, pos: f64) -> f64 {
        pos % self.chunk_frames as f64
    }
}

/// Round `v` down to a multiple of `step`.
#[inline]
pub fn quantize(v: u64, step: u64) -> u64 {
    v - (v % step)
}
