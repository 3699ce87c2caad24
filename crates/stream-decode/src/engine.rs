//! Realtime block renderer.
//!
//! Everything here runs on the audio thread and must stay realtime-safe:
//! no allocation, no locks, no syscalls, loops bounded by the block length.
//! The renderer works off one model snapshot per block plus the
//! audio-thread-local [`PlayCursor`]; the only cross-thread writes it
//! performs go through the relaxed [`SharedFlags`].
//!
//! Two render paths exist per block:
//! - **single-chunk**: the whole block maps into one chunk; samples are
//!   taken nearest-neighbour at truncated positions.
//! - **transition**: the block spans a chunk boundary; every output sample
//!   resolves its floor and ceiling frames through their own chunk lookups
//!   and linearly interpolates between them, reading missing chunks as
//!   silence.
//!
//! The single-chunk path advances the cursor only when its chunk is
//! present; the transition path always advances.

use crate::model::{ChunkLayout, StreamModel};
use crate::shared::SharedFlags;

/// Playback lifecycle of one streamer instance.
///
/// `Finished` is terminal: a seek does not resume a finished streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayState {
    Playing,
    Finished,
}

/// Audio-thread-local playback cursor.
///
/// This is the only place holding the fractional playback position; it is
/// owned by the renderer handle and never shared.
#[derive(Debug)]
pub(crate) struct PlayCursor {
    pub state: PlayState,
    /// Frame the current playback run started from; compared against the
    /// model's seek target to detect pending seeks.
    pub run_start: u64,
    /// Fractional playback position in source frames.
    pub position: f64,
}

impl PlayCursor {
    pub fn new() -> Self {
        Self {
            state: PlayState::Playing,
            run_start: 0,
            position: 0.0,
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Render one block of stereo output from a model snapshot.
///
/// `out` rows must each be exactly `layout.block_frames` long; the caller
/// keeps them zeroed or retains previous content when the renderer declines
/// to write (already finished).
pub(crate) fn render_block(
    cursor: &mut PlayCursor,
    flags: &SharedFlags,
    model: &StreamModel,
    layout: ChunkLayout,
    host_rate: f64,
    mut out: [&mut [f32]; 2],
) {
    if cursor.state == PlayState::Finished {
        return;
    }

    // Seeks take effect here and nowhere else.
    if model.seek_target != cursor.run_start {
        cursor.run_start = model.seek_target;
        cursor.position = model.seek_target as f64;
    }

    let frame_inc = model.header.sample_rate as f64 / host_rate;
    let span_beg = cursor.position;
    let span_end = cursor.position + layout.block_frames as f64 * frame_inc;
    let chunk_beg = layout.chunk_index_at(span_beg);
    let chunk_end = layout.chunk_index_at(span_end);

    if chunk_beg == chunk_end {
        render_single_chunk(cursor, flags, model, layout, chunk_beg, frame_inc, &mut out);
    } else {
        render_transition(cursor, flags, model, layout, frame_inc, &mut out);
    }

    if flags.position_requested() {
        flags.store_position(cursor.position);
        flags.clear_position_request();
    }
}

fn render_single_chunk(
    cursor: &mut PlayCursor,
    flags: &SharedFlags,
    model: &StreamModel,
    layout: ChunkLayout,
    chunk_index: usize,
    frame_inc: f64,
    out: &mut [&mut [f32]; 2],
) {
    let channels = model.header.channel_count as usize;

    let Some(chunk) = model.chunks.get(&chunk_index) else {
        // Data not decoded yet: emit silence and hold position until it is.
        for row in out.iter_mut() {
            row.fill(0.0);
        }
        return;
    };

    for (ch, row) in out.iter_mut().enumerate().take(channels.min(2)) {
        let mut fr = cursor.position;
        for sample in row.iter_mut() {
            *sample = chunk.sample(ch, layout.local_pos(fr) as usize);
            fr += frame_inc;
        }
    }
    duplicate_mono(channels, out);

    cursor.position += layout.block_frames as f64 * frame_inc;
    finish_if_ended(cursor, flags, model);
}

fn render_transition(
    cursor: &mut PlayCursor,
    flags: &SharedFlags,
    model: &StreamModel,
    layout: ChunkLayout,
    frame_inc: f64,
    out: &mut [&mut [f32]; 2],
) {
    let channels = model.header.channel_count as usize;

    for (ch, row) in out.iter_mut().enumerate().take(channels.min(2)) {
        let mut fr = cursor.position;
        for sample in row.iter_mut() {
            let fr_a = fr.floor() as u64;
            let fr_b = fr.ceil() as u64;
            let t = (fr - fr.floor()) as f32;
            *sample = lerp(
                sample_at(model, layout, ch, fr_a),
                sample_at(model, layout, ch, fr_b),
                t,
            );
            fr += frame_inc;
        }
    }
    duplicate_mono(channels, out);

    cursor.position += layout.block_frames as f64 * frame_inc;
    finish_if_ended(cursor, flags, model);
}

/// Resolve one integral frame through its own chunk lookup, reading missing
/// chunks as silence.
#[inline]
fn sample_at(model: &StreamModel, layout: ChunkLayout, channel: usize, frame: u64) -> f32 {
    match model.chunks.get(&layout.chunk_index(frame)) {
        Some(chunk) => chunk.sample(channel, layout.local_frame(frame)),
        None => 0.0,
    }
}

/// Mono sources play on both output channels.
#[inline]
fn duplicate_mono(channels: usize, out: &mut [&mut [f32]; 2]) {
    if channels < 2 {
        let (first, rest) = out.split_at_mut(1);
        rest[0].copy_from_slice(first[0]);
    }
}

fn finish_if_ended(cursor: &mut PlayCursor, flags: &SharedFlags, model: &StreamModel) {
    if cursor.position >= model.known_or_estimated_frames() as f64 {
        cursor.state = PlayState::Finished;
        flags.set_finished();
    }
}
