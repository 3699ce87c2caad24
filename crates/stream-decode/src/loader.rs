//! Background decode worker.
//!
//! The loader owns the frame source and one named OS thread. Each cycle it
//! decides which chunk the playback position needs next, seeks the source
//! there, reads up to one chunk of interleaved frames, deinterleaves them
//! into a fresh immutable chunk and publishes a new model snapshot. It is
//! the sole model writer after construction.
//!
//! Chunk selection policy:
//! - sources without cheap random seeking (MP3) load strictly forward;
//! - seekable sources load by distance from the last reported playback
//!   position, wrapping to the start of the file once the scan reaches the
//!   end chunk.
//!
//! A short read marks the end chunk and, if the header did not declare a
//! frame count, fixes it. Stream errors are logged and treated as end of
//! stream. The worker checks its cancellation token at the top of every
//! cycle, so join latency is bounded by one chunk of I/O.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio_util::sync::CancellationToken;

use crate::model::{ChunkLayout, PlanarChunk, StreamModel};
use crate::shared::{Shared, SharedFlags};
use crate::source::FrameSource;

/// Handle to the decode worker; cancels and joins on drop.
pub(crate) struct Loader {
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl Loader {
    pub fn spawn(source: Box<dyn FrameSource>, shared: Arc<Shared>) -> std::io::Result<Self> {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let worker = std::thread::Builder::new()
            .name("stream-decode-loader".into())
            .spawn(move || load_loop(source, shared, token))?;
        Ok(Self {
            cancel,
            worker: Some(worker),
        })
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn load_loop(mut source: Box<dyn FrameSource>, shared: Arc<Shared>, cancel: CancellationToken) {
    let layout = shared.layout;
    let header = *source.header();
    let channels = header.channel_count.max(1) as usize;
    let mut scratch = vec![0.0f32; layout.chunk_frames * channels];
    let mut current = 0usize;
    let mut end_chunk: Option<usize> = None;
    let mut total_frames_read: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!("loader cancelled");
            return;
        }

        // Ask the renderer for a fresh position before the next decision.
        shared.flags.request_position();

        let start = layout.chunk_start(current);
        let frames_read = match source
            .seek(start)
            .and_then(|()| source.read_frames(&mut scratch))
        {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("stream error at frame {start}, treating as end of stream: {e}");
                0
            }
        };
        total_frames_read += frames_read as u64;

        let found_end = frames_read < layout.chunk_frames;
        if found_end {
            end_chunk = Some(current);
        }
        // The scratch buffer is reused across cycles; keep short-chunk tails
        // silent.
        scratch[frames_read * channels..].fill(0.0);

        let chunk = Arc::new(PlanarChunk::from_interleaved(
            &scratch,
            channels,
            layout.chunk_frames,
        ));
        let total_bytes_read = source.total_bytes_read();
        let model = shared.model.update_publish(|mut m| {
            m.chunks.insert(current, chunk);
            if found_end && m.header.frame_count.is_none() {
                m.header.frame_count = Some(layout.chunk_start(current) + frames_read as u64);
            }
            if m.header.frame_count.is_none() {
                m.estimated_frames =
                    estimate_frame_count(total_frames_read, total_bytes_read, m.header.byte_len);
            }
            m
        });
        tracing::trace!(chunk = current, frames = frames_read, "published chunk");

        match next_chunk_to_load(&model, &shared.flags, layout, current, end_chunk) {
            Some(next) => current = next,
            None => {
                tracing::debug!(chunks = model.chunks.len(), "source fully loaded");
                return;
            }
        }
    }
}

/// Extrapolate the total frame count from byte progress through the stream.
fn estimate_frame_count(total_frames_read: u64, total_bytes_read: u64, byte_len: u64) -> u64 {
    if total_bytes_read == 0 || byte_len == 0 {
        return total_frames_read;
    }
    let byte_progress = total_bytes_read as f64 / byte_len as f64;
    (total_frames_read as f64 / byte_progress) as u64
}

fn next_chunk_to_load(
    model: &StreamModel,
    flags: &SharedFlags,
    layout: ChunkLayout,
    just_loaded: usize,
    end_chunk: Option<usize>,
) -> Option<usize> {
    if model.header.format.cheap_random_seek() {
        next_chunk_by_distance(model, flags, layout, end_chunk)
    } else {
        next_chunk_forward(just_loaded, end_chunk)
    }
}

/// Forward-only policy: the next sequential chunk, until the end chunk has
/// been loaded.
fn next_chunk_forward(just_loaded: usize, end_chunk: Option<usize>) -> Option<usize> {
    match end_chunk {
        Some(end) if just_loaded == end => None,
        _ => Some(just_loaded + 1),
    }
}

/// Distance-from-playback policy: scan upward from the chunk under the
/// reported playback position, skipping chunks already present; once the
/// scan reaches the end chunk, wrap and cover the range before the
/// playback position.
fn next_chunk_by_distance(
    model: &StreamModel,
    flags: &SharedFlags,
    layout: ChunkLayout,
    end_chunk: Option<usize>,
) -> Option<usize> {
    let playback_chunk = layout.chunk_index_at(flags.position());
    let mut check = playback_chunk;
    loop {
        if !model.chunks.contains_key(&check) {
            return Some(check);
        }
        check += 1;
        if end_chunk == Some(check) {
            for wrapped in 0..playback_chunk {
                if !model.chunks.contains_key(&wrapped) {
                    return Some(wrapped);
                }
            }
            return None;
        }
    }
}
