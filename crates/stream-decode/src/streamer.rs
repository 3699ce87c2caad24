//! Public streamer façade.
//!
//! [`Streamer::open`] splits the instance into two handles, mirroring the
//! two thread classes that use it:
//!
//! - [`Streamer`] — the control handle. Seeks, queries, chunk-map
//!   introspection. Cheap, non-realtime, callable from any control thread.
//!   Dropping it stops and joins the decode worker.
//! - [`StreamRenderer`] — the audio handle. Owns the playback cursor and
//!   renders one block per call; realtime-safe by construction since it is
//!   the only type that can touch the cursor.
//!
//! Both handles share the model register and the flags; either may outlive
//! the other safely (a renderer without its streamer simply stops seeing
//! new chunks).

use std::sync::Arc;

use crate::engine::{self, PlayCursor};
use crate::error::StreamResult;
use crate::loader::Loader;
use crate::model::{quantize, SourceHeader, StreamModel};
use crate::settings::StreamerSettings;
use crate::shared::{ModelStore, Shared, SharedFlags};
use crate::source::FrameSource;

/// Receiver for the loaded-chunk bitmap produced by
/// [`Streamer::chunk_info`].
///
/// The streamer does not commit to a bitmap representation; callers bring
/// their own. `Vec<bool>` works out of the box.
pub trait ChunkInfoSink {
    /// Capacity hint: up to this many slots may end up set.
    fn reserve(&mut self, capacity: usize);

    /// Grow the bitmap to at least `len` slots, new slots unset.
    fn resize(&mut self, len: usize);

    /// Mark chunk `id`. Only called for `id` below the last `resize` length.
    fn set(&mut self, id: usize, loaded: bool);
}

impl ChunkInfoSink for Vec<bool> {
    fn reserve(&mut self, capacity: usize) {
        Vec::reserve(self, capacity.saturating_sub(self.len()));
    }

    fn resize(&mut self, len: usize) {
        if self.len() < len {
            Vec::resize(self, len, false);
        }
    }

    fn set(&mut self, id: usize, loaded: bool) {
        self[id] = loaded;
    }
}

/// Control handle for one streamed audio file.
pub struct Streamer {
    shared: Arc<Shared>,
    // Held for its drop side effect: cancel + join the worker.
    _loader: Loader,
}

/// Audio handle for one streamed audio file.
///
/// Move this to the audio thread and call [`StreamRenderer::process`] once
/// per output block.
pub struct StreamRenderer {
    shared: Arc<Shared>,
    cursor: PlayCursor,
}

impl Streamer {
    /// Open a streamer over `source` and start its decode worker.
    ///
    /// The initial model is published from the source header before the
    /// worker starts, so queries are valid immediately. Fails on invalid
    /// settings, a degenerate source layout, or thread-spawn failure.
    pub fn open<S: FrameSource>(
        source: S,
        settings: StreamerSettings,
    ) -> StreamResult<(Streamer, StreamRenderer)> {
        let layout = settings.validate()?;
        let header = *source.header();
        if header.channel_count == 0 || header.sample_rate == 0 {
            return Err(crate::error::StreamError::unsupported_layout(format!(
                "{} channels at {} Hz",
                header.channel_count, header.sample_rate
            )));
        }

        let shared = Arc::new(Shared {
            model: ModelStore::new(StreamModel::new(header)),
            flags: SharedFlags::new(),
            layout,
        });
        let loader = Loader::spawn(Box::new(source), Arc::clone(&shared))?;

        let streamer = Streamer {
            shared: Arc::clone(&shared),
            _loader: loader,
        };
        let renderer = StreamRenderer {
            shared,
            cursor: PlayCursor::new(),
        };
        Ok((streamer, renderer))
    }

    /// Request playback from `frame`, rounded down to a block boundary.
    ///
    /// The renderer picks the target up at the start of its next block; a
    /// repeated seek to the same position publishes an identical model.
    pub fn seek(&self, frame: u64) {
        let step = self.shared.layout.block_frames as u64;
        self.shared.model.update_publish(|mut m| {
            m.seek_target = quantize(frame, step);
            m
        });
    }

    /// Header of the opened source.
    pub fn header(&self) -> SourceHeader {
        self.shared.model.read().header
    }

    /// Known total frame count when the source declared or the loader
    /// discovered one, otherwise the loader's running estimate.
    pub fn estimated_frame_count(&self) -> u64 {
        self.shared.model.read().known_or_estimated_frames()
    }

    /// Drive a caller-provided bitmap builder over the loaded chunk ids.
    ///
    /// `reserve` is called once with a capacity hint, `resize` whenever a
    /// larger id requires growing the bitmap, and `set` once per loaded id.
    /// Ids arrive in map order, which is arbitrary.
    pub fn chunk_info(&self, sink: &mut impl ChunkInfoSink) {
        let model = self.shared.model.read_full();
        sink.reserve(model.chunks.len() * 2);
        let mut size = 0usize;
        for (&id, _) in model.chunks.iter() {
            if id >= size {
                size = id + 1;
                sink.resize(size);
            }
            sink.set(id, true);
        }
    }

    /// Whether playback has not yet reported reaching the end.
    pub fn is_playing(&self) -> bool {
        !self.shared.flags.is_finished()
    }

    /// Whether the total length is known, i.e. positions from a seek UI can
    /// be trusted rather than estimated.
    pub fn can_seek(&self) -> bool {
        self.shared.model.read().header.frame_count.is_some()
    }

    /// Last playback position published by the renderer, in source frames.
    pub fn playback_pos(&self) -> f64 {
        self.shared.flags.position()
    }

    /// Ask the renderer to publish its position at the next block.
    pub fn request_playback_pos(&self) {
        self.shared.flags.request_position();
    }
}

impl StreamRenderer {
    /// Render one block of stereo output.
    ///
    /// `host_rate` is the output sample rate; both slices must be exactly
    /// one block long. Realtime-safe: one snapshot load, bounded work, no
    /// allocation. Once the end of the stream has been reached this writes
    /// nothing.
    pub fn process(&mut self, host_rate: f64, out: [&mut [f32]; 2]) {
        debug_assert_eq!(out[0].len(), self.shared.layout.block_frames);
        debug_assert_eq!(out[1].len(), self.shared.layout.block_frames);

        let snapshot = self.shared.model.read();
        engine::render_block(
            &mut self.cursor,
            &self.shared.flags,
            &snapshot,
            self.shared.layout,
            host_rate,
            out,
        );
    }
}
