//! Cross-thread state: the snapshot-published model register and the
//! advisory atomic flags.
//!
//! Two channels exist between the realtime renderer, the loader worker and
//! control threads, and nothing else:
//!
//! - [`ModelStore`], a read-copy-update register over [`StreamModel`]. Reads
//!   are wait-free and return a structurally-shared snapshot that stays
//!   valid for as long as the caller holds it; writers are serialized and
//!   publish whole new values.
//! - [`SharedFlags`], three relaxed atomics. They are advisory (a stale
//!   read is always acceptable) and carry no lock or ordering semantics;
//!   chunk visibility rides on model publication instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::model::{ChunkLayout, StreamModel};

/// Single-writer-at-a-time, many-reader snapshot register for the model.
pub struct ModelStore {
    current: ArcSwap<StreamModel>,
    /// Serializes updaters; readers never take it.
    writer: Mutex<()>,
}

impl ModelStore {
    pub fn new(initial: StreamModel) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            writer: Mutex::new(()),
        }
    }

    /// Wait-free snapshot, safe from any thread including the audio thread.
    ///
    /// The returned guard borrows the current snapshot without touching the
    /// reference count on the hot path; hold it for at most one block.
    #[inline]
    pub fn read(&self) -> arc_swap::Guard<Arc<StreamModel>> {
        self.current.load()
    }

    /// Owned snapshot for non-realtime callers.
    pub fn read_full(&self) -> Arc<StreamModel> {
        self.current.load_full()
    }

    /// Replace the stored model with `f(current)` and return the new value.
    ///
    /// Concurrent updaters are serialized; readers observe either the pre-
    /// or the post-update snapshot, never a torn composite.
    pub fn update_publish(
        &self,
        f: impl FnOnce(StreamModel) -> StreamModel,
    ) -> Arc<StreamModel> {
        let _guard = self.writer.lock();
        let next = Arc::new(f(StreamModel::clone(&self.current.load())));
        self.current.store(Arc::clone(&next));
        next
    }
}

/// Lock-free signalling between the renderer and the other threads.
///
/// All accesses use relaxed ordering: the position report is a heuristic
/// input to the loader, and a one-block lag on `finished` is harmless.
pub struct SharedFlags {
    position_requested: AtomicBool,
    finished: AtomicBool,
    /// f64 playback position, stored as its bit pattern.
    reported_position: AtomicU64,
}

impl SharedFlags {
    pub fn new() -> Self {
        Self {
            position_requested: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            reported_position: AtomicU64::new(0.0f64.to_bits()),
        }
    }

    /// Ask the renderer to publish its position at the next block.
    #[inline]
    pub fn request_position(&self) {
        self.position_requested.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn position_requested(&self) -> bool {
        self.position_requested.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn clear_position_request(&self) {
        self.position_requested.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn store_position(&self, pos: f64) {
        self.reported_position.store(pos.to_bits(), Ordering::Relaxed);
    }

    /// Last position the renderer published.
    #[inline]
    pub fn position(&self) -> f64 {
        f64::from_bits(self.reported_position.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set_finished(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

impl Default for SharedFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the control handle, the renderer and the loader share.
pub(crate) struct Shared {
    pub model: ModelStore,
    pub flags: SharedFlags,
    pub layout: ChunkLayout,
}
