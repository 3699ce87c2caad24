//! Decode-ahead streaming playback for audio files.
//!
//! A [`Streamer`] lets a realtime audio callback play back a possibly-large
//! audio file: a background worker decodes the file into fixed-size,
//! immutable chunks and publishes them through a snapshot register, while
//! the [`StreamRenderer`] reads one consistent snapshot per block and never
//! blocks, locks or allocates.
//!
//! The implementation details live in dedicated modules; this file only
//! wires modules and re-exports.

mod engine;
mod error;
mod loader;
mod model;
mod settings;
mod shared;
mod streamer;

pub mod source;

// Public API re-exports.
pub use crate::error::{StreamError, StreamResult};
pub use crate::model::{SourceFormat, SourceHeader};
pub use crate::settings::StreamerSettings;
pub use crate::source::FrameSource;
pub use crate::streamer::{ChunkInfoSink, StreamRenderer, Streamer};

#[cfg(feature = "symphonia")]
pub use crate::source::SymphoniaSource;
