//! The frame-source seam: where decoded audio enters the streamer.
//!
//! The loader is backend-agnostic; anything that can hand out interleaved
//! f32 frames at arbitrary frame positions can feed a streamer. The crate
//! ships one real implementation, [`SymphoniaSource`], behind the
//! `symphonia` feature; tests provide deterministic in-memory sources.

use std::io;

use crate::model::SourceHeader;

#[cfg(feature = "symphonia")]
mod symphonia;

#[cfg(feature = "symphonia")]
pub use self::symphonia::SymphoniaSource;

/// A seekable source of decoded, interleaved f32 frames.
///
/// Contract:
/// - `header()` is fixed for the lifetime of the source.
/// - `read_frames` fills `interleaved` (whose length must be a multiple of
///   the channel count) from the current position and returns the number of
///   *frames* written. A short count signals end of stream.
/// - `seek` positions the next read at `frame`. Sources without cheap
///   random access should declare it via [`SourceHeader::format`]; the
///   loader will then only ever seek forward sequentially.
/// - `total_bytes_read()` reports cumulative bytes consumed from the
///   underlying stream; the loader uses it to estimate the total frame
///   count while the real one is unknown.
///
/// The source is owned by the streamer's loader for the streamer's
/// lifetime and is never touched from the audio thread.
pub trait FrameSource: Send + 'static {
    fn header(&self) -> &SourceHeader;

    fn seek(&mut self, frame: u64) -> io::Result<()>;

    fn read_frames(&mut self, interleaved: &mut [f32]) -> io::Result<usize>;

    fn total_bytes_read(&self) -> u64;
}
