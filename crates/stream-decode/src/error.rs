//! Crate error type.
//!
//! This module defines [`StreamError`] and the [`StreamResult`] alias used
//! across the crate. End of stream is deliberately *not* an error anywhere:
//! the loader records it in the model, and the renderer never sees errors at
//! all.

use std::io;

/// Result type used by this crate.
pub type StreamResult<T> = Result<T, StreamError>;

/// Unified error type for the `stream-decode` crate.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Invalid streamer settings supplied by the caller.
    #[error("invalid settings: {0}")]
    InvalidSettings(&'static str),

    /// I/O error.
    ///
    /// Uses the concrete `std::io::Error` to preserve error kinds and sources.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The container could not be probed or a decoder could not be built.
    #[error("failed to probe source: {0}")]
    Probe(String),

    /// The source contains no decodable audio track.
    #[error("no decodable audio track")]
    NoAudioTrack,

    /// The source declares a layout the streamer cannot serve.
    #[error("unsupported stream layout: {0}")]
    UnsupportedLayout(String),
}

impl StreamError {
    /// Convenience helper for probe failures.
    ///
    /// Intended for call-sites like: `.map_err(StreamError::probe)?;`
    pub fn probe<E>(e: E) -> Self
    where
        E: std::fmt::Display,
    {
        StreamError::Probe(e.to_string())
    }

    /// Convenience helper for layout rejections.
    pub fn unsupported_layout(msg: impl Into<String>) -> Self {
        StreamError::UnsupportedLayout(msg.into())
    }
}
