//! Symphonia-backed frame source.
//!
//! Bridges a real audio file (WAV/FLAC/MP3/...) into the [`FrameSource`]
//! seam: probe the container once at open, then serve interleaved f32
//! frames at arbitrary frame positions.
//!
//! Container seeks land on packet boundaries, which for most codecs is
//! *before* the requested frame; the source decodes forward and drops
//! frames until the exact position, so `read_frames` after `seek(n)`
//! always starts at frame `n`. Sequential reads (the only pattern the
//! loader uses for MP3) skip the container seek entirely.
//!
//! Byte progress for frame-count estimation is observed by a counting
//! wrapper around the underlying file, since the format reader does its
//! own buffered reading.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_MP3};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{StreamError, StreamResult};
use crate::model::{SourceFormat, SourceHeader};
use crate::source::FrameSource;

/// Frame source decoding a local audio file through Symphonia.
pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    header: SourceHeader,
    bytes_read: Arc<AtomicU64>,
    /// Decoded interleaved samples not yet handed out.
    pending: Vec<f32>,
    pending_offset: usize,
    /// Source frame index of the next frame `read_frames` will deliver.
    next_frame: u64,
    /// Frames still to drop after a coarse container seek.
    skip_frames: u64,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl SymphoniaSource {
    /// Open and probe an audio file.
    pub fn open<P: AsRef<Path>>(path: P) -> StreamResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let byte_len = file.metadata()?.len();
        let bytes_read = Arc::new(AtomicU64::new(0));

        let counting = CountingSource {
            inner: file,
            byte_len,
            bytes_read: Arc::clone(&bytes_read),
        };
        let mss = MediaSourceStream::new(Box::new(counting), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(StreamError::probe)?;
        let format = probed.format;

        let (track_id, params) = {
            let track = format.default_track().ok_or(StreamError::NoAudioTrack)?;
            (track.id, track.codec_params.clone())
        };

        let channel_count = params.channels.map(|c| c.count()).unwrap_or(0) as u16;
        let sample_rate = params.sample_rate.unwrap_or(0);
        if channel_count == 0 || sample_rate == 0 {
            return Err(StreamError::unsupported_layout(format!(
                "{channel_count} channels at {sample_rate} Hz"
            )));
        }

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(StreamError::probe)?;

        let header = SourceHeader {
            channel_count,
            sample_rate,
            frame_count: params.n_frames,
            byte_len,
            format: if params.codec == CODEC_TYPE_MP3 {
                SourceFormat::Mp3
            } else {
                SourceFormat::Other
            },
        };
        tracing::debug!(
            path = %path.display(),
            channels = channel_count,
            sample_rate,
            frames = ?header.frame_count,
            "opened source"
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            header,
            bytes_read,
            pending: Vec::new(),
            pending_offset: 0,
            next_frame: 0,
            skip_frames: 0,
            sample_buf: None,
        })
    }

    /// Decode packets until at least one undelivered frame is pending.
    /// Returns false at end of stream.
    fn decode_more(&mut self) -> io::Result<bool> {
        let channels = self.header.channel_count as usize;
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(false),
                Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e.to_string())),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(buf) => buf,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!("skipping undecodable packet: {e}");
                    continue;
                }
                Err(SymphoniaError::IoError(e))
                    if e.kind() == io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(false);
                }
                Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e.to_string())),
            };
            let frames = decoded.frames();
            if frames == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let frame_capacity = decoded.capacity() as u64;
            let buf = match &mut self.sample_buf {
                Some(b) if b.capacity() >= frames * channels => b,
                slot => slot.insert(SampleBuffer::new(frame_capacity, spec)),
            };
            buf.copy_interleaved_ref(decoded);

            let mut samples = buf.samples();
            if self.skip_frames > 0 {
                let drop_frames = (self.skip_frames).min(frames as u64) as usize;
                self.skip_frames -= drop_frames as u64;
                samples = &samples[drop_frames * channels..];
                if samples.is_empty() {
                    continue;
                }
            }

            self.pending.clear();
            self.pending_offset = 0;
            self.pending.extend_from_slice(samples);
            return Ok(true);
        }
    }
}

impl FrameSource for SymphoniaSource {
    fn header(&self) -> &SourceHeader {
        &self.header
    }

    fn seek(&mut self, frame: u64) -> io::Result<()> {
        // Sequential reads continue from the pending decode state.
        if frame == self.next_frame {
            return Ok(());
        }

        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: frame,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        self.decoder.reset();
        self.pending.clear();
        self.pending_offset = 0;
        // The container lands at or before the requested frame; drop the
        // difference while decoding forward.
        self.skip_frames = frame.saturating_sub(seeked.actual_ts);
        self.next_frame = frame;
        Ok(())
    }

    fn read_frames(&mut self, interleaved: &mut [f32]) -> io::Result<usize> {
        let channels = self.header.channel_count as usize;
        let capacity_frames = interleaved.len() / channels;
        let mut filled_frames = 0usize;

        while filled_frames < capacity_frames {
            if self.pending_offset >= self.pending.len() && !self.decode_more()? {
                break;
            }

            let avail = self.pending.len() - self.pending_offset;
            let want = (capacity_frames - filled_frames) * channels;
            let n = avail.min(want);
            let dst = filled_frames * channels;
            interleaved[dst..dst + n]
                .copy_from_slice(&self.pending[self.pending_offset..self.pending_offset + n]);
            self.pending_offset += n;
            filled_frames += n / channels;
        }

        self.next_frame += filled_frames as u64;
        Ok(filled_frames)
    }

    fn total_bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }
}

/// `MediaSource` wrapper that counts bytes consumed from the file.
struct CountingSource {
    inner: File,
    byte_len: u64,
    bytes_read: Arc<AtomicU64>,
}

impl Read for CountingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

impl Seek for CountingSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl MediaSource for CountingSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.byte_len)
    }
}
