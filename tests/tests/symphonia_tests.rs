//! End-to-end tests over real audio files decoded through Symphonia.
//!
//! The WAV fixture is described as a `SourceHeader` first, serialized from
//! it into a temp directory, and the probed header is asserted against that
//! same value — no binary assets, and 16-bit PCM keeps the assertions
//! sample-accurate.


use std::path::PathBuf;
use std::time::Duration;

use streamer_fixture::{loaded_chunk_count, tone_header, tone_sample, tone_wav_bytes, wait_until};
use stream_decode::{FrameSource, SourceHeader, Streamer, StreamerSettings, SymphoniaSource};

const LOAD_TIMEOUT: Duration = Duration::from_secs(10);
const SAMPLE_RATE: u32 = 44_100;
const FRAMES: u64 = 22_050;

/// Expected decoded f32 value at frame `i` (16-bit PCM scales by 1/32768).
fn expected_sample(header: &SourceHeader, i: u64) -> f32 {
    tone_sample(header, i) as f32 / 32768.0
}

fn write_fixture_wav(dir: &tempfile::TempDir) -> (PathBuf, SourceHeader) {
    let header = tone_header(SAMPLE_RATE, 2, FRAMES);
    let path = dir.path().join("tone.wav");
    std::fs::write(&path, tone_wav_bytes(&header)).expect("write fixture wav");
    (path, header)
}

#[test]
fn wav_header_is_probed() {
    let dir = tempfile::tempdir().unwrap();
    let (path, expected) = write_fixture_wav(&dir);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), expected.byte_len);

    let source = SymphoniaSource::open(&path).unwrap();
    assert_eq!(*source.header(), expected);
}

#[test]
fn read_frames_returns_the_encoded_samples() {
    let dir = tempfile::tempdir().unwrap();
    let (path, header) = write_fixture_wav(&dir);
    let mut source = SymphoniaSource::open(&path).unwrap();

    let mut interleaved = vec![0.0f32; 1024 * 2];
    let n = source.read_frames(&mut interleaved).unwrap();
    assert_eq!(n, 1024);

    for i in 0..64 {
        let expected = expected_sample(&header, i as u64);
        assert!(
            (interleaved[i * 2] - expected).abs() < 1e-4,
            "frame {i}: got {} expected {expected}",
            interleaved[i * 2]
        );
        assert_eq!(interleaved[i * 2], interleaved[i * 2 + 1]);
    }
    assert!(source.total_bytes_read() > 0);
}

#[test]
fn seek_is_sample_accurate() {
    let dir = tempfile::tempdir().unwrap();
    let (path, header) = write_fixture_wav(&dir);
    let mut source = SymphoniaSource::open(&path).unwrap();

    source.seek(1234).unwrap();
    let mut interleaved = vec![0.0f32; 16 * 2];
    let n = source.read_frames(&mut interleaved).unwrap();
    assert_eq!(n, 16);

    for i in 0..16u64 {
        let expected = expected_sample(&header, 1234 + i);
        assert!(
            (interleaved[i as usize * 2] - expected).abs() < 1e-4,
            "frame {}: got {} expected {expected}",
            1234 + i,
            interleaved[i as usize * 2]
        );
    }
}

#[test]
fn short_read_at_the_end_of_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let (path, _header) = write_fixture_wav(&dir);
    let mut source = SymphoniaSource::open(&path).unwrap();

    // 22050 frames total: 22000 leaves 50.
    source.seek(22_000).unwrap();
    let mut interleaved = vec![0.0f32; 100 * 2];
    assert_eq!(source.read_frames(&mut interleaved).unwrap(), 50);
    assert_eq!(source.read_frames(&mut interleaved).unwrap(), 0);
}

#[test]
fn streamer_plays_a_generated_file_to_the_end() {
    let dir = tempfile::tempdir().unwrap();
    let (path, header) = write_fixture_wav(&dir);
    let source = SymphoniaSource::open(&path).unwrap();

    let settings = StreamerSettings::new()
        .with_chunk_frames(4096)
        .with_block_frames(64);
    let (streamer, mut renderer) = Streamer::open(source, settings).unwrap();

    // ceil(22050 / 4096) chunks.
    assert!(wait_until(LOAD_TIMEOUT, || loaded_chunk_count(&streamer) == 6));
    assert_eq!(streamer.estimated_frame_count(), FRAMES);

    let mut left = vec![0.0f32; 64];
    let mut right = vec![0.0f32; 64];

    // First block plays the head of the tone, bit-exact at matching rates.
    renderer.process(SAMPLE_RATE as f64, [&mut left, &mut right]);
    for i in 0..64 {
        let expected = expected_sample(&header, i as u64);
        assert!(
            (left[i] - expected).abs() < 1e-4,
            "frame {i}: got {} expected {expected}",
            left[i]
        );
    }

    // Drive the rest of the file; 22050/64 < 345 blocks.
    let mut blocks = 1;
    while streamer.is_playing() && blocks < 400 {
        renderer.process(SAMPLE_RATE as f64, [&mut left, &mut right]);
        blocks += 1;
    }
    assert!(!streamer.is_playing(), "stream never finished");
}
