//! Integration tests driving a real `Streamer` over deterministic
//! in-memory sources.
//!
//! These tests exercise the whole loop: loader thread, snapshot
//! publication, realtime rendering and the control surface. Wall-clock
//! waits are bounded polls, never bare sleeps.


use std::time::{Duration, Instant};

use streamer_fixture::{chunk_bitmap, loaded_chunk_count, wait_until, RampSource};
use stream_decode::{Streamer, StreamerSettings};

const LOAD_TIMEOUT: Duration = Duration::from_secs(5);

fn small_settings() -> StreamerSettings {
    StreamerSettings::new()
        .with_chunk_frames(64)
        .with_block_frames(16)
}

#[test]
fn loader_decodes_the_whole_file() {
    let (streamer, _renderer) =
        Streamer::open(RampSource::new(1000, 1), small_settings()).unwrap();

    // 1000 frames over 64-frame chunks: 15 full chunks and a short 16th.
    assert!(wait_until(LOAD_TIMEOUT, || loaded_chunk_count(&streamer) == 16));
    assert!(chunk_bitmap(&streamer).iter().all(|&b| b));
    assert_eq!(streamer.estimated_frame_count(), 1000);
    assert!(streamer.is_playing());
}

#[test]
fn rendered_blocks_match_source_frames() {
    let (streamer, mut renderer) =
        Streamer::open(RampSource::new(256, 2), small_settings()).unwrap();
    assert!(wait_until(LOAD_TIMEOUT, || loaded_chunk_count(&streamer) >= 4));

    let mut left = vec![0.0f32; 16];
    let mut right = vec![0.0f32; 16];
    renderer.process(48_000.0, [&mut left, &mut right]);

    for i in 0..16 {
        assert_eq!(left[i], RampSource::expected_sample(0, i as u64));
        assert_eq!(right[i], RampSource::expected_sample(1, i as u64));
    }
}

#[test]
fn seek_takes_effect_on_the_next_block() {
    let (streamer, mut renderer) =
        Streamer::open(RampSource::new(256, 1), small_settings()).unwrap();
    assert!(wait_until(LOAD_TIMEOUT, || loaded_chunk_count(&streamer) >= 4));

    // 100 quantizes down to the block boundary at 96.
    streamer.seek(100);

    let mut left = vec![0.0f32; 16];
    let mut right = vec![0.0f32; 16];
    renderer.process(48_000.0, [&mut left, &mut right]);
    assert_eq!(left[0], 96.0);
    assert_eq!(left[15], 111.0);

    streamer.request_playback_pos();
    renderer.process(48_000.0, [&mut left, &mut right]);
    assert_eq!(streamer.playback_pos(), 128.0);
}

#[test]
fn mp3_tagged_sources_load_forward_and_discover_their_length() {
    let source = RampSource::new(1000, 1)
        .with_unknown_frame_count()
        .with_mp3_tag();
    let (streamer, _renderer) = Streamer::open(source, small_settings()).unwrap();

    assert!(wait_until(LOAD_TIMEOUT, || loaded_chunk_count(&streamer) == 16));
    // The short final read fixed the real frame count.
    assert_eq!(streamer.header().frame_count, Some(1000));
    assert_eq!(streamer.estimated_frame_count(), 1000);
}

#[test]
fn estimate_tracks_byte_progress_while_the_length_is_unknown() {
    // Slow reads keep the file partially loaded long enough to observe the
    // estimate. Bytes are proportional to frames in this source, so the
    // estimate is exact from the first chunk on.
    let source = RampSource::new(512, 1)
        .with_unknown_frame_count()
        .with_mp3_tag()
        .with_read_delay(Duration::from_millis(15));
    let (streamer, _renderer) = Streamer::open(source, small_settings()).unwrap();

    assert!(wait_until(LOAD_TIMEOUT, || loaded_chunk_count(&streamer) >= 2));
    assert_eq!(streamer.estimated_frame_count(), 512);
}

#[test]
fn reported_position_is_monotonic_within_a_run() {
    let (streamer, mut renderer) =
        Streamer::open(RampSource::new(1024, 1), small_settings()).unwrap();
    assert!(wait_until(LOAD_TIMEOUT, || loaded_chunk_count(&streamer) >= 16));

    let mut left = vec![0.0f32; 16];
    let mut right = vec![0.0f32; 16];
    let mut last = 0.0f64;
    for _ in 0..32 {
        streamer.request_playback_pos();
        renderer.process(48_000.0, [&mut left, &mut right]);
        let pos = streamer.playback_pos();
        assert!(pos >= last, "position went backwards: {pos} < {last}");
        last = pos;
    }
    assert_eq!(last, 512.0);
}

#[test]
fn playback_finishes_exactly_at_the_end() {
    let (streamer, mut renderer) =
        Streamer::open(RampSource::new(64, 1), small_settings()).unwrap();
    assert!(wait_until(LOAD_TIMEOUT, || loaded_chunk_count(&streamer) >= 1));

    let mut left = vec![0.0f32; 16];
    let mut right = vec![0.0f32; 16];
    for _ in 0..4 {
        assert!(streamer.is_playing());
        renderer.process(48_000.0, [&mut left, &mut right]);
    }
    assert!(!streamer.is_playing());

    // A finished renderer leaves the output untouched.
    left.fill(123.0);
    right.fill(123.0);
    renderer.process(48_000.0, [&mut left, &mut right]);
    assert!(left.iter().all(|&s| s == 123.0));
    assert!(right.iter().all(|&s| s == 123.0));
}

#[test]
fn dropping_the_streamer_joins_the_loader_promptly() {
    // A large file with slow reads: the loader would run for minutes if the
    // drop did not cancel it.
    let source = RampSource::new(10_000_000, 1).with_read_delay(Duration::from_millis(10));
    let (streamer, renderer) = Streamer::open(source, small_settings()).unwrap();

    std::thread::sleep(Duration::from_millis(30));
    let start = Instant::now();
    drop(streamer);
    drop(renderer);
    assert!(
        start.elapsed() < Duration::from_secs(1),
        "loader did not stop promptly"
    );
}
