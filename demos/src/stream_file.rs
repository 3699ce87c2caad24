use std::env;
use std::error::Error;
use std::time::{Duration, Instant};

use stream_decode::{FrameSource, Streamer, StreamerSettings, SymphoniaSource};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Output sample rate the fake callback runs at.
const HOST_RATE: f64 = 48_000.0;
const BLOCK_FRAMES: usize = 64;

fn parse_args() -> Option<String> {
    // CLI:
    //   stream_file <PATH>
    env::args().nth(1)
}

/// Render a one-line strip of the loaded chunk map.
fn chunk_strip(streamer: &Streamer, width: usize) -> String {
    let mut bitmap: Vec<bool> = Vec::new();
    streamer.chunk_info(&mut bitmap);
    if bitmap.is_empty() {
        return "-".repeat(width);
    }

    (0..width)
        .map(|cell| {
            let beg = cell * bitmap.len() / width;
            let end = ((cell + 1) * bitmap.len() / width).max(beg + 1);
            if bitmap[beg..end.min(bitmap.len())].iter().all(|&b| b) {
                '#'
            } else {
                '-'
            }
        })
        .collect()
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::default()
                .add_directive("stream_decode=debug".parse()?)
                .add_directive(LevelFilter::INFO.into()),
        )
        .init();

    let Some(path) = parse_args() else {
        eprintln!("usage: stream_file <AUDIO FILE>");
        std::process::exit(2);
    };

    let source = SymphoniaSource::open(&path)?;
    let header = *source.header();
    eprintln!("stream_file (stream-decode)");
    eprintln!("  file:     {path}");
    eprintln!(
        "  source:   {} ch @ {} Hz, {} frames",
        header.channel_count,
        header.sample_rate,
        header
            .frame_count
            .map_or_else(|| "?".to_string(), |n| n.to_string()),
    );

    let (streamer, mut renderer) =
        Streamer::open(source, StreamerSettings::new().with_block_frames(BLOCK_FRAMES))?;

    // Drive the renderer the way an audio driver would: one block per
    // block-duration tick, writing into reused buffers.
    let mut left = vec![0.0f32; BLOCK_FRAMES];
    let mut right = vec![0.0f32; BLOCK_FRAMES];
    let block_period = Duration::from_secs_f64(BLOCK_FRAMES as f64 / HOST_RATE);
    let mut next_block = Instant::now();
    let mut last_report = Instant::now();

    while streamer.is_playing() {
        renderer.process(HOST_RATE, [&mut left, &mut right]);

        if last_report.elapsed() >= Duration::from_millis(500) {
            last_report = Instant::now();
            streamer.request_playback_pos();
            let total = streamer.estimated_frame_count().max(1);
            eprintln!(
                "  [{}] {:6.1}%",
                chunk_strip(&streamer, 50),
                100.0 * streamer.playback_pos() / total as f64,
            );
        }

        next_block += block_period;
        if let Some(sleep) = next_block.checked_duration_since(Instant::now()) {
            std::thread::sleep(sleep);
        }
    }

    eprintln!("  done.");
    Ok(())
}
