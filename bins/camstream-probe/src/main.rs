use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use camstream_client::{FrameReader, JpegFrame, ReconnectPolicy, Source, DEFAULT_URL};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "camstream-probe",
    about = "Read frames from a camstream device and report throughput",
    version
)]
struct Args {
    /// Device URL. A bare address gets /stream appended; .jpg URLs are polled.
    #[arg(long, env = "STREAM_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Stop after this many seconds (0 = until the device stops answering)
    #[arg(long, default_value_t = 10)]
    duration: u64,

    /// Save every frame as a numbered .jpg in this directory
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Exit on the first error instead of reconnecting
    #[arg(long)]
    no_reconnect: bool,

    /// Seconds to wait before reconnecting
    #[arg(long, default_value_t = 2)]
    reconnect_delay: u64,
}

/// Running totals for the report.
#[derive(Debug, Default)]
struct Stats {
    frames: u64,
    bytes: u64,
    first: Option<Instant>,
    last: Option<Instant>,
}

impl Stats {
    fn record(&mut self, frame: &JpegFrame) {
        self.frames += 1;
        self.bytes += frame.len() as u64;
        self.first.get_or_insert(frame.received_at);
        self.last = Some(frame.received_at);
    }

    fn fps(&self) -> f64 {
        match (self.first, self.last) {
            (Some(first), Some(last)) if self.frames > 1 => {
                let secs = last.duration_since(first).as_secs_f64();
                if secs > 0.0 {
                    (self.frames - 1) as f64 / secs
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    fn average_size(&self) -> u64 {
        self.bytes.checked_div(self.frames).unwrap_or(0)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let source = Source::parse(&args.url)?;
    let policy = if args.no_reconnect {
        ReconnectPolicy::disabled()
    } else {
        ReconnectPolicy {
            delay: Duration::from_secs(args.reconnect_delay),
            ..ReconnectPolicy::default()
        }
    };

    if let Some(dir) = &args.save_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    tracing::info!(url = %source.url(), polling = source.is_polling(), "probing device");

    let deadline = (args.duration > 0).then(|| Instant::now() + Duration::from_secs(args.duration));
    let mut stats = Stats::default();

    let mut reader = FrameReader::new(source, policy);
    if let Some(deadline) = deadline {
        reader = reader.until(deadline);
    }

    for result in reader {
        let frame = match result {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Read failed: {}", e);
                break;
            }
        };

        if stats.frames == 0 {
            tracing::info!(bytes = frame.len(), "first frame received");
        }
        if let Some(dir) = &args.save_dir {
            save_frame(dir, stats.frames, &frame)?;
        }
        stats.record(&frame);
    }

    tracing::info!(
        frames = stats.frames,
        fps = %format_args!("{:.1}", stats.fps()),
        avg_bytes = stats.average_size(),
        "probe finished"
    );
    Ok(())
}

fn save_frame(dir: &Path, index: u64, frame: &JpegFrame) -> anyhow::Result<()> {
    let path = dir.join(format!("frame-{index:05}.jpg"));
    std::fs::write(&path, &frame.data).with_context(|| format!("writing {}", path.display()))
}
