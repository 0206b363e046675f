use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use camstream_camera::{DirectoryCamera, HostCamera, SyntheticCamera, SyntheticConfig};
use camstream_core::{CameraError, FirmwareConfig, FirmwareVariant, Resolution};
use camstream_server::{bind, serve, AppState, BootError};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug, Clone)]
#[command(name = "camstream", about = "Camera snapshot and MJPEG stream server", version)]
struct Args {
    /// Address the HTTP server listens on
    #[arg(long, env = "CAMSTREAM_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// JSON configuration file (flags below override it)
    #[arg(long, env = "CAMSTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Which page to serve: "snapshot" or "stream"
    #[arg(long, env = "CAMSTREAM_VARIANT", value_parser = parse_variant)]
    variant: Option<FirmwareVariant>,

    /// Stream frame rate
    #[arg(long, env = "CAMSTREAM_FPS")]
    fps: Option<u32>,

    /// Maximum bytes per stream write
    #[arg(long, env = "CAMSTREAM_CHUNK_SIZE")]
    chunk_size: Option<usize>,

    /// Resolution the camera starts at (lo, mid, hi)
    #[arg(long, env = "CAMSTREAM_RESOLUTION")]
    resolution: Option<Resolution>,

    /// Replay JPEG files from this directory instead of the test pattern
    #[arg(long, env = "CAMSTREAM_CAMERA_DIR")]
    camera_dir: Option<PathBuf>,

    /// Fail every capture after this many (synthetic camera only)
    #[arg(long, env = "CAMSTREAM_FAIL_AFTER")]
    fail_after: Option<u64>,

    /// Reject resolution changes (synthetic camera only)
    #[arg(long, env = "CAMSTREAM_FAIL_RESOLUTION_CHANGE")]
    fail_resolution_change: bool,

    /// Delay before rebooting after a fatal error
    #[arg(long, env = "CAMSTREAM_RESTART_DELAY_MS")]
    restart_delay_ms: Option<u64>,
}

fn parse_variant(s: &str) -> Result<FirmwareVariant, String> {
    match s.to_ascii_lowercase().as_str() {
        "snapshot" | "poll" => Ok(FirmwareVariant::Snapshot),
        "stream" => Ok(FirmwareVariant::Stream),
        other => Err(format!("unknown variant '{other}' (expected snapshot or stream)")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,camstream_server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    tracing::info!(
        variant = ?config.variant,
        fps = config.stream.fps,
        "camstream starting..."
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = run(args, config) => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// File first, then flags and environment on top.
fn load_config(args: &Args) -> anyhow::Result<FirmwareConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => FirmwareConfig::default(),
    };

    if let Some(variant) = args.variant {
        config.variant = variant;
    }
    if let Some(fps) = args.fps {
        config.stream.fps = fps;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.stream.chunk_size = chunk_size;
    }
    if let Some(resolution) = args.resolution {
        config.camera.initial_resolution = resolution;
    }
    if let Some(delay) = args.restart_delay_ms {
        config.restart_delay_ms = delay;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Boot, serve, and boot again after any fatal error.
async fn run(args: Args, config: FirmwareConfig) {
    let args = &args;
    let config = &config;
    restart_loop(config.restart_delay(), move || async move {
        let (listener, state) = boot(args, config).await.context("boot failed")?;
        announce(args, config);
        serve(listener, state).await.context("HTTP server error")
    })
    .await
}

/// Run `attempt` forever, waiting `delay` after each failure or exit.
async fn restart_loop<F, Fut>(delay: Duration, mut attempt: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    loop {
        if let Err(e) = attempt().await {
            tracing::error!("{:#}", e);
        }
        tracing::warn!("Restarting in {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

fn announce(args: &Args, config: &FirmwareConfig) {
    let page = match config.variant {
        FirmwareVariant::Snapshot => "snapshot page",
        FirmwareVariant::Stream => "stream page",
    };
    tracing::info!("🚀 camstream ready ({page})");
    tracing::info!("   Index:  http://{}/", args.bind);
    tracing::info!("   Frame:  http://{}/cam-lo.jpg", args.bind);
    if config.variant.serves_stream() {
        tracing::info!("   Stream: http://{}/stream", args.bind);
    }
}

async fn boot(
    args: &Args,
    config: &FirmwareConfig,
) -> Result<(TcpListener, AppState<HostCamera>), BootError> {
    let camera_args = args.clone();
    let camera_config = config.clone();
    let camera = tokio::task::spawn_blocking(move || open_camera(&camera_args, &camera_config))
        .await
        .map_err(|e| CameraError::Init(e.to_string()))??;

    let listener = bind(args.bind).await?;
    Ok((listener, AppState::new(camera, config)))
}

fn open_camera(args: &Args, config: &FirmwareConfig) -> Result<HostCamera, CameraError> {
    match &args.camera_dir {
        Some(dir) => Ok(DirectoryCamera::begin(dir, &config.camera)?.into()),
        None => {
            let camera = SyntheticCamera::begin(SyntheticConfig {
                camera: config.camera.clone(),
                fail_after: args.fail_after,
                fail_resolution_change: args.fail_resolution_change,
                ..SyntheticConfig::default()
            })?;
            Ok(camera.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::sync::{Arc, Mutex};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"variant":"snapshot","stream":{"fps":10}}"#).unwrap();

        let args = Args::parse_from([
            "camstream",
            "--config",
            path.to_str().unwrap(),
            "--chunk-size",
            "512",
        ]);
        let config = load_config(&args).unwrap();

        assert_eq!(config.variant, FirmwareVariant::Snapshot);
        assert_eq!(config.stream.fps, 10);
        assert_eq!(config.stream.chunk_size, 512);
    }

    #[tokio::test]
    async fn test_boot_with_empty_camera_dir_is_camera_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::parse_from([
            "camstream",
            "--bind",
            "127.0.0.1:0",
            "--camera-dir",
            dir.path().to_str().unwrap(),
        ]);
        let config = load_config(&args).unwrap();

        match boot(&args, &config).await {
            Err(BootError::Camera(CameraError::Init(_))) => {}
            Err(e) => panic!("expected camera error, got {e}"),
            Ok(_) => panic!("boot should fail without frames"),
        }
    }

    #[tokio::test]
    async fn test_boot_with_taken_port_is_network_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap().to_string();
        let args = Args::parse_from(["camstream", "--bind", addr.as_str()]);
        let config = load_config(&args).unwrap();

        match boot(&args, &config).await {
            Err(BootError::Network { .. }) => {}
            Err(e) => panic!("expected network error, got {e}"),
            Ok(_) => panic!("port is already taken"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_loop_boots_again_after_delay() {
        let started = tokio::time::Instant::now();
        let attempts = Arc::new(Mutex::new(Vec::new()));

        let recorded = attempts.clone();
        let supervisor = tokio::spawn(restart_loop(Duration::from_secs(5), move || {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(started.elapsed());
                Err(anyhow::anyhow!("camera unavailable"))
            }
        }));

        tokio::time::sleep(Duration::from_secs(11)).await;
        supervisor.abort();

        assert_eq!(
            *attempts.lock().unwrap(),
            vec![
                Duration::ZERO,
                Duration::from_secs(5),
                Duration::from_secs(10)
            ]
        );
    }

    #[test]
    fn test_rejects_bad_fps() {
        let args = Args::parse_from(["camstream", "--fps", "0"]);
        assert!(load_config(&args).is_err());
    }
}
