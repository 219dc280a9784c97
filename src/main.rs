// Demo runner for the `sage_vision` engine.
//
// Usage:
//   sage_vision demo [minutes]   simulate analytics observations, print the report
//   sage_vision frames [count]   stream synthetic frames through the service, print a snapshot
//
// Set SAGE_CONFIG to a TOML file to override thresholds, and RUST_LOG to tune logging.

use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};
use sage_vision::{Engine, EngineConfig, EngineService, StopFlag, SyntheticFrames, simulate_demo_data};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_DEMO_MINUTES: u32 = 5;
const DEFAULT_FRAME_COUNT: usize = 300;
const FRAME_INTERVAL_MS: i64 = 100;

fn load_config() -> Result<EngineConfig> {
    match env::var("SAGE_CONFIG") {
        Ok(path) => EngineConfig::from_file(&path).with_context(|| format!("loading config from {path}")),
        Err(_) => Ok(EngineConfig::default()),
    }
}

fn stop_on_ctrl_c(stop: StopFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            stop.raise();
        }
    });
}

async fn run_demo(config: EngineConfig, minutes: u32, stop: StopFlag) -> Result<()> {
    let mut engine = Engine::new(config)?;
    let (generated, engine) = tokio::task::spawn_blocking(move || {
        let generated = simulate_demo_data(&mut engine, minutes, &stop);
        (generated, engine)
    })
    .await
    .context("demo simulation task failed")?;
    info!(generated, "demo data ready");
    println!("{}", serde_json::to_string_pretty(&engine.report(1.0))?);
    Ok(())
}

async fn run_frames(config: EngineConfig, count: usize, stop: StopFlag) -> Result<()> {
    let service = EngineService::spawn(Engine::new(config)?);
    let frames = SyntheticFrames::new(42, Utc::now(), Duration::milliseconds(FRAME_INTERVAL_MS)).take(count);

    let processed = service.process_stream(futures::stream::iter(frames), &stop).await?;
    info!(processed, "frame stream finished");

    println!("{}", serde_json::to_string_pretty(&service.snapshot().await)?);
    service.shutdown().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let mode = args.get(1).map(String::as_str).unwrap_or("demo");
    let config = load_config()?;
    let stop = StopFlag::new();
    stop_on_ctrl_c(stop.clone());

    match mode {
        "demo" => {
            let minutes = match args.get(2) {
                Some(raw) => raw.parse().with_context(|| format!("invalid minutes: {raw}"))?,
                None => DEFAULT_DEMO_MINUTES,
            };
            run_demo(config, minutes, stop).await
        }
        "frames" => {
            let count = match args.get(2) {
                Some(raw) => raw.parse().with_context(|| format!("invalid frame count: {raw}"))?,
                None => DEFAULT_FRAME_COUNT,
            };
            run_frames(config, count, stop).await
        }
        other => bail!("unknown mode {other:?}, expected `demo` or `frames`"),
    }
}
