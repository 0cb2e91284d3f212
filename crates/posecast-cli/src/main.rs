use anyhow::{Context, Result};
use clap::Parser;
use posecast_cli::{ConfigFile, StopReason, TrackerArgs, TrackerConfig};
use std::sync::atomic::Ordering;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = TrackerArgs::parse();
    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let config = TrackerConfig::resolve(args, file)?;

    tracing::info!(
        input = %config.input,
        target = %config.target,
        skeleton_id = config.skeleton_id,
        flip = config.flip,
        model = %config.model_path.display(),
        "posecast starting"
    );

    let tracker = posecast_cli::start(&config).context("failed to start tracker")?;

    let cancel = tracker.cancel_handle();
    ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    let summary = tracker.run();
    tracing::info!(
        frames = summary.stats.frames,
        without_body = summary.stats.frames_without_body,
        sent = summary.stats.messages_sent,
        send_failures = summary.stats.send_failures,
        retries = summary.stats.capture_retries,
        "done"
    );

    if let StopReason::CaptureFailed(reason) = summary.stop_reason {
        tracing::warn!(%reason, "input ended on a read error");
    }
    Ok(())
}
