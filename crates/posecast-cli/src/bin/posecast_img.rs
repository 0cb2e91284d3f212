use anyhow::{Context, Result};
use clap::Parser;
use posecast_cli::{annotate_files, AnnotateOutcome};
use posecast_core::{OverlayRenderer, PoseLandmarker};
use std::path::PathBuf;

/// Detect the body pose in still images and write annotated copies
/// next to each input as `<name>_annotated.<ext>`.
#[derive(Parser)]
#[command(name = "posecast-img")]
struct Cli {
    /// Images to annotate
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,

    /// Path to the BlazePose landmark ONNX model
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Minimum pose presence score for a detection
    #[arg(long = "min-detection-confidence", value_name = "SCORE", default_value_t = posecast_cli::config::DEFAULT_MIN_DETECTION_CONFIDENCE)]
    min_detection_confidence: f32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let model = cli.model.unwrap_or_else(posecast_cli::config::default_model_path);

    let mut provider = PoseLandmarker::load(&model.to_string_lossy(), cli.min_detection_confidence)
        .context("failed to load landmark model")?;
    let renderer = OverlayRenderer::default();

    for report in annotate_files(&cli.images, &mut provider, &renderer) {
        match report.outcome {
            AnnotateOutcome::Written { output, nose } => {
                if let Some(nose) = nose {
                    println!(
                        "{}: nose coordinates ({}, {}, {})",
                        report.input.display(),
                        nose.x,
                        nose.y,
                        nose.z
                    );
                }
                println!("wrote {}", output.display());
            }
            AnnotateOutcome::Unreadable { reason } => {
                eprintln!("error: cannot read {}: {reason}", report.input.display());
            }
            AnnotateOutcome::WriteFailed { output, reason } => {
                eprintln!("error: cannot write {}: {reason}", output.display());
            }
        }
    }

    Ok(())
}
