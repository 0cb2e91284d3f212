//! posecast-cli: wiring for the `posecast` and `posecast-img` binaries.

pub mod annotate;
pub mod config;
pub mod pipeline;

pub use annotate::{annotate_files, annotated_path, AnnotateOutcome, AnnotateReport};
pub use config::{ConfigError, ConfigFile, TrackerArgs, TrackerConfig};
pub use pipeline::{start, PipelineError, RunStats, RunSummary, StopReason, Tracker};
