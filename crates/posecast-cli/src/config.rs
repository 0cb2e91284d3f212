use clap::Parser;
use posecast_core::{JointBinding, JOINT_TABLE, POSE_MODEL_FILE};
use posecast_hw::VideoInput;
use posecast_osc::{DEFAULT_HOST, DEFAULT_PORT};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SKELETON_ID: i32 = 1;
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = posecast_core::landmarker::DEFAULT_MIN_DETECTION_CONFIDENCE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("min detection confidence must be within 0.0..=1.0, got {0}")]
    InvalidConfidence(f32),
}

/// Command-line surface of the live tracker.
#[derive(Parser, Debug)]
#[command(
    name = "posecast",
    about = "Track body landmarks from a camera or video and send joints over OSC"
)]
pub struct TrackerArgs {
    /// Video capture index (webcam, external cam, etc.), video file, image or image directory
    #[arg(long = "input", value_name = "VIDEO_INPUT")]
    pub input: VideoInput,

    /// Flip the image horizontally for a selfie-view display [default: 1]
    #[arg(long, value_name = "FLIP", value_parser = clap::value_parser!(u8).range(0..=1))]
    pub flip: Option<u8>,

    /// Receiver IP address [default: 127.0.0.1]
    #[arg(long = "ipaddress", value_name = "IP_ADDRESS")]
    pub ip_address: Option<IpAddr>,

    /// Receiver port [default: 57120]
    #[arg(long, value_name = "IP_PORT")]
    pub port: Option<u16>,

    /// Skeleton id announced to the receiver [default: 1]
    #[arg(long = "skeleton-id", value_name = "ID")]
    pub skeleton_id: Option<i32>,

    /// Path to the BlazePose landmark ONNX model
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Minimum pose presence score for a frame to count as a detection [default: 0.5]
    #[arg(long = "min-detection-confidence", value_name = "SCORE")]
    pub min_detection_confidence: Option<f32>,

    /// TOML file with [osc] and [model] defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the latest annotated frame to this image file
    #[arg(long, value_name = "PATH")]
    pub preview: Option<PathBuf>,
}

/// Optional TOML configuration file.
///
/// ```toml
/// [osc]
/// host = "192.168.1.20"
/// port = 57120
/// skeleton_id = 1
///
/// [model]
/// path = "/opt/models/pose_landmark_full.onnx"
/// min_detection_confidence = 0.5
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub osc: OscSection,
    #[serde(default)]
    pub model: ModelSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OscSection {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub skeleton_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    pub path: Option<PathBuf>,
    pub min_detection_confidence: Option<f32>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Immutable settings for one tracker run.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub input: VideoInput,
    pub flip: bool,
    pub target: SocketAddr,
    pub skeleton_id: i32,
    pub model_path: PathBuf,
    pub min_detection_confidence: f32,
    pub joints: &'static [JointBinding],
    pub preview: Option<PathBuf>,
}

impl TrackerConfig {
    /// Merge command-line flags over the config file over built-in defaults.
    pub fn resolve(args: TrackerArgs, file: ConfigFile) -> Result<Self, ConfigError> {
        let host = args.ip_address.or(file.osc.host).unwrap_or(IpAddr::V4(DEFAULT_HOST));
        let port = args.port.or(file.osc.port).unwrap_or(DEFAULT_PORT);

        let min_detection_confidence = args
            .min_detection_confidence
            .or(file.model.min_detection_confidence)
            .unwrap_or(DEFAULT_MIN_DETECTION_CONFIDENCE);
        if !(0.0..=1.0).contains(&min_detection_confidence) {
            return Err(ConfigError::InvalidConfidence(min_detection_confidence));
        }

        Ok(Self {
            input: args.input,
            flip: args.flip.unwrap_or(1) != 0,
            target: SocketAddr::new(host, port),
            skeleton_id: args
                .skeleton_id
                .or(file.osc.skeleton_id)
                .unwrap_or(DEFAULT_SKELETON_ID),
            model_path: args
                .model
                .or(file.model.path)
                .unwrap_or_else(default_model_path),
            min_detection_confidence,
            joints: &JOINT_TABLE,
            preview: args.preview,
        })
    }
}

/// `pose_landmark_full.onnx` inside the default model directory.
pub fn default_model_path() -> PathBuf {
    posecast_core::default_model_dir().join(POSE_MODEL_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> TrackerArgs {
        let mut argv = vec!["posecast"];
        argv.extend_from_slice(extra);
        TrackerArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::resolve(args(&["--input", "0"]), ConfigFile::default()).unwrap();
        assert_eq!(config.input, VideoInput::Device(0));
        assert!(config.flip);
        assert_eq!(config.target, "127.0.0.1:57120".parse().unwrap());
        assert_eq!(config.skeleton_id, 1);
        assert_eq!(config.min_detection_confidence, 0.5);
        assert_eq!(config.joints.len(), 18);
        assert!(config.model_path.ends_with(POSE_MODEL_FILE));
        assert!(config.preview.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let config = TrackerConfig::resolve(
            args(&[
                "--input", "dance.mp4", "--flip", "0", "--ipaddress", "10.0.0.5", "--port", "9000",
            ]),
            ConfigFile::default(),
        )
        .unwrap();
        assert_eq!(config.input, VideoInput::Path(PathBuf::from("dance.mp4")));
        assert!(!config.flip);
        assert_eq!(config.target, "10.0.0.5:9000".parse().unwrap());
    }

    #[test]
    fn test_input_is_required() {
        assert!(TrackerArgs::try_parse_from(["posecast"]).is_err());
    }

    #[test]
    fn test_flip_rejects_out_of_range() {
        assert!(TrackerArgs::try_parse_from(["posecast", "--input", "0", "--flip", "2"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let file = ConfigFile::parse(
            r#"
            [osc]
            host = "192.168.1.20"
            port = 6000
            skeleton_id = 4

            [model]
            path = "/opt/models/pose.onnx"
            "#,
        )
        .unwrap();

        let config = TrackerConfig::resolve(args(&["--input", "1", "--port", "7000"]), file).unwrap();
        assert_eq!(config.target, "192.168.1.20:7000".parse().unwrap());
        assert_eq!(config.skeleton_id, 4);
        assert_eq!(config.model_path, PathBuf::from("/opt/models/pose.onnx"));
    }

    #[test]
    fn test_config_file_rejects_unknown_keys() {
        assert!(ConfigFile::parse("[osc]\nhots = \"127.0.0.1\"\n").is_err());
    }

    #[test]
    fn test_invalid_confidence() {
        let result = TrackerConfig::resolve(
            args(&["--input", "0", "--min-detection-confidence", "1.5"]),
            ConfigFile::default(),
        );
        assert!(matches!(result, Err(ConfigError::InvalidConfidence(_))));
    }

    #[test]
    fn test_load_missing_config_file() {
        let result = ConfigFile::load(Path::new("/nonexistent/posecast.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
