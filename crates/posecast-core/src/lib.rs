//! posecast-core: Body landmark inference and joint mapping.
//!
//! Runs the BlazePose landmark model via ONNX Runtime, maps its keypoints
//! onto the fixed joint vocabulary sent to receivers, and draws skeleton
//! overlays.

pub mod joints;
pub mod landmarker;
pub mod overlay;
pub mod provider;
pub mod types;

use std::path::PathBuf;

pub use joints::{map_joints, JointBinding, JointError, JointName, JointReading, JOINT_TABLE};
pub use landmarker::PoseLandmarker;
pub use overlay::OverlayRenderer;
pub use provider::{LandmarkProvider, ProviderError, Renderer};
pub use types::{Landmark, LandmarkSet, PoseLandmark};

/// File name of the BlazePose full-body landmark model.
pub const POSE_MODEL_FILE: &str = "pose_landmark_full.onnx";

/// Default directory searched for ONNX models.
///
/// `$POSECAST_MODEL_DIR`, else `$XDG_DATA_HOME/posecast/models`,
/// else `~/.local/share/posecast/models`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("POSECAST_MODEL_DIR") {
        return PathBuf::from(dir);
    }
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("posecast/models")
}
