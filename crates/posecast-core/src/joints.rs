//! Named skeletal joints and their static mapping onto BlazePose landmarks.
//!
//! The receiver understands a fixed vocabulary of 18 joints. Each one is
//! looked up directly from the model's landmark array; no interpolation,
//! unit conversion or smoothing is applied.

use crate::types::{Landmark, LandmarkSet, PoseLandmark};
use std::fmt;
use thiserror::Error;

/// Semantic joint labels understood by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointName {
    Head,
    Neck,
    LeftEar,
    RightEar,
    RightShoulder,
    RightElbow,
    LeftShoulder,
    LeftElbow,
    RightHip,
    RightKnee,
    RightAnkle,
    RightFoot,
    LeftHip,
    LeftKnee,
    LeftAnkle,
    LeftFoot,
    RightHand,
    LeftHand,
}

impl JointName {
    /// Wire name sent in `/joint` messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            JointName::Head => "head",
            JointName::Neck => "neck",
            JointName::LeftEar => "l_ear",
            JointName::RightEar => "r_ear",
            JointName::RightShoulder => "r_shoulder",
            JointName::RightElbow => "r_elbow",
            JointName::LeftShoulder => "l_shoulder",
            JointName::LeftElbow => "l_elbow",
            JointName::RightHip => "r_hip",
            JointName::RightKnee => "r_knee",
            JointName::RightAnkle => "r_ankle",
            JointName::RightFoot => "r_foot",
            JointName::LeftHip => "l_hip",
            JointName::LeftKnee => "l_knee",
            JointName::LeftAnkle => "l_ankle",
            JointName::LeftFoot => "l_foot",
            JointName::RightHand => "r_hand",
            JointName::LeftHand => "l_hand",
        }
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the joint table: which landmark feeds which joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointBinding {
    pub joint: JointName,
    pub landmark: PoseLandmark,
}

const fn bind(joint: JointName, landmark: PoseLandmark) -> JointBinding {
    JointBinding { joint, landmark }
}

/// Number of joints emitted per frame.
pub const JOINT_COUNT: usize = 18;

/// Joint table in emission order.
///
/// `Neck` shares the nose landmark with `Head`: BlazePose has no neck point
/// and receivers expect both names.
pub const JOINT_TABLE: [JointBinding; JOINT_COUNT] = [
    bind(JointName::Head, PoseLandmark::Nose),
    bind(JointName::Neck, PoseLandmark::Nose),
    bind(JointName::LeftEar, PoseLandmark::LeftEar),
    bind(JointName::RightEar, PoseLandmark::RightEar),
    bind(JointName::RightShoulder, PoseLandmark::RightShoulder),
    bind(JointName::RightElbow, PoseLandmark::RightElbow),
    bind(JointName::LeftShoulder, PoseLandmark::LeftShoulder),
    bind(JointName::LeftElbow, PoseLandmark::LeftElbow),
    bind(JointName::RightHip, PoseLandmark::RightHip),
    bind(JointName::RightKnee, PoseLandmark::RightKnee),
    bind(JointName::RightAnkle, PoseLandmark::RightAnkle),
    bind(JointName::RightFoot, PoseLandmark::RightFootIndex),
    bind(JointName::LeftHip, PoseLandmark::LeftHip),
    bind(JointName::LeftKnee, PoseLandmark::LeftKnee),
    bind(JointName::LeftAnkle, PoseLandmark::LeftAnkle),
    bind(JointName::LeftFoot, PoseLandmark::LeftFootIndex),
    bind(JointName::RightHand, PoseLandmark::RightWrist),
    bind(JointName::LeftHand, PoseLandmark::LeftWrist),
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JointError {
    #[error("landmark {index} missing from model output ({available} landmarks)")]
    Missing { index: usize, available: usize },
    #[error("landmark {index} has non-finite coordinates")]
    Malformed { index: usize },
}

/// Extraction outcome for a single joint in a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct JointReading {
    pub joint: JointName,
    pub result: Result<Landmark, JointError>,
}

/// Map one frame's landmark result onto the joint table.
///
/// Returns nothing when no body was found. Otherwise returns exactly one
/// reading per table row; a bad landmark only fails its own row.
pub fn map_joints(result: Option<&LandmarkSet>, table: &[JointBinding]) -> Vec<JointReading> {
    let Some(set) = result else {
        tracing::debug!("no pose landmarks in frame");
        return Vec::new();
    };

    table
        .iter()
        .map(|binding| JointReading {
            joint: binding.joint,
            result: extract(set, binding.landmark),
        })
        .collect()
}

fn extract(set: &LandmarkSet, landmark: PoseLandmark) -> Result<Landmark, JointError> {
    let index = landmark.index();
    let lm = set.get(landmark).ok_or(JointError::Missing {
        index,
        available: set.len(),
    })?;
    if !lm.is_finite() {
        return Err(JointError::Malformed { index });
    }
    Ok(*lm)
}
