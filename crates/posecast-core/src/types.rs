use serde::{Deserialize, Serialize};

/// Number of body landmarks in the BlazePose topology.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// A normalized 3D keypoint as reported by the landmark model.
///
/// `x` and `y` are relative to the frame width/height (roughly `[0, 1]`,
/// may fall outside when the body leaves the frame). `z` is depth relative
/// to the hips, on the same scale as `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Likelihood that the landmark is visible (not occluded), 0.0 to 1.0.
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: 1.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// All landmarks produced for one detected body in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub landmarks: Vec<Landmark>,
    /// Pose presence score reported by the model (0.0 to 1.0).
    pub presence: f32,
}

impl LandmarkSet {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self {
            landmarks,
            presence: 1.0,
        }
    }

    /// Landmark at a BlazePose index, if the model produced one.
    pub fn get(&self, landmark: PoseLandmark) -> Option<&Landmark> {
        self.landmarks.get(landmark.index())
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// BlazePose body landmark indices (33 total).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    pub const fn index(self) -> usize {
        self as usize
    }
}
