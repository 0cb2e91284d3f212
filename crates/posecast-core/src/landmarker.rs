//! BlazePose landmark model via ONNX Runtime.
//!
//! Runs the full-body landmark network on a letterboxed 256×256 RGB input and
//! decodes the 33 body keypoints back into frame-normalized coordinates.

use crate::provider::{LandmarkProvider, ProviderError};
use crate::types::{Landmark, LandmarkSet, POSE_LANDMARK_COUNT};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const POSE_INPUT_SIZE: usize = 256;
/// The network emits 33 body + 6 auxiliary (ROI) landmarks.
const POSE_MODEL_LANDMARKS: usize = 39;
/// Values per landmark: x, y, z, visibility, presence.
const POSE_LANDMARK_STRIDE: usize = 5;
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.5;

/// Metadata for coordinate de-mapping after letterbox resize.
#[derive(Debug, Clone, Copy)]
struct LetterboxInfo {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    width: f32,
    height: f32,
}

/// Output tensor indices: (landmarks, pose presence).
type OutputIndices = (usize, usize);

/// BlazePose-based landmark provider.
pub struct PoseLandmarker {
    session: Session,
    outputs: OutputIndices,
    min_detection_confidence: f32,
}

impl PoseLandmarker {
    /// Load the landmark ONNX model from the given path.
    pub fn load(model_path: &str, min_detection_confidence: f32) -> Result<Self, ProviderError> {
        if !Path::new(model_path).exists() {
            return Err(ProviderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?output_names,
            "loaded BlazePose landmark model"
        );

        if output_names.len() < 2 {
            return Err(ProviderError::InferenceFailed(format!(
                "landmark model requires at least 2 outputs (landmarks, presence), got {}",
                output_names.len()
            )));
        }

        let outputs = discover_output_indices(&output_names);
        tracing::debug!(?outputs, "landmark output tensor mapping");

        Ok(Self {
            session,
            outputs,
            min_detection_confidence,
        })
    }

    /// Letterbox an RGB frame into a NHWC float tensor in `[0, 1]`.
    fn preprocess(frame: &RgbImage) -> Result<(Array4<f32>, LetterboxInfo), ProviderError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(ProviderError::InferenceFailed("empty frame".into()));
        }

        let size = POSE_INPUT_SIZE as f32;
        let scale = (size / width as f32).min(size / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, POSE_INPUT_SIZE as u32);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, POSE_INPUT_SIZE as u32);
        let pad_x = (POSE_INPUT_SIZE as u32 - new_w) as f32 / 2.0;
        let pad_y = (POSE_INPUT_SIZE as u32 - new_h) as f32 / 2.0;

        let resized = image::imageops::resize(frame, new_w, new_h, FilterType::Triangle);

        let x0 = pad_x.floor() as usize;
        let y0 = pad_y.floor() as usize;
        // Padding stays black (0.0).
        let mut tensor = Array4::<f32>::zeros((1, POSE_INPUT_SIZE, POSE_INPUT_SIZE, 3));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (tx, ty) = (x0 + x as usize, y0 + y as usize);
            for c in 0..3 {
                tensor[[0, ty, tx, c]] = pixel.0[c] as f32 / 255.0;
            }
        }

        Ok((
            tensor,
            LetterboxInfo {
                scale,
                pad_x,
                pad_y,
                width: width as f32,
                height: height as f32,
            },
        ))
    }
}

impl LandmarkProvider for PoseLandmarker {
    fn infer(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>, ProviderError> {
        let (input, letterbox) = Self::preprocess(frame)?;

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (landmarks_idx, presence_idx) = self.outputs;

        let (_, presence) = outputs[presence_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| ProviderError::InferenceFailed(format!("pose presence: {e}")))?;
        let presence = presence.first().copied().unwrap_or(0.0);

        if presence < self.min_detection_confidence {
            tracing::trace!(presence, "pose presence below threshold");
            return Ok(None);
        }

        let (_, raw) = outputs[landmarks_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| ProviderError::InferenceFailed(format!("landmarks: {e}")))?;

        if raw.len() < POSE_LANDMARK_COUNT * POSE_LANDMARK_STRIDE {
            tracing::warn!(
                values = raw.len(),
                expected = POSE_MODEL_LANDMARKS * POSE_LANDMARK_STRIDE,
                "landmark tensor shorter than expected"
            );
        }

        let set = LandmarkSet {
            landmarks: decode_landmarks(raw, &letterbox),
            presence,
        };
        if set.is_empty() {
            return Ok(None);
        }
        Ok(Some(set))
    }
}

/// Discover output tensor ordering by name.
///
/// Converted BlazePose models name their outputs either after the TFLite
/// tensors ("ld_3d", "output_poseflag") or generically ("Identity",
/// "Identity_1", ...). Unrecognized names fall back to positional [0, 1].
fn discover_output_indices(names: &[String]) -> OutputIndices {
    let find = |candidates: &[&str]| names.iter().position(|n| candidates.contains(&n.as_str()));

    match (
        find(&["ld_3d", "Identity"]),
        find(&["output_poseflag", "Identity_1"]),
    ) {
        (Some(landmarks), Some(presence)) => (landmarks, presence),
        _ => {
            tracing::info!(
                ?names,
                "landmark output names not recognized, using positional mapping [0]=landmarks, [1]=presence"
            );
            (0, 1)
        }
    }
}

/// Decode body landmarks from the raw model tensor into frame-normalized space.
///
/// Stops at the first incomplete landmark, so a short tensor yields a short set.
fn decode_landmarks(raw: &[f32], letterbox: &LetterboxInfo) -> Vec<Landmark> {
    raw.chunks_exact(POSE_LANDMARK_STRIDE)
        .take(POSE_LANDMARK_COUNT)
        .map(|v| Landmark {
            x: (v[0] - letterbox.pad_x) / letterbox.scale / letterbox.width,
            y: (v[1] - letterbox.pad_y) / letterbox.scale / letterbox.height,
            z: v[2] / letterbox.scale / letterbox.width,
            visibility: sigmoid(v[3]),
        })
        .collect()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letterbox_for(width: f32, height: f32) -> LetterboxInfo {
        let size = POSE_INPUT_SIZE as f32;
        let scale = (size / width).min(size / height);
        LetterboxInfo {
            scale,
            pad_x: (size - (width * scale).round()) / 2.0,
            pad_y: (size - (height * scale).round()) / 2.0,
            width,
            height,
        }
    }

    #[test]
    fn test_decode_landmarks_undoes_letterbox() {
        let lb = letterbox_for(640.0, 480.0);
        // A point at frame pixel (320, 120) → normalized (0.5, 0.25).
        let px = 320.0 * lb.scale + lb.pad_x;
        let py = 120.0 * lb.scale + lb.pad_y;
        let mut raw = vec![0.0f32; POSE_MODEL_LANDMARKS * POSE_LANDMARK_STRIDE];
        raw[0] = px;
        raw[1] = py;
        raw[2] = 64.0 * lb.scale;
        raw[3] = 0.0;

        let lms = decode_landmarks(&raw, &lb);
        assert_eq!(lms.len(), POSE_LANDMARK_COUNT);
        assert!((lms[0].x - 0.5).abs() < 1e-4, "x = {}", lms[0].x);
        assert!((lms[0].y - 0.25).abs() < 1e-4, "y = {}", lms[0].y);
        assert!((lms[0].z - 0.1).abs() < 1e-4, "z = {}", lms[0].z);
        assert!((lms[0].visibility - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_landmarks_short_tensor() {
        let lb = letterbox_for(256.0, 256.0);
        let raw = vec![1.0f32; 12 * POSE_LANDMARK_STRIDE + 3];
        assert_eq!(decode_landmarks(&raw, &lb).len(), 12);
    }

    #[test]
    fn test_preprocess_shape_and_padding() {
        // 512x256 frame → scale 0.5, 256x128 content, 64px bands top and bottom.
        let frame = RgbImage::from_pixel(512, 256, image::Rgb([255, 0, 0]));
        let (tensor, lb) = PoseLandmarker::preprocess(&frame).unwrap();
        assert_eq!(tensor.shape(), &[1, POSE_INPUT_SIZE, POSE_INPUT_SIZE, 3]);
        assert!((lb.scale - 0.5).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 64.0);

        assert_eq!(tensor[[0, 10, 128, 0]], 0.0);
        assert!((tensor[[0, 128, 128, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 128, 128, 1]], 0.0);
    }

    #[test]
    fn test_preprocess_rejects_empty_frame() {
        let frame = RgbImage::new(0, 0);
        assert!(PoseLandmarker::preprocess(&frame).is_err());
    }

    #[test]
    fn test_discover_output_indices_named() {
        let names: Vec<String> = ["output_segmentation", "output_poseflag", "ld_3d"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(discover_output_indices(&names), (2, 1));
    }

    #[test]
    fn test_discover_output_indices_identity() {
        let names: Vec<String> = ["Identity", "Identity_1", "Identity_2", "Identity_3", "Identity_4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(discover_output_indices(&names), (0, 1));
    }

    #[test]
    fn test_discover_output_indices_positional_fallback() {
        let names: Vec<String> = (0..5).map(|i: usize| i.to_string()).collect();
        assert_eq!(discover_output_indices(&names), (0, 1));
    }

    #[test]
    fn test_load_missing_model() {
        let err = PoseLandmarker::load("/nonexistent/pose_landmark_full.onnx", 0.5);
        assert!(matches!(err, Err(ProviderError::ModelNotFound(_))));
    }
}
