//! Seams between the pipeline and its inference/visualization backends.

use crate::types::LandmarkSet;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("model file not found: {0}; place pose_landmark_full.onnx in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Produces body landmarks for one RGB frame.
pub trait LandmarkProvider {
    /// `Ok(None)` means the model ran but found no body.
    fn infer(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>, ProviderError>;
}

/// Draws landmark overlays onto a copy of a frame.
pub trait Renderer {
    fn draw(&self, frame: &RgbImage, sets: &[LandmarkSet]) -> RgbImage;
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for Box<P> {
    fn infer(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>, ProviderError> {
        (**self).infer(frame)
    }
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for &mut P {
    fn infer(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>, ProviderError> {
        (**self).infer(frame)
    }
}
