//! posecast-hw: Frame acquisition for the tracking pipeline.
//!
//! Provides V4L2 camera capture, still-image and image-sequence playback,
//! and (with the `ffmpeg` feature) video file decoding, all yielding RGB
//! frames through the [`FrameSource`] trait.

pub mod camera;
#[cfg(feature = "ffmpeg")]
pub mod file_ffmpeg;
pub mod frame;
pub mod source;

pub use camera::{Camera, CameraError, PixelFormat};
pub use frame::Frame;
pub use source::{open_source, CaptureError, FrameSource, SourceKind, VideoInput};
