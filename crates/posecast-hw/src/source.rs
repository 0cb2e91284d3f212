//! Frame sources: live cameras, image files, image sequences and video files.

use crate::camera::{Camera, CameraError};
use crate::frame::Frame;
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[cfg(feature = "ffmpeg")]
use crate::file_ffmpeg::FfmpegFileSource;

/// Image extensions accepted for still-image and sequence inputs.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

#[derive(Error, Debug)]
pub enum CaptureError {
    /// A file-backed source has no more frames.
    #[error("end of stream")]
    EndOfStream,
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },
}

/// Whether read failures are worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Capture device; read failures are transient.
    Live,
    /// File or image sequence; read failures end the stream.
    File,
}

/// Anything that yields frames one at a time.
pub trait FrameSource {
    fn kind(&self) -> SourceKind;

    fn next_frame(&mut self) -> Result<Frame, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn kind(&self) -> SourceKind {
        (**self).kind()
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        (**self).next_frame()
    }
}

/// Parsed `--input` value: a device index or a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoInput {
    Device(u32),
    Path(PathBuf),
}

impl VideoInput {
    /// V4L2 node for a device index.
    pub fn device_path(index: u32) -> String {
        format!("/dev/video{index}")
    }
}

impl FromStr for VideoInput {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<u32>() {
            Ok(index) => VideoInput::Device(index),
            Err(_) => VideoInput::Path(PathBuf::from(s)),
        })
    }
}

impl fmt::Display for VideoInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoInput::Device(index) => write!(f, "{}", Self::device_path(*index)),
            VideoInput::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Open the source named by a [`VideoInput`].
///
/// Directories become image sequences, image files become single-frame
/// streams, anything else is decoded as video (requires the `ffmpeg` feature).
pub fn open_source(input: &VideoInput) -> Result<Box<dyn FrameSource>, CaptureError> {
    match input {
        VideoInput::Device(index) => {
            let camera = Camera::open(&VideoInput::device_path(*index))?;
            Ok(Box::new(CameraSource::new(camera)))
        }
        VideoInput::Path(path) if path.is_dir() => Ok(Box::new(ImageSequenceSource::from_dir(path)?)),
        VideoInput::Path(path) if is_image_path(path) => {
            Ok(Box::new(ImageSequenceSource::from_paths(vec![path.clone()])))
        }
        VideoInput::Path(path) => open_video(path),
    }
}

#[cfg(feature = "ffmpeg")]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>, CaptureError> {
    Ok(Box::new(FfmpegFileSource::open(path)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::Open {
        path: path.display().to_string(),
        reason: "video decoding requires the `ffmpeg` feature".into(),
    })
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Live V4L2 camera as a frame source.
pub struct CameraSource {
    camera: Camera,
}

impl CameraSource {
    pub fn new(camera: Camera) -> Self {
        Self { camera }
    }
}

impl FrameSource for CameraSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        Ok(self.camera.capture_frame()?)
    }
}

/// Ordered list of still images played back as a stream.
pub struct ImageSequenceSource {
    paths: VecDeque<PathBuf>,
    sequence: u32,
}

impl ImageSequenceSource {
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            paths: paths.into(),
            sequence: 0,
        }
    }

    /// All image files in `dir`, sorted by file name.
    pub fn from_dir(dir: &Path) -> Result<Self, CaptureError> {
        let open_err = |e: std::io::Error| CaptureError::Open {
            path: dir.display().to_string(),
            reason: e.to_string(),
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(open_err)? {
            let path = entry.map_err(open_err)?.path();
            if path.is_file() && is_image_path(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        tracing::info!(dir = %dir.display(), frames = paths.len(), "opened image sequence");
        Ok(Self::from_paths(paths))
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let path = self.paths.pop_front().ok_or(CaptureError::EndOfStream)?;
        let image = image::open(&path).map_err(|e| CaptureError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let frame = Frame::new(image.to_rgb8(), self.sequence);
        self.sequence += 1;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_video_input_parse() {
        assert_eq!("0".parse::<VideoInput>().unwrap(), VideoInput::Device(0));
        assert_eq!("2".parse::<VideoInput>().unwrap(), VideoInput::Device(2));
        assert_eq!(
            "clip.mp4".parse::<VideoInput>().unwrap(),
            VideoInput::Path(PathBuf::from("clip.mp4"))
        );
        assert_eq!(VideoInput::Device(1).to_string(), "/dev/video1");
    }

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("a/b.PNG")));
        assert!(is_image_path(Path::new("x.jpeg")));
        assert!(!is_image_path(Path::new("clip.mp4")));
        assert!(!is_image_path(Path::new("noext")));
    }

    #[test]
    fn test_image_sequence_plays_sorted_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("002.png", 20u8), ("001.png", 10u8)] {
            RgbImage::from_pixel(4, 3, image::Rgb([shade; 3]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let mut source = ImageSequenceSource::from_dir(dir.path()).unwrap();
        assert_eq!(source.kind(), SourceKind::File);
        assert_eq!(source.remaining(), 2);

        let first = source.next_frame().unwrap();
        assert_eq!(first.image.get_pixel(0, 0).0, [10, 10, 10]);
        assert_eq!(first.sequence, 0);
        let second = source.next_frame().unwrap();
        assert_eq!(second.image.get_pixel(0, 0).0, [20, 20, 20]);
        assert_eq!(second.sequence, 1);

        assert!(matches!(source.next_frame(), Err(CaptureError::EndOfStream)));
    }

    #[test]
    fn test_unreadable_image_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("broken.png");
        std::fs::write(&bad, b"not a png").unwrap();

        let mut source = ImageSequenceSource::from_paths(vec![bad]);
        assert!(matches!(source.next_frame(), Err(CaptureError::Read { .. })));
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn test_video_without_ffmpeg_fails_to_open() {
        let input = VideoInput::Path(PathBuf::from("/tmp/clip.mp4"));
        assert!(matches!(open_source(&input), Err(CaptureError::Open { .. })));
    }
}
