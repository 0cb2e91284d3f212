//! The frame loop: capture, infer, map, emit, and optionally render.

use crate::config::TrackerConfig;
use posecast_core::{
    map_joints, JointBinding, LandmarkProvider, LandmarkSet, OverlayRenderer, PoseLandmarker, Renderer,
};
use posecast_hw::{Camera, CaptureError, Frame, FrameSource, SourceKind, VideoInput};
use posecast_osc::{Emitter, Transport, UdpTransport};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A file-backed source ran out of frames.
    EndOfStream,
    /// The cancel flag was raised.
    Cancelled,
    /// A file-backed source failed to produce a frame.
    CaptureFailed(String),
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub frames_without_body: u64,
    pub inference_failures: u64,
    pub messages_sent: u64,
    pub joints_skipped: u64,
    pub send_failures: u64,
    pub capture_retries: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub stats: RunStats,
}

struct Preview {
    renderer: Box<dyn Renderer>,
    path: PathBuf,
}

/// Drives one source through the provider and out through the emitter.
pub struct Tracker<S, P, T> {
    source: S,
    provider: P,
    emitter: Emitter<T>,
    joints: &'static [JointBinding],
    flip: bool,
    preview: Option<Preview>,
    cancel: Arc<AtomicBool>,
    stats: RunStats,
}

impl<S, P, T> Tracker<S, P, T>
where
    S: FrameSource,
    P: LandmarkProvider,
    T: Transport,
{
    pub fn new(config: &TrackerConfig, source: S, provider: P, transport: T) -> Self {
        Self {
            source,
            provider,
            emitter: Emitter::new(transport, config.skeleton_id),
            joints: config.joints,
            flip: config.flip,
            preview: None,
            cancel: Arc::new(AtomicBool::new(false)),
            stats: RunStats::default(),
        }
    }

    /// Render every processed frame and overwrite `path` with the result.
    pub fn with_preview(mut self, renderer: Box<dyn Renderer>, path: PathBuf) -> Self {
        self.preview = Some(Preview { renderer, path });
        self
    }

    /// Flag checked once per iteration; set it to stop the loop.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Announce the skeleton, then process frames until the source ends or
    /// the cancel flag is raised. Source and transport are dropped on return.
    pub fn run(mut self) -> RunSummary {
        self.emitter.announce();

        let stop_reason = loop {
            if self.cancel.load(Ordering::SeqCst) {
                break StopReason::Cancelled;
            }
            if let Some(reason) = self.step() {
                break reason;
            }
        };

        tracing::info!(
            reason = ?stop_reason,
            frames = self.stats.frames,
            messages = self.stats.messages_sent,
            "tracker stopped"
        );

        RunSummary {
            stop_reason,
            stats: self.stats,
        }
    }

    /// One iteration. Returns `Some` when the loop should stop.
    fn step(&mut self) -> Option<StopReason> {
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(CaptureError::EndOfStream) => return Some(StopReason::EndOfStream),
            Err(e) if self.source.kind() == SourceKind::Live => {
                tracing::warn!(error = %e, "ignoring empty camera frame");
                self.stats.capture_retries += 1;
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "stopping on unreadable frame");
                return Some(StopReason::CaptureFailed(e.to_string()));
            }
        };

        self.process(frame);
        None
    }

    fn process(&mut self, mut frame: Frame) {
        if self.flip {
            frame.flip_horizontal();
        }

        let result = match self.provider.infer(&frame.image) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(sequence = frame.sequence, error = %e, "inference failed");
                self.stats.inference_failures += 1;
                None
            }
        };
        if result.is_none() {
            tracing::debug!(sequence = frame.sequence, "no body detected");
            self.stats.frames_without_body += 1;
        }

        let readings = map_joints(result.as_ref(), self.joints);
        let emission = self.emitter.emit_frame(&readings);
        self.stats.messages_sent += emission.sent as u64;
        self.stats.joints_skipped += emission.skipped as u64;
        self.stats.send_failures += emission.failed as u64;

        if let Some(preview) = &self.preview {
            let sets: Vec<LandmarkSet> = result.into_iter().collect();
            let annotated = preview.renderer.draw(&frame.image, &sets);
            if let Err(e) = annotated.save(&preview.path) {
                tracing::warn!(path = %preview.path.display(), error = %e, "failed to write preview");
            }
        }

        self.stats.frames += 1;
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("model: {0}")]
    Provider(#[from] posecast_core::ProviderError),
    #[error("transport: {0}")]
    Transport(#[from] posecast_osc::TransportError),
}

/// Tracker wired to the real camera/file source, ONNX model and UDP socket.
pub type LiveTracker = Tracker<Box<dyn FrameSource>, PoseLandmarker, UdpTransport>;

/// Open the source, load the model and bind the socket. Any failure here
/// is fatal; nothing has been sent yet.
pub fn start(config: &TrackerConfig) -> Result<LiveTracker, PipelineError> {
    let source = posecast_hw::open_source(&config.input).map_err(|e| {
        if let VideoInput::Device(_) = config.input {
            for device in Camera::list_devices() {
                tracing::info!(
                    path = %device.path,
                    name = %device.name,
                    driver = %device.driver,
                    bus = %device.bus,
                    "available camera"
                );
            }
        }
        e
    })?;
    tracing::info!(input = %config.input, kind = ?source.kind(), "opened input");

    let provider = PoseLandmarker::load(
        &config.model_path.to_string_lossy(),
        config.min_detection_confidence,
    )?;
    let transport = UdpTransport::connect(config.target)?;

    let mut tracker = Tracker::new(config, source, provider, transport);
    if let Some(path) = &config.preview {
        tracker = tracker.with_preview(Box::new(OverlayRenderer::default()), path.clone());
    }
    Ok(tracker)
}
