//! Per-frame joint emission for a single skeleton.

use crate::message::OutboundMessage;
use crate::transport::Transport;
use posecast_core::JointReading;

/// Outcome of emitting one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameEmission {
    /// Messages handed to the transport successfully.
    pub sent: usize,
    /// Joints whose landmark could not be extracted.
    pub skipped: usize,
    /// Messages the transport rejected.
    pub failed: usize,
}

/// Turns joint readings into one message per joint, sent independently.
pub struct Emitter<T> {
    transport: T,
    skeleton_id: i32,
    announced: bool,
}

impl<T: Transport> Emitter<T> {
    pub fn new(transport: T, skeleton_id: i32) -> Self {
        Self {
            transport,
            skeleton_id,
            announced: false,
        }
    }

    /// Send `/new_skel` once. Later calls are no-ops and return `false`.
    pub fn announce(&mut self) -> bool {
        if self.announced {
            return false;
        }
        self.announced = true;

        let msg = OutboundMessage::NewSkeleton {
            skeleton_id: self.skeleton_id,
        };
        match self.transport.send(&msg) {
            Ok(()) => tracing::info!(skeleton_id = self.skeleton_id, "announced skeleton"),
            Err(e) => tracing::warn!(error = %e, skeleton_id = self.skeleton_id, "skeleton announcement not sent"),
        }
        true
    }

    /// Send one `/joint` message per successful reading.
    ///
    /// Failed readings are logged and skipped; transport errors are counted
    /// and never abort the remaining joints.
    pub fn emit_frame(&mut self, readings: &[JointReading]) -> FrameEmission {
        let mut emission = FrameEmission::default();

        for reading in readings {
            let landmark = match &reading.result {
                Ok(lm) => lm,
                Err(e) => {
                    tracing::warn!(joint = %reading.joint, error = %e, "skipping joint");
                    emission.skipped += 1;
                    continue;
                }
            };

            let msg = OutboundMessage::joint(reading.joint, self.skeleton_id, landmark);
            match self.transport.send(&msg) {
                Ok(()) => emission.sent += 1,
                Err(e) => {
                    tracing::debug!(joint = %reading.joint, error = %e, "joint message dropped");
                    emission.failed += 1;
                }
            }
        }

        emission
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
