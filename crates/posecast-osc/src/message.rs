//! Outbound OSC messages understood by the receiver.

use posecast_core::{JointName, Landmark};
use rosc::{OscMessage, OscPacket, OscType};
use std::fmt;

/// Address announcing a new skeleton: `/new_skel <int id>`.
pub const NEW_SKELETON_ADDR: &str = "/new_skel";
/// Address carrying one joint position: `/joint <name> <int id> <x> <y> <z>`.
pub const JOINT_ADDR: &str = "/joint";

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    NewSkeleton {
        skeleton_id: i32,
    },
    Joint {
        joint: JointName,
        skeleton_id: i32,
        x: f32,
        y: f32,
        z: f32,
    },
}

impl OutboundMessage {
    pub fn joint(joint: JointName, skeleton_id: i32, lm: &Landmark) -> Self {
        OutboundMessage::Joint {
            joint,
            skeleton_id,
            x: lm.x,
            y: lm.y,
            z: lm.z,
        }
    }

    pub fn addr(&self) -> &'static str {
        match self {
            OutboundMessage::NewSkeleton { .. } => NEW_SKELETON_ADDR,
            OutboundMessage::Joint { .. } => JOINT_ADDR,
        }
    }

    pub fn to_osc(&self) -> OscMessage {
        let args = match *self {
            OutboundMessage::NewSkeleton { skeleton_id } => vec![OscType::Int(skeleton_id)],
            OutboundMessage::Joint {
                joint,
                skeleton_id,
                x,
                y,
                z,
            } => vec![
                OscType::String(joint.as_str().to_string()),
                OscType::Int(skeleton_id),
                OscType::Float(x),
                OscType::Float(y),
                OscType::Float(z),
            ],
        };
        OscMessage {
            addr: self.addr().to_string(),
            args,
        }
    }

    /// Encode as a single OSC packet, ready for one datagram.
    pub fn encode(&self) -> Result<Vec<u8>, rosc::OscError> {
        rosc::encoder::encode(&OscPacket::Message(self.to_osc()))
    }
}

/// Human-readable form, e.g. `/joint head 1 0.5 0.4 0.1`.
impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundMessage::NewSkeleton { skeleton_id } => {
                write!(f, "{NEW_SKELETON_ADDR} {skeleton_id}")
            }
            OutboundMessage::Joint {
                joint,
                skeleton_id,
                x,
                y,
                z,
            } => write!(f, "{JOINT_ADDR} {joint} {skeleton_id} {x} {y} {z}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_display() {
        let msg = OutboundMessage::joint(JointName::Head, 1, &Landmark::new(0.5, 0.4, 0.1));
        assert_eq!(msg.to_string(), "/joint head 1 0.5 0.4 0.1");
        assert_eq!(
            OutboundMessage::NewSkeleton { skeleton_id: 3 }.to_string(),
            "/new_skel 3"
        );
    }

    #[test]
    fn test_joint_osc_schema() {
        let msg = OutboundMessage::joint(JointName::LeftFoot, 7, &Landmark::new(0.1, 0.2, -0.3));
        let osc = msg.to_osc();
        assert_eq!(osc.addr, "/joint");
        assert_eq!(
            osc.args,
            vec![
                OscType::String("l_foot".into()),
                OscType::Int(7),
                OscType::Float(0.1),
                OscType::Float(0.2),
                OscType::Float(-0.3),
            ]
        );
    }

    #[test]
    fn test_encode_decodes_back() {
        let msg = OutboundMessage::NewSkeleton { skeleton_id: 1 };
        let bytes = msg.encode().unwrap();
        // OSC packets are 4-byte aligned.
        assert_eq!(bytes.len() % 4, 0);

        let (_, packet) = rosc::decoder::decode_udp(&bytes).unwrap();
        match packet {
            OscPacket::Message(m) => {
                assert_eq!(m.addr, "/new_skel");
                assert_eq!(m.args, vec![OscType::Int(1)]);
            }
            other => panic!("expected message, got {other:?}"),
        }
    }
}
