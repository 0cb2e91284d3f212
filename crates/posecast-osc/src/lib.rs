//! posecast-osc: OSC output to audio/visual receivers.
//!
//! Encodes `/new_skel` and `/joint` messages with `rosc` and sends each as
//! its own UDP datagram. Delivery is best effort.

pub mod emitter;
pub mod message;
pub mod transport;

pub use emitter::{Emitter, FrameEmission};
pub use message::OutboundMessage;
pub use transport::{Transport, TransportError, UdpTransport};

/// Default receiver address (SuperCollider's language port).
pub const DEFAULT_HOST: std::net::Ipv4Addr = std::net::Ipv4Addr::LOCALHOST;
pub const DEFAULT_PORT: u16 = 57120;
