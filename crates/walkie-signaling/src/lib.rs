//! # walkie-signaling
//!
//! The signaling side of a Walkie call:
//! - [`protocol`] — JSON control messages exchanged through the relay
//!   (call-request/accept/end, SDP offer/answer, trickled ICE candidates)
//! - [`channel`] — the persistent WebSocket connection to the relay, with
//!   keep-alive and single-dispatcher event delivery
//!
//! The actual media never touches this channel; it flows peer-to-peer once
//! negotiation completes.

pub mod channel;
pub mod protocol;

pub use channel::{ChannelEvent, SignalingChannel};
pub use protocol::{IceCandidateInit, SdpKind, SessionDescription, SignalingMessage};
