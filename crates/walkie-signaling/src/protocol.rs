//! Signaling wire protocol — JSON control messages relayed between the two
//! peers of a call.
//!
//! Shapes match the relay's existing JavaScript clients exactly: a
//! kebab-case `type` discriminator, `roomId` on call-control messages, and
//! browser-style `sdpMid`/`sdpMLineIndex` fields on candidates. Messages are
//! meaningful only within an active room; receipt outside the expected call
//! state is ignored by the state machine.

use serde::{Deserialize, Serialize};

/// Signaling messages between the two call peers (relayed by the server).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalingMessage {
    /// Caller → callee: request to start a call in this room.
    CallRequest {
        #[serde(rename = "roomId")]
        room_id: String,
    },

    /// Callee → caller: the call was accepted. Whichever side observes the
    /// accept (sent or received) becomes the SDP offerer.
    CallAccept {
        #[serde(rename = "roomId")]
        room_id: String,
    },

    /// Either side: hang up.
    CallEnd {
        #[serde(rename = "roomId")]
        room_id: String,
    },

    /// Offerer → answerer: SDP offer.
    Offer { offer: SessionDescription },

    /// Answerer → offerer: SDP answer.
    Answer { answer: SessionDescription },

    /// Bidirectional: trickled ICE candidate.
    IceCandidate { candidate: IceCandidateInit },
}

/// An SDP session description blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// An ICE candidate descriptor, browser-dictionary shaped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u32>,
}
