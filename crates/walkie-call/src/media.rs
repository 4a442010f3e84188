//! Capability seams for the platform media stack.
//!
//! The peer-connection engine, the audio device, and the speech recognizer
//! are external capabilities: the call logic drives them through these
//! traits and consumes their callbacks as events on plain mpsc channels.
//! Production binaries plug in a real engine; tests plug in doubles.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use walkie_common::{Language, WalkieResult};
use walkie_signaling::{IceCandidateInit, SessionDescription};

/// Peer connection configuration handed to the media engine.
#[derive(Debug, Clone)]
pub struct RtcConfig {
    /// Public STUN servers.
    pub stun_urls: Vec<String>,
    /// Number of ICE candidates to pre-gather.
    pub candidate_pool_size: u8,
    /// Bundle all media on one transport (max-bundle).
    pub bundle_all: bool,
}

impl RtcConfig {
    pub fn new(stun_urls: Vec<String>, candidate_pool_size: u8) -> Self {
        Self {
            stun_urls,
            candidate_pool_size,
            bundle_all: true,
        }
    }
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self::new(
            vec![
                "stun:stun.l.google.com:19302".into(),
                "stun:stun1.l.google.com:19302".into(),
                "stun:stun.cloudflare.com:3478".into(),
            ],
            10,
        )
    }
}

/// Microphone capture constraints.
#[derive(Debug, Clone, Copy)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    /// Voice-call defaults: everything on.
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Connectivity state reported by the engine for a peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Checking,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events a live peer session pushes to its owner.
pub enum PeerEvent {
    /// A local ICE candidate was discovered; trickle it to the remote side.
    LocalCandidate(IceCandidateInit),
    /// The connectivity state changed.
    ConnectionState(ConnectionState),
    /// A remote media stream arrived.
    RemoteTrack(Arc<dyn AudioStream>),
}

impl std::fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerEvent::LocalCandidate(c) => f.debug_tuple("LocalCandidate").field(c).finish(),
            PeerEvent::ConnectionState(s) => f.debug_tuple("ConnectionState").field(s).finish(),
            PeerEvent::RemoteTrack(_) => f.write_str("RemoteTrack(..)"),
        }
    }
}

/// Factory for peer connections.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Allocate a new peer connection. Session events are delivered on the
    /// returned receiver until the handle is closed.
    async fn create_peer(
        &self,
        config: &RtcConfig,
    ) -> WalkieResult<(Arc<dyn PeerHandle>, mpsc::Receiver<PeerEvent>)>;
}

/// One live peer connection.
#[async_trait]
pub trait PeerHandle: Send + Sync {
    async fn create_offer(&self) -> WalkieResult<SessionDescription>;
    async fn create_answer(&self) -> WalkieResult<SessionDescription>;
    async fn set_local_description(&self, desc: &SessionDescription) -> WalkieResult<()>;
    async fn set_remote_description(&self, desc: &SessionDescription) -> WalkieResult<()>;
    async fn add_remote_candidate(&self, candidate: &IceCandidateInit) -> WalkieResult<()>;
    /// Attach a local capture stream for transmission.
    async fn attach_stream(&self, stream: Arc<dyn AudioStream>) -> WalkieResult<()>;
    /// Restart ICE on the existing session (transient connectivity failure).
    async fn restart_ice(&self) -> WalkieResult<()>;
    /// Close the connection. Further calls on the handle are no-ops.
    async fn close(&self);
}

/// Microphone / playback access.
#[async_trait]
pub trait AudioDevice: Send + Sync {
    /// Acquire the microphone. Fails with `WalkieError::MediaDevice` when
    /// permission is denied or no device is available.
    async fn capture(&self, constraints: AudioConstraints) -> WalkieResult<Arc<dyn AudioStream>>;

    /// Bind a remote stream to the playback sink.
    fn play(&self, stream: &dyn AudioStream);
}

/// A live audio stream (local capture or remote playback).
pub trait AudioStream: Send + Sync {
    /// Enable or disable the underlying tracks. Disabling silences
    /// transmission without releasing the device (mute).
    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Stop the tracks and release the device.
    fn stop(&self);

    /// Frequency-domain analyser over this stream, with `chain` applied
    /// before analysis. The chain affects only what the analyser sees.
    fn analyser(&self, chain: MeterChain) -> Box<dyn SpectrumSource>;
}

/// Filter stages applied between a stream and its volume analyser.
#[derive(Debug, Clone, Copy)]
pub struct MeterChain {
    /// Low-pass cutoff in Hz, if any.
    pub low_pass_hz: Option<f32>,
    /// Linear gain applied after filtering.
    pub gain: f32,
}

impl MeterChain {
    /// No filtering — the analyser sees the raw stream.
    pub fn direct() -> Self {
        Self {
            low_pass_hz: None,
            gain: 1.0,
        }
    }

    /// The local-meter chain: low-pass plus fixed attenuation, so the
    /// displayed level tracks voice energy rather than full-band noise.
    pub fn local_meter() -> Self {
        Self {
            low_pass_hz: Some(8_000.0),
            gain: 0.5,
        }
    }
}

/// Produces frequency-bin magnitudes for volume metering.
pub trait SpectrumSource: Send {
    fn bin_count(&self) -> usize;

    /// Fill `bins` with the current frequency-domain magnitudes (0..=255).
    fn frequency_bins(&mut self, bins: &mut [u8]);
}

/// A recognition result or failure from the speech capability.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Transcribed text; `is_final` marks a finalized segment.
    Result { text: String, is_final: bool },
    /// The recognition engine reported an error. The session may keep
    /// running afterwards.
    Error(RecognitionError),
    /// The session ended on its own.
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// No speech detected for a while. Transient.
    NoSpeech,
    /// Network hiccup between the engine and its backend. Transient.
    Network,
    /// Anything else (not-allowed, aborted, ...).
    Other(String),
}

impl RecognitionError {
    /// Benign errors are retried after a fixed backoff; others are only logged.
    pub fn is_benign(&self) -> bool {
        matches!(self, RecognitionError::NoSpeech | RecognitionError::Network)
    }
}

/// Factory for continuous speech recognition sessions.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Start a continuous recognition session over the local microphone in
    /// the given language.
    async fn start(&self, language: Language) -> WalkieResult<Box<dyn RecognitionSession>>;
}

/// One running recognition session.
#[async_trait]
pub trait RecognitionSession: Send {
    /// Receive the next recognition event; `None` once the session is gone.
    async fn next_event(&mut self) -> Option<RecognitionEvent>;

    /// Stop recognition. No further events are emitted.
    async fn stop(&mut self);
}

/// The platform capabilities a call runs on.
#[derive(Clone)]
pub struct MediaStack {
    pub engine: Arc<dyn MediaEngine>,
    pub device: Arc<dyn AudioDevice>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
}
