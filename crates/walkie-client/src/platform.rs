//! Headless stand-ins for the platform media capabilities.
//!
//! The production client embeds a real engine behind the `walkie-call` trait
//! seams (peer connections, microphone, speech recognition). This binary
//! ships inert implementations instead: the signaling and call-control plane
//! runs end-to-end against a live relay, but no audio is captured or played
//! and no speech is recognized.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use walkie_call::media::{
    AudioConstraints, AudioDevice, AudioStream, MediaEngine, MediaStack, MeterChain, PeerEvent,
    PeerHandle, RecognitionEvent, RecognitionSession, RtcConfig, SpectrumSource, SpeechRecognizer,
};
use walkie_common::{Language, WalkieError, WalkieResult};
use walkie_signaling::{IceCandidateInit, SessionDescription};

/// Build the headless capability stack.
pub fn headless_stack() -> MediaStack {
    info!("Headless media stack: call control runs, no audio is exchanged");
    MediaStack {
        engine: Arc::new(HeadlessEngine),
        device: Arc::new(HeadlessDevice),
        recognizer: Arc::new(HeadlessRecognizer),
    }
}

struct HeadlessEngine;

#[async_trait]
impl MediaEngine for HeadlessEngine {
    async fn create_peer(
        &self,
        config: &RtcConfig,
    ) -> WalkieResult<(Arc<dyn PeerHandle>, mpsc::Receiver<PeerEvent>)> {
        debug!(stun_servers = config.stun_urls.len(), "Allocating headless peer");
        // The sender is parked on the handle so the event stream stays open
        // for the session's lifetime; a headless peer never emits events.
        let (event_tx, event_rx) = mpsc::channel(8);
        let peer = Arc::new(HeadlessPeer {
            closed: AtomicBool::new(false),
            _events: event_tx,
        });
        Ok((peer, event_rx))
    }
}

struct HeadlessPeer {
    closed: AtomicBool,
    _events: mpsc::Sender<PeerEvent>,
}

#[async_trait]
impl PeerHandle for HeadlessPeer {
    async fn create_offer(&self) -> WalkieResult<SessionDescription> {
        Ok(SessionDescription::offer("v=0\r\ns=walkie-headless\r\n"))
    }

    async fn create_answer(&self) -> WalkieResult<SessionDescription> {
        Ok(SessionDescription::answer("v=0\r\ns=walkie-headless\r\n"))
    }

    async fn set_local_description(&self, _desc: &SessionDescription) -> WalkieResult<()> {
        Ok(())
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> WalkieResult<()> {
        debug!(kind = ?desc.kind, "Remote description applied (headless)");
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: &IceCandidateInit) -> WalkieResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WalkieError::Negotiation("peer connection is closed".into()));
        }
        debug!(candidate = %candidate.candidate, "Remote candidate applied (headless)");
        Ok(())
    }

    async fn attach_stream(&self, _stream: Arc<dyn AudioStream>) -> WalkieResult<()> {
        Ok(())
    }

    async fn restart_ice(&self) -> WalkieResult<()> {
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct HeadlessDevice;

#[async_trait]
impl AudioDevice for HeadlessDevice {
    async fn capture(&self, _constraints: AudioConstraints) -> WalkieResult<Arc<dyn AudioStream>> {
        Ok(Arc::new(SilentStream {
            enabled: AtomicBool::new(true),
        }))
    }

    fn play(&self, _stream: &dyn AudioStream) {
        debug!("Remote stream bound to headless playback");
    }
}

struct SilentStream {
    enabled: AtomicBool,
}

impl AudioStream for SilentStream {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn stop(&self) {}

    fn analyser(&self, _chain: MeterChain) -> Box<dyn SpectrumSource> {
        Box::new(SilentSpectrum)
    }
}

struct SilentSpectrum;

impl SpectrumSource for SilentSpectrum {
    fn bin_count(&self) -> usize {
        32
    }

    fn frequency_bins(&mut self, bins: &mut [u8]) {
        bins.fill(0);
    }
}

struct HeadlessRecognizer;

#[async_trait]
impl SpeechRecognizer for HeadlessRecognizer {
    async fn start(&self, language: Language) -> WalkieResult<Box<dyn RecognitionSession>> {
        debug!(lang = %language, "Headless recognition session started");
        Ok(Box::new(SilentSession))
    }
}

/// Never produces a result; stops when asked.
struct SilentSession;

#[async_trait]
impl RecognitionSession for SilentSession {
    async fn next_event(&mut self) -> Option<RecognitionEvent> {
        std::future::pending::<()>().await;
        unreachable!()
    }

    async fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn silent_capture_meters_zero() {
        let device = HeadlessDevice;
        let stream = device.capture(AudioConstraints::default()).await.unwrap();
        let mut source = stream.analyser(MeterChain::direct());

        let mut bins = vec![255u8; source.bin_count()];
        source.frequency_bins(&mut bins);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn closed_peer_rejects_candidates() {
        let engine = HeadlessEngine;
        let (peer, _events) = engine.create_peer(&RtcConfig::default()).await.unwrap();
        peer.close().await;

        let candidate = IceCandidateInit {
            candidate: "candidate:1 1 udp 1 192.0.2.1 9 typ host".into(),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
        };
        assert!(peer.add_remote_candidate(&candidate).await.is_err());
    }
}
