//! Test doubles for the platform capabilities: peer engine, audio device,
//! and speech recognizer. Each records what the call logic did to it so the
//! suites can assert on negotiation behavior without any real media stack.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use walkie_call::media::{
    AudioConstraints, AudioDevice, AudioStream, MediaEngine, MediaStack, MeterChain, PeerEvent,
    PeerHandle, RecognitionEvent, RecognitionSession, RtcConfig, SpectrumSource, SpeechRecognizer,
};
use walkie_common::{Language, WalkieError, WalkieResult};
use walkie_signaling::{IceCandidateInit, SessionDescription};

// === Peer engine ===

#[derive(Default)]
pub struct MockEngine {
    pub peers: Mutex<Vec<Arc<MockPeer>>>,
    pub fail_create: AtomicBool,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peer(&self, index: usize) -> Arc<MockPeer> {
        Arc::clone(&self.peers.lock().unwrap()[index])
    }

    pub fn peer_count(&self) -> usize {
        self.peers.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn create_peer(
        &self,
        _config: &RtcConfig,
    ) -> WalkieResult<(Arc<dyn PeerHandle>, mpsc::Receiver<PeerEvent>)> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(WalkieError::Negotiation("engine unavailable".into()));
        }
        let (event_tx, event_rx) = mpsc::channel(32);
        let peer = Arc::new(MockPeer {
            events: event_tx,
            offers_created: AtomicUsize::new(0),
            answers_created: AtomicUsize::new(0),
            local_descriptions: Mutex::new(Vec::new()),
            remote_descriptions: Mutex::new(Vec::new()),
            candidates_added: Mutex::new(Vec::new()),
            attached_streams: AtomicUsize::new(0),
            ice_restarts: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        });
        self.peers.lock().unwrap().push(Arc::clone(&peer));
        Ok((peer, event_rx))
    }
}

pub struct MockPeer {
    /// Test side: inject engine events (candidates, state, remote tracks).
    pub events: mpsc::Sender<PeerEvent>,
    pub offers_created: AtomicUsize,
    pub answers_created: AtomicUsize,
    pub local_descriptions: Mutex<Vec<SessionDescription>>,
    pub remote_descriptions: Mutex<Vec<SessionDescription>>,
    pub candidates_added: Mutex<Vec<IceCandidateInit>>,
    pub attached_streams: AtomicUsize,
    pub ice_restarts: AtomicUsize,
    pub closed: AtomicBool,
}

impl MockPeer {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerHandle for MockPeer {
    async fn create_offer(&self) -> WalkieResult<SessionDescription> {
        self.offers_created.fetch_add(1, Ordering::SeqCst);
        Ok(SessionDescription::offer("v=0 mock-offer"))
    }

    async fn create_answer(&self) -> WalkieResult<SessionDescription> {
        self.answers_created.fetch_add(1, Ordering::SeqCst);
        Ok(SessionDescription::answer("v=0 mock-answer"))
    }

    async fn set_local_description(&self, desc: &SessionDescription) -> WalkieResult<()> {
        self.local_descriptions.lock().unwrap().push(desc.clone());
        Ok(())
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> WalkieResult<()> {
        self.remote_descriptions.lock().unwrap().push(desc.clone());
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: &IceCandidateInit) -> WalkieResult<()> {
        if self.is_closed() {
            return Err(WalkieError::Negotiation("peer connection is closed".into()));
        }
        self.candidates_added.lock().unwrap().push(candidate.clone());
        Ok(())
    }

    async fn attach_stream(&self, _stream: Arc<dyn AudioStream>) -> WalkieResult<()> {
        self.attached_streams.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn restart_ice(&self) -> WalkieResult<()> {
        self.ice_restarts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// === Audio device ===

#[derive(Default)]
pub struct MockDevice {
    pub deny_capture: AtomicBool,
    pub captures: Mutex<Vec<Arc<MockStream>>>,
    pub playbacks: AtomicUsize,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stream(&self, index: usize) -> Arc<MockStream> {
        Arc::clone(&self.captures.lock().unwrap()[index])
    }
}

#[async_trait]
impl AudioDevice for MockDevice {
    async fn capture(&self, _constraints: AudioConstraints) -> WalkieResult<Arc<dyn AudioStream>> {
        if self.deny_capture.load(Ordering::SeqCst) {
            return Err(WalkieError::MediaDevice("permission denied".into()));
        }
        let stream = Arc::new(MockStream::with_level(128));
        self.captures.lock().unwrap().push(Arc::clone(&stream));
        Ok(stream)
    }

    fn play(&self, _stream: &dyn AudioStream) {
        self.playbacks.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockStream {
    pub enabled: AtomicBool,
    pub stopped: AtomicBool,
    pub level: u8,
}

impl MockStream {
    pub fn with_level(level: u8) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            level,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl AudioStream for MockStream {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn analyser(&self, chain: MeterChain) -> Box<dyn SpectrumSource> {
        Box::new(FlatSpectrum {
            level: (self.level as f32 * chain.gain) as u8,
        })
    }
}

pub struct FlatSpectrum {
    level: u8,
}

impl SpectrumSource for FlatSpectrum {
    fn bin_count(&self) -> usize {
        32
    }

    fn frequency_bins(&mut self, bins: &mut [u8]) {
        bins.fill(self.level);
    }
}

// === Speech recognizer ===

#[derive(Default)]
pub struct MockRecognizer {
    pub live: Arc<AtomicUsize>,
    pub max_live: Arc<AtomicUsize>,
    pub started: AtomicUsize,
    pub languages: Mutex<Vec<Language>>,
}

impl MockRecognizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn start(&self, language: Language) -> WalkieResult<Box<dyn RecognitionSession>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.languages.lock().unwrap().push(language);
        let live = Arc::clone(&self.live);
        let now = live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(IdleSession {
            live,
            stopped: false,
        }))
    }
}

/// A recognition session that produces nothing until stopped.
struct IdleSession {
    live: Arc<AtomicUsize>,
    stopped: bool,
}

#[async_trait]
impl RecognitionSession for IdleSession {
    async fn next_event(&mut self) -> Option<RecognitionEvent> {
        std::future::pending::<()>().await;
        unreachable!()
    }

    async fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for IdleSession {
    fn drop(&mut self) {
        if !self.stopped {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

// === Assembly helpers ===

pub struct TestStack {
    pub stack: MediaStack,
    pub engine: Arc<MockEngine>,
    pub device: Arc<MockDevice>,
    pub recognizer: Arc<MockRecognizer>,
}

pub fn test_stack() -> TestStack {
    let engine = MockEngine::new();
    let device = MockDevice::new();
    let recognizer = MockRecognizer::new();
    TestStack {
        stack: MediaStack {
            engine: Arc::clone(&engine) as _,
            device: Arc::clone(&device) as _,
            recognizer: Arc::clone(&recognizer) as _,
        },
        engine,
        device,
        recognizer,
    }
}

pub fn candidate(tag: &str) -> IceCandidateInit {
    IceCandidateInit {
        candidate: format!("candidate:{tag} 1 udp 2122260223 192.0.2.1 54400 typ host"),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
    }
}
