//! Peer session negotiation — offer/answer exchange, trickle ICE, and
//! teardown for the single active peer connection of a call.
//!
//! At most one [`PeerSession`] exists at a time; starting a new attempt
//! always tears the previous one down first. Teardown is idempotent and safe
//! to run concurrently with in-flight negotiation: the session's event task
//! is aborted and the engine handle closed, so stale engine callbacks land
//! nowhere.
//!
//! ICE candidates may arrive before the corresponding offer/answer has been
//! applied (trickle ICE gives no ordering guarantee). Such candidates are
//! queued on the session and flushed once the remote description is set;
//! candidates with no session at all are dropped with a debug log. Candidate
//! application errors are logged and never fatal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use walkie_common::{Language, WalkieResult};
use walkie_signaling::{IceCandidateInit, SessionDescription, SignalingMessage};

use crate::audio::{AudioAnalysis, DISPLAY_REFRESH};
use crate::media::{
    AudioConstraints, AudioStream, ConnectionState, MediaStack, MeterChain, PeerEvent, PeerHandle,
    RtcConfig,
};
use crate::stt::TranscriptionDriver;
use crate::transcript::TranscriptBuffer;

/// Timing knobs for the transcription driver.
#[derive(Debug, Clone, Copy)]
pub struct SpeechTimings {
    pub restart_delay: Duration,
    pub language_switch_delay: Duration,
}

impl Default for SpeechTimings {
    fn default() -> Self {
        Self {
            restart_delay: Duration::from_secs(1),
            language_switch_delay: Duration::from_millis(100),
        }
    }
}

/// One active peer connection and everything scoped to it.
pub struct PeerSession {
    id: Uuid,
    handle: Arc<dyn PeerHandle>,
    local_stream: Option<Arc<dyn AudioStream>>,
    local_meter: Option<AudioAnalysis>,
    remote_description_set: bool,
    pending_candidates: Vec<IceCandidateInit>,
    event_task: JoinHandle<()>,
}

impl PeerSession {
    /// Stop local media, close the engine session, cancel the event task and
    /// the meters bound to this session.
    async fn close(mut self) {
        self.event_task.abort();
        if let Some(stream) = self.local_stream.take() {
            stream.stop();
        }
        // Dropping the meter aborts its sampling task; the remote meter is
        // owned by the event task and dies with it.
        self.local_meter = None;
        self.handle.close().await;
        debug!(session = %self.id, "Peer session closed");
    }
}

/// Creates, drives, and tears down peer sessions for a call.
pub struct Negotiator {
    stack: MediaStack,
    rtc: RtcConfig,
    outbound: mpsc::Sender<SignalingMessage>,
    peer: Option<PeerSession>,
    driver: TranscriptionDriver,
    language: Language,
    muted: bool,
    local_volume: Arc<watch::Sender<f32>>,
    remote_volume: Arc<watch::Sender<f32>>,
}

impl Negotiator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stack: MediaStack,
        rtc: RtcConfig,
        outbound: mpsc::Sender<SignalingMessage>,
        transcript: TranscriptBuffer,
        timings: SpeechTimings,
        language: Language,
        local_volume: Arc<watch::Sender<f32>>,
        remote_volume: Arc<watch::Sender<f32>>,
    ) -> Self {
        let driver = TranscriptionDriver::new(
            Arc::clone(&stack.recognizer),
            transcript,
            timings.restart_delay,
            timings.language_switch_delay,
        );
        Self {
            stack,
            rtc,
            outbound,
            peer: None,
            driver,
            language,
            muted: false,
            local_volume,
            remote_volume,
        }
    }

    pub fn has_session(&self) -> bool {
        self.peer.is_some()
    }

    /// Start negotiation as the offerer: capture audio, send the offer.
    /// On any failure the session is fully torn down before the error is
    /// returned; the caller resets the call state to idle.
    pub async fn start_as_offerer(&mut self) -> WalkieResult<()> {
        self.teardown().await;
        match self.offer_flow().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.teardown().await;
                Err(e)
            }
        }
    }

    async fn offer_flow(&mut self) -> WalkieResult<()> {
        let mut peer = self.create_session().await?;
        // The session must not leak if any step fails: close it before
        // surfacing the error, or its event task outlives the attempt.
        match self.offer_steps(&mut peer).await {
            Ok(()) => {
                self.peer = Some(peer);
                Ok(())
            }
            Err(e) => {
                peer.close().await;
                Err(e)
            }
        }
    }

    async fn offer_steps(&mut self, peer: &mut PeerSession) -> WalkieResult<()> {
        self.attach_local_audio(peer).await?;

        let offer = peer.handle.create_offer().await?;
        peer.handle.set_local_description(&offer).await?;
        info!(session = %peer.id, "Sending SDP offer");
        let _ = self
            .outbound
            .send(SignalingMessage::Offer { offer })
            .await;
        Ok(())
    }

    /// Answering side: apply the remote offer, capture audio, send the answer.
    pub async fn handle_offer(&mut self, offer: SessionDescription) -> WalkieResult<()> {
        self.teardown().await;
        match self.answer_flow(offer).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.teardown().await;
                Err(e)
            }
        }
    }

    async fn answer_flow(&mut self, offer: SessionDescription) -> WalkieResult<()> {
        let mut peer = self.create_session().await?;
        match self.answer_steps(&mut peer, offer).await {
            Ok(()) => {
                self.peer = Some(peer);
                Ok(())
            }
            Err(e) => {
                peer.close().await;
                Err(e)
            }
        }
    }

    async fn answer_steps(
        &mut self,
        peer: &mut PeerSession,
        offer: SessionDescription,
    ) -> WalkieResult<()> {
        peer.handle.set_remote_description(&offer).await?;
        peer.remote_description_set = true;

        self.attach_local_audio(peer).await?;

        let answer = peer.handle.create_answer().await?;
        peer.handle.set_local_description(&answer).await?;
        info!(session = %peer.id, "Sending SDP answer");
        let _ = self
            .outbound
            .send(SignalingMessage::Answer { answer })
            .await;
        Ok(())
    }

    /// Apply the remote answer to the existing session.
    pub async fn handle_answer(&mut self, answer: SessionDescription) {
        let Some(peer) = &mut self.peer else {
            debug!("Ignoring SDP answer: no active session");
            return;
        };
        match peer.handle.set_remote_description(&answer).await {
            Ok(()) => {
                peer.remote_description_set = true;
                info!(session = %peer.id, "Remote answer applied");
                flush_pending_candidates(peer).await;
            }
            Err(e) => warn!(error = %e, "Failed to apply remote answer"),
        }
    }

    /// Apply (or queue) a trickled ICE candidate. Never fatal.
    pub async fn handle_remote_candidate(&mut self, candidate: IceCandidateInit) {
        match &mut self.peer {
            None => debug!("Ignoring ICE candidate: no active session"),
            Some(peer) if !peer.remote_description_set => {
                debug!(session = %peer.id, "Queueing ICE candidate ahead of remote description");
                peer.pending_candidates.push(candidate);
            }
            Some(peer) => {
                if let Err(e) = peer.handle.add_remote_candidate(&candidate).await {
                    warn!(error = %e, "Error adding received ICE candidate");
                }
            }
        }
    }

    /// Switch the transcription language (restarts recognition if running).
    pub async fn set_language(&mut self, language: Language) {
        self.language = language;
        self.driver.set_language(language).await;
    }

    /// Mute or unmute the local stream. Transmission is silenced by
    /// disabling the tracks; nothing is torn down.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(peer) = &self.peer {
            if let Some(stream) = &peer.local_stream {
                stream.set_enabled(!muted);
            }
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Tear down the active session, if any. Idempotent.
    pub async fn teardown(&mut self) {
        self.driver.stop().await;
        if let Some(peer) = self.peer.take() {
            peer.close().await;
        }
        let _ = self.local_volume.send(0.0);
        let _ = self.remote_volume.send(0.0);
    }

    /// Allocate a peer connection and wire its event stream.
    async fn create_session(&self) -> WalkieResult<PeerSession> {
        let (handle, events) = self.stack.engine.create_peer(&self.rtc).await?;
        let id = Uuid::new_v4();
        info!(session = %id, "Peer session created");

        let event_task = tokio::spawn(run_peer_events(
            id,
            events,
            Arc::clone(&handle),
            self.outbound.clone(),
            self.stack.clone(),
            Arc::clone(&self.remote_volume),
        ));

        Ok(PeerSession {
            id,
            handle,
            local_stream: None,
            local_meter: None,
            remote_description_set: false,
            pending_candidates: Vec::new(),
            event_task,
        })
    }

    /// Capture the microphone, attach it to the session, start the local
    /// meter and the transcription driver.
    async fn attach_local_audio(&mut self, peer: &mut PeerSession) -> WalkieResult<()> {
        let stream = self
            .stack
            .device
            .capture(AudioConstraints::default())
            .await?;
        peer.handle.attach_stream(Arc::clone(&stream)).await?;
        stream.set_enabled(!self.muted);

        let source = stream.analyser(MeterChain::local_meter());
        peer.local_meter = Some(AudioAnalysis::start(
            source,
            DISPLAY_REFRESH,
            Arc::clone(&self.local_volume),
        ));
        peer.local_stream = Some(stream);

        self.driver.start(self.language).await;
        Ok(())
    }
}

/// Drain queued candidates into the session once the remote description is
/// in place. Individual failures are logged and skipped.
async fn flush_pending_candidates(peer: &mut PeerSession) {
    for candidate in peer.pending_candidates.drain(..) {
        if let Err(e) = peer.handle.add_remote_candidate(&candidate).await {
            warn!(error = %e, "Dropping queued ICE candidate");
        }
    }
}

/// Consume one session's engine events until the session is torn down.
async fn run_peer_events(
    session_id: Uuid,
    mut events: mpsc::Receiver<PeerEvent>,
    handle: Arc<dyn PeerHandle>,
    outbound: mpsc::Sender<SignalingMessage>,
    stack: MediaStack,
    remote_volume: Arc<watch::Sender<f32>>,
) {
    // Owned here so it dies with the task (and thus with the session).
    let mut remote_meter: Option<AudioAnalysis> = None;

    while let Some(event) = events.recv().await {
        match event {
            PeerEvent::LocalCandidate(candidate) => {
                let _ = outbound
                    .send(SignalingMessage::IceCandidate { candidate })
                    .await;
            }
            PeerEvent::ConnectionState(state) => {
                debug!(session = %session_id, ?state, "Connection state changed");
                if state == ConnectionState::Failed {
                    warn!(session = %session_id, "ICE failed; restarting in place");
                    if let Err(e) = handle.restart_ice().await {
                        warn!(session = %session_id, error = %e, "ICE restart failed");
                    }
                }
            }
            PeerEvent::RemoteTrack(stream) => {
                info!(session = %session_id, "Remote track received");
                stack.device.play(stream.as_ref());
                let source = stream.analyser(MeterChain::direct());
                remote_meter = Some(AudioAnalysis::start(
                    source,
                    DISPLAY_REFRESH,
                    Arc::clone(&remote_volume),
                ));
            }
        }
    }
    drop(remote_meter);
}
