//! The call controller — the single dispatcher for one room.
//!
//! Consumes exactly two inputs in one loop: signaling channel events and
//! user commands. Every call-control input runs through the state machine;
//! offer/answer/candidate messages go straight to the negotiator. A channel
//! close is a call end: full teardown, readiness flags and transcript
//! cleared, state back to idle.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use walkie_common::Language;
use walkie_signaling::{ChannelEvent, SignalingMessage};

use crate::media::{MediaStack, RtcConfig};
use crate::negotiator::{Negotiator, SpeechTimings};
use crate::state::{self, CallInput, CallState, Effect};
use crate::transcript::TranscriptBuffer;

/// User intents driving the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    RequestCall,
    AcceptCall,
    DeclineCall,
    CancelCall,
    EndCall,
    SetLanguage(Language),
    SetMuted(bool),
    ClearTranscript,
    /// Leave the room; the controller loop exits after teardown.
    Leave,
}

/// Tunables for one call session.
#[derive(Debug, Clone)]
pub struct CallSettings {
    pub rtc: RtcConfig,
    pub speech: SpeechTimings,
    pub language: Language,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            rtc: RtcConfig::default(),
            speech: SpeechTimings::default(),
            language: Language::English,
        }
    }
}

/// Per-room session state (the data-model `Session`).
#[derive(Debug)]
pub struct Session {
    pub room_id: String,
    pub local_ready: bool,
    pub remote_ready: bool,
    pub call_state: CallState,
}

/// Observable side of a running controller, for a UI layer.
pub struct CallHandle {
    pub commands: mpsc::Sender<UserCommand>,
    pub call_state: watch::Receiver<CallState>,
    pub local_volume: watch::Receiver<f32>,
    pub remote_volume: watch::Receiver<f32>,
    pub transcript: TranscriptBuffer,
}

/// Owns the session and drives it from signaling events and user commands.
pub struct CallController {
    session: Session,
    negotiator: Negotiator,
    transcript: TranscriptBuffer,
    outbound: mpsc::Sender<SignalingMessage>,
    state_tx: watch::Sender<CallState>,
    commands: mpsc::Receiver<UserCommand>,
}

impl CallController {
    /// Build a controller for `room_id`. `outbound` messages must be pumped
    /// into the signaling channel by the caller.
    pub fn new(
        room_id: impl Into<String>,
        stack: MediaStack,
        settings: CallSettings,
        outbound: mpsc::Sender<SignalingMessage>,
    ) -> (Self, CallHandle) {
        let transcript = TranscriptBuffer::new();
        let (state_tx, state_rx) = watch::channel(CallState::Idle);
        let (local_volume_tx, local_volume_rx) = watch::channel(0.0);
        let (remote_volume_tx, remote_volume_rx) = watch::channel(0.0);
        let (command_tx, command_rx) = mpsc::channel(16);

        let negotiator = Negotiator::new(
            stack,
            settings.rtc,
            outbound.clone(),
            transcript.clone(),
            settings.speech,
            settings.language,
            Arc::new(local_volume_tx),
            Arc::new(remote_volume_tx),
        );

        let controller = Self {
            session: Session {
                room_id: room_id.into(),
                local_ready: true,
                remote_ready: false,
                call_state: CallState::Idle,
            },
            negotiator,
            transcript: transcript.clone(),
            outbound,
            state_tx,
            commands: command_rx,
        };

        let handle = CallHandle {
            commands: command_tx,
            call_state: state_rx,
            local_volume: local_volume_rx,
            remote_volume: remote_volume_rx,
            transcript,
        };

        (controller, handle)
    }

    /// Run the dispatch loop until the channel closes or the user leaves.
    pub async fn run(mut self, mut events: mpsc::Receiver<ChannelEvent>) {
        info!(room = %self.session.room_id, "Call controller started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(UserCommand::Leave) | None => {
                        self.step(CallInput::ChannelClosed).await;
                        break;
                    }
                    Some(command) => self.on_command(command).await,
                },
                event = events.recv() => match event {
                    Some(ChannelEvent::Message(msg)) => self.on_message(msg).await,
                    Some(ChannelEvent::Error(e)) => {
                        warn!(room = %self.session.room_id, error = %e, "Signaling channel error");
                    }
                    Some(ChannelEvent::Closed) | None => {
                        info!(room = %self.session.room_id, "Signaling channel closed; ending call");
                        self.step(CallInput::ChannelClosed).await;
                        break;
                    }
                },
            }
        }
        info!(room = %self.session.room_id, "Call controller stopped");
    }

    async fn on_command(&mut self, command: UserCommand) {
        match command {
            UserCommand::RequestCall => self.step(CallInput::Request).await,
            UserCommand::AcceptCall => self.step(CallInput::Accept).await,
            UserCommand::DeclineCall => self.step(CallInput::Decline).await,
            UserCommand::CancelCall => self.step(CallInput::Cancel).await,
            UserCommand::EndCall => self.step(CallInput::End).await,
            UserCommand::SetLanguage(language) => {
                info!(lang = %language, "Transcription language changed");
                self.negotiator.set_language(language).await;
            }
            UserCommand::SetMuted(muted) => {
                debug!(muted, "Mute toggled");
                self.negotiator.set_muted(muted);
            }
            UserCommand::ClearTranscript => self.transcript.clear().await,
            UserCommand::Leave => unreachable!("handled in run()"),
        }
    }

    async fn on_message(&mut self, msg: SignalingMessage) {
        match msg {
            SignalingMessage::CallRequest { .. } => {
                self.session.remote_ready = true;
                self.step(CallInput::RemoteRequest).await;
            }
            SignalingMessage::CallAccept { .. } => {
                self.session.remote_ready = true;
                self.step(CallInput::RemoteAccept).await;
            }
            SignalingMessage::CallEnd { .. } => self.step(CallInput::RemoteEnd).await,
            SignalingMessage::Offer { offer } => {
                // Offers are only expected once the call was accepted.
                if self.session.call_state != CallState::Connected {
                    debug!(state = ?self.session.call_state, "Ignoring offer outside connected state");
                    return;
                }
                if let Err(e) = self.negotiator.handle_offer(offer).await {
                    error!(error = %e, "Failed to answer offer; resetting call");
                    self.reset_to_idle().await;
                }
            }
            SignalingMessage::Answer { answer } => self.negotiator.handle_answer(answer).await,
            SignalingMessage::IceCandidate { candidate } => {
                self.negotiator.handle_remote_candidate(candidate).await;
            }
        }
    }

    /// Apply one input to the state machine and execute its effects.
    async fn step(&mut self, input: CallInput) {
        let transition = state::apply(self.session.call_state, input);
        if transition.is_noop(self.session.call_state) {
            debug!(state = ?self.session.call_state, ?input, "Input ignored in current state");
            return;
        }

        info!(
            room = %self.session.room_id,
            from = ?self.session.call_state,
            to = ?transition.next,
            ?input,
            "Call state transition"
        );
        self.set_state(transition.next);

        for effect in transition.effects {
            self.run_effect(effect).await;
        }
    }

    async fn run_effect(&mut self, effect: Effect) {
        let room_id = self.session.room_id.clone();
        match effect {
            Effect::SendCallRequest => {
                let _ = self
                    .outbound
                    .send(SignalingMessage::CallRequest { room_id })
                    .await;
            }
            Effect::SendCallAccept => {
                let _ = self
                    .outbound
                    .send(SignalingMessage::CallAccept { room_id })
                    .await;
            }
            Effect::SendCallEnd => {
                let _ = self
                    .outbound
                    .send(SignalingMessage::CallEnd { room_id })
                    .await;
            }
            Effect::StartOfferer => {
                if let Err(e) = self.negotiator.start_as_offerer().await {
                    error!(error = %e, "Failed to start call; resetting");
                    self.reset_to_idle().await;
                }
            }
            Effect::Teardown => {
                self.negotiator.teardown().await;
                self.session.remote_ready = false;
                self.transcript.clear().await;
            }
        }
    }

    /// Negotiation failure path: everything down, state back to idle.
    async fn reset_to_idle(&mut self) {
        self.negotiator.teardown().await;
        self.session.remote_ready = false;
        self.transcript.clear().await;
        self.set_state(CallState::Idle);
    }

    fn set_state(&mut self, state: CallState) {
        self.session.call_state = state;
        let _ = self.state_tx.send(state);
    }
}
