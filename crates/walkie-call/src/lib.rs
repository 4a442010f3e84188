//! # walkie-call
//!
//! The core of a Walkie voice call:
//! - [`state`] — the explicit call state machine (idle → calling/receiving
//!   → connected) and its effects
//! - [`negotiator`] — peer session lifecycle: offer/answer exchange,
//!   trickle ICE, in-place ICE restart, idempotent teardown
//! - [`audio`] — per-stream volume meters on a cancellable sampling task
//! - [`transcript`] / [`stt`] — the transcript buffer and the
//!   auto-restarting transcription driver
//! - [`controller`] — the single dispatch loop tying it all to the
//!   signaling channel and user commands
//! - [`media`] — trait seams for the platform capabilities (peer engine,
//!   audio device, speech recognizer)

pub mod audio;
pub mod controller;
pub mod media;
pub mod negotiator;
pub mod state;
pub mod stt;
pub mod transcript;

pub use controller::{CallController, CallHandle, CallSettings, Session, UserCommand};
pub use media::{MediaEngine, MediaStack, RtcConfig};
pub use negotiator::{Negotiator, SpeechTimings};
pub use state::{CallInput, CallState, Effect};
pub use transcript::TranscriptBuffer;
