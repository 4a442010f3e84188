//! The transcription driver — continuous speech-to-text over the local mic.
//!
//! Runs while a call is active. Finalized results land in the
//! [`TranscriptBuffer`]. The recognition engine is flaky by nature, so the
//! driver restarts it: benign errors (`no-speech`, `network`) and natural
//! session ends trigger a restart after a fixed delay, and a failed start is
//! retried once before giving up. Switching language stops the session and
//! restarts it with the new tag after a short delay to avoid races inside
//! the engine. The driver is single-instance: starting it again first stops
//! whatever was running.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use walkie_common::Language;

use crate::media::{RecognitionEvent, SpeechRecognizer};
use crate::transcript::TranscriptBuffer;

enum DriverCommand {
    SetLanguage(Language),
    Stop,
}

/// Drives one continuous recognition session at a time.
pub struct TranscriptionDriver {
    recognizer: Arc<dyn SpeechRecognizer>,
    transcript: TranscriptBuffer,
    restart_delay: Duration,
    language_switch_delay: Duration,
    control: Option<mpsc::Sender<DriverCommand>>,
    task: Option<JoinHandle<()>>,
}

impl TranscriptionDriver {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        transcript: TranscriptBuffer,
        restart_delay: Duration,
        language_switch_delay: Duration,
    ) -> Self {
        Self {
            recognizer,
            transcript,
            restart_delay,
            language_switch_delay,
            control: None,
            task: None,
        }
    }

    /// Start recognition in `language`, stopping any running instance first.
    pub async fn start(&mut self, language: Language) {
        self.stop().await;

        let (control_tx, control_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_driver(
            Arc::clone(&self.recognizer),
            self.transcript.clone(),
            language,
            self.restart_delay,
            self.language_switch_delay,
            control_rx,
        ));
        self.control = Some(control_tx);
        self.task = Some(task);
    }

    /// Switch the recognition language. No-op when not running.
    pub async fn set_language(&self, language: Language) {
        if let Some(control) = &self.control {
            let _ = control.send(DriverCommand::SetLanguage(language)).await;
        }
    }

    /// Stop recognition and wait for the session to wind down.
    pub async fn stop(&mut self) {
        if let Some(control) = self.control.take() {
            let _ = control.send(DriverCommand::Stop).await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

async fn run_driver(
    recognizer: Arc<dyn SpeechRecognizer>,
    transcript: TranscriptBuffer,
    mut language: Language,
    restart_delay: Duration,
    language_switch_delay: Duration,
    mut control: mpsc::Receiver<DriverCommand>,
) {
    loop {
        // Start (with one fallback attempt if the immediate start throws).
        let mut session = match recognizer.start(language).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, lang = %language, "Recognition start failed; retrying once");
                match recognizer.start(language).await {
                    Ok(session) => session,
                    Err(e) => {
                        warn!(error = %e, lang = %language, "Recognition restart failed; giving up");
                        return;
                    }
                }
            }
        };
        debug!(lang = %language, "Recognition started");

        // Consume events until the session needs a restart or we are told
        // to stop. The select only decides; the session is acted on after
        // its borrow is released. `restart_after` carries the delay before
        // the next start.
        enum Step {
            Switch(Language),
            Stop,
            Event(Option<RecognitionEvent>),
        }

        let restart_after = loop {
            let step = tokio::select! {
                cmd = control.recv() => match cmd {
                    Some(DriverCommand::SetLanguage(new_language)) => Step::Switch(new_language),
                    Some(DriverCommand::Stop) | None => Step::Stop,
                },
                event = session.next_event() => Step::Event(event),
            };

            match step {
                Step::Switch(new_language) => {
                    debug!(from = %language, to = %new_language, "Switching recognition language");
                    session.stop().await;
                    language = new_language;
                    break language_switch_delay;
                }
                Step::Stop => {
                    session.stop().await;
                    return;
                }
                Step::Event(Some(RecognitionEvent::Result { text, is_final })) => {
                    if is_final {
                        transcript.append(&text).await;
                    }
                }
                Step::Event(Some(RecognitionEvent::Error(err))) if err.is_benign() => {
                    debug!(?err, "Transient recognition error; restarting");
                    session.stop().await;
                    break restart_delay;
                }
                Step::Event(Some(RecognitionEvent::Error(err))) => {
                    warn!(?err, "Recognition error");
                }
                Step::Event(Some(RecognitionEvent::Ended) | None) => {
                    debug!("Recognition session ended; restarting");
                    session.stop().await;
                    break restart_delay;
                }
            }
        };

        // Wait out the backoff, still responsive to commands.
        tokio::select! {
            cmd = control.recv() => match cmd {
                Some(DriverCommand::SetLanguage(new_language)) => language = new_language,
                Some(DriverCommand::Stop) | None => return,
            },
            _ = sleep(restart_after) => {}
        }
    }
}
