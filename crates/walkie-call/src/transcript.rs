//! The transcript buffer — finalized speech segments for the current call.
//!
//! Append-only while a call is active; cleared on call end or by an explicit
//! clear action. The joined text is published on a `watch` channel so a UI
//! can render it without polling.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Separator appended after each finalized segment.
const SEGMENT_SEPARATOR: &str = " ";

/// One finalized recognition result.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Shared, append-only transcript for one call.
#[derive(Clone)]
pub struct TranscriptBuffer {
    segments: Arc<RwLock<Vec<Segment>>>,
    text_tx: Arc<watch::Sender<String>>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        let (text_tx, _) = watch::channel(String::new());
        Self {
            segments: Arc::new(RwLock::new(Vec::new())),
            text_tx: Arc::new(text_tx),
        }
    }

    /// Append a finalized segment (with its trailing separator).
    pub async fn append(&self, text: &str) {
        let mut segments = self.segments.write().await;
        segments.push(Segment {
            text: text.to_owned(),
            at: Utc::now(),
        });
        let _ = self.text_tx.send(join(&segments));
    }

    /// Drop all segments.
    pub async fn clear(&self) {
        self.segments.write().await.clear();
        let _ = self.text_tx.send(String::new());
    }

    /// Current segments, in arrival order.
    pub async fn snapshot(&self) -> Vec<Segment> {
        self.segments.read().await.clone()
    }

    /// Joined transcript text.
    pub async fn text(&self) -> String {
        join(&self.segments.read().await)
    }

    /// Watch channel carrying the joined text.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.text_tx.subscribe()
    }
}

impl Default for TranscriptBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn join(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push_str(&segment.text);
        out.push_str(SEGMENT_SEPARATOR);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_with_trailing_separator() {
        let buffer = TranscriptBuffer::new();
        buffer.append("hello").await;
        buffer.append("world").await;
        assert_eq!(buffer.text().await, "hello world ");
        assert_eq!(buffer.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn clear_empties_buffer_and_publishes() {
        let buffer = TranscriptBuffer::new();
        let mut rx = buffer.subscribe();

        buffer.append("hello").await;
        assert_eq!(*rx.borrow_and_update(), "hello ");

        buffer.clear().await;
        assert_eq!(*rx.borrow_and_update(), "");
        assert!(buffer.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn clones_share_the_same_buffer() {
        let buffer = TranscriptBuffer::new();
        let other = buffer.clone();
        buffer.append("shared").await;
        assert_eq!(other.text().await, "shared ");
    }
}
