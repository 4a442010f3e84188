//! Centralized error types for Walkie.
//!
//! Uses `thiserror` for ergonomic error definitions. Non-fatal conditions
//! (late ICE candidates, benign recognition hiccups) are logged and swallowed
//! at their call sites rather than surfaced through this type — see the
//! per-component error policies in the respective crates.

/// Core error type used across all Walkie crates.
#[derive(Debug, thiserror::Error)]
pub enum WalkieError {
    // === Signaling transport ===
    #[error("Signaling transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Signaling channel is not connected")]
    NotConnected,

    // === Call negotiation ===
    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    #[error("No active peer session")]
    NoSession,

    // === Media capabilities ===
    #[error("Media device error: {0}")]
    MediaDevice(String),

    // === Speech recognition ===
    #[error("Speech recognition error: {0}")]
    Recognition(String),

    // === Serialization ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Configuration ===
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Convenience type alias for Results using WalkieError.
pub type WalkieResult<T> = Result<T, WalkieError>;
