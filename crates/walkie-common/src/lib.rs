//! # walkie-common
//!
//! Shared types for the Walkie voice-call client:
//! - [`WalkieError`] — the error type used across all Walkie crates
//! - [`config`] — application configuration (env vars / `.env` / config.toml)
//! - [`Language`] — the fixed set of transcription languages

pub mod config;
pub mod error;
pub mod language;

pub use error::{WalkieError, WalkieResult};
pub use language::Language;
