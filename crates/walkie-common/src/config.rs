//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for
//! production. Config precedence: env vars > .env file > config.toml > defaults

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call walkie_common::config::init() first.")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup, before any other code
/// accesses config. Library code takes config values as parameters so tests
/// never need the global.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let cfg = builder().build()?;
    let app_config: AppConfig = cfg.try_deserialize()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
    config::Config::builder()
        // Defaults
        .set_default("relay.url", "wss://relay.walkie.chat/voice-chat")
        .expect("valid default")
        .set_default("relay.keepalive_secs", 30)
        .expect("valid default")
        .set_default(
            "ice.stun_urls",
            vec![
                "stun:stun.l.google.com:19302".to_string(),
                "stun:stun1.l.google.com:19302".to_string(),
                "stun:stun.cloudflare.com:3478".to_string(),
            ],
        )
        .expect("valid default")
        .set_default("ice.candidate_pool_size", 10)
        .expect("valid default")
        .set_default("speech.restart_delay_ms", 1_000)
        .expect("valid default")
        .set_default("speech.language_switch_delay_ms", 100)
        .expect("valid default")
        .set_default("speech.default_language", "en-US")
        .expect("valid default")
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // Environment variables (WALKIE_RELAY__URL, WALKIE_SPEECH__DEFAULT_LANGUAGE, etc.)
        .add_source(
            config::Environment::with_prefix("WALKIE")
                .separator("__")
                .try_parsing(true),
        )
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub relay: RelayConfig,
    pub ice: IceConfig,
    pub speech: SpeechConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Signaling relay WebSocket URL. Room and user identifiers are appended
    /// as query parameters on connect.
    pub url: String,
    /// Interval between bare `"ping"` keep-alive frames while connected.
    pub keepalive_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IceConfig {
    /// Public STUN servers handed to the media engine.
    pub stun_urls: Vec<String>,
    /// ICE candidate pool size (pre-gathering).
    pub candidate_pool_size: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    /// Delay before restarting recognition after a benign error or session end.
    pub restart_delay_ms: u64,
    /// Delay between stop and restart when switching language.
    pub language_switch_delay_ms: u64,
    /// Locale tag used when no language was selected.
    pub default_language: String,
}
