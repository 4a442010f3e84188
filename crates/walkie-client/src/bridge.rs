//! Visual engine bridge.
//!
//! The visual world (a Unity WebGL build in the original deployment) is an
//! opaque command sink: once a room code is established, it gets exactly one
//! fire-and-forget `("Walking", "ReceiveCode", "<roomCode>-<region>")`
//! command, and only after it has reported ready. Nothing else crosses this
//! boundary.

use async_trait::async_trait;
use clap::ValueEnum;
use std::fmt;
use tracing::info;

/// Region worlds the visual engine can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Region {
    Korea,
    China,
    Japan,
    Usa,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Korea => "korea",
            Region::China => "china",
            Region::Japan => "japan",
            Region::Usa => "usa",
        };
        f.write_str(name)
    }
}

/// An external engine that accepts string commands addressed to a named
/// object and method.
#[async_trait]
pub trait VisualEngine: Send + Sync {
    /// Resolves once the engine can receive commands.
    async fn ready(&self);

    /// Fire-and-forget command dispatch.
    fn send_message(&self, object: &str, method: &str, argument: &str);
}

/// Deliver the room code to the engine, once, after it is ready.
pub async fn announce_room(engine: &dyn VisualEngine, room_code: &str, region: Region) {
    engine.ready().await;
    engine.send_message("Walking", "ReceiveCode", &format!("{room_code}-{region}"));
}

/// Stub engine that is immediately ready and logs every command.
#[derive(Debug, Default)]
pub struct LoggingEngine;

#[async_trait]
impl VisualEngine for LoggingEngine {
    async fn ready(&self) {}

    fn send_message(&self, object: &str, method: &str, argument: &str) {
        info!(object, method, argument, "Visual engine command");
    }
}
