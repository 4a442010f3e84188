//! # Walkie client
//!
//! Terminal client for 1:1 voice calls:
//! - connects the signaling channel for the given room,
//! - announces the room code to the visual engine,
//! - runs the call controller,
//! - maps stdin commands to call actions and prints state and transcript
//!   changes.
//!
//! The media capabilities are headless stubs in this binary (see
//! [`platform`]); the signaling and call-control plane is fully live.

mod bridge;
mod platform;

use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use walkie_call::{CallController, CallHandle, CallSettings, RtcConfig, SpeechTimings, UserCommand};
use walkie_common::Language;
use walkie_signaling::SignalingChannel;

use bridge::{LoggingEngine, Region};

#[derive(Parser, Debug)]
#[command(name = "walkie", version, about = "1:1 voice-call client with live transcription")]
struct Args {
    /// Room code to join.
    #[arg(long)]
    room: String,

    /// User identifier sent to the relay.
    #[arg(long)]
    user: String,

    /// Visual-engine region for the room announcement.
    #[arg(long, value_enum, default_value_t = Region::Korea)]
    region: Region,

    /// Override the relay URL from configuration.
    #[arg(long, env = "WALKIE_RELAY__URL")]
    relay_url: Option<String>,

    /// Initial transcription language (locale tag or name).
    #[arg(long)]
    language: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = walkie_common::config::init()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "walkie=debug".into()),
        )
        .with_target(true)
        .init();

    tracing::info!("Starting Walkie v{}", env!("CARGO_PKG_VERSION"));

    let relay_url = args.relay_url.as_deref().unwrap_or(&config.relay.url);
    let language = match &args.language {
        Some(input) => input.parse::<Language>().map_err(anyhow::Error::msg)?,
        None => config
            .speech
            .default_language
            .parse()
            .unwrap_or(Language::English),
    };

    let mut channel = SignalingChannel::connect(
        relay_url,
        &args.room,
        Some(&args.user),
        Duration::from_secs(config.relay.keepalive_secs),
    )
    .await?;
    let events = channel.take_events();

    bridge::announce_room(&LoggingEngine, &args.room, args.region).await;

    let settings = CallSettings {
        rtc: RtcConfig::new(config.ice.stun_urls.clone(), config.ice.candidate_pool_size),
        speech: SpeechTimings {
            restart_delay: Duration::from_millis(config.speech.restart_delay_ms),
            language_switch_delay: Duration::from_millis(config.speech.language_switch_delay_ms),
        },
        language,
    };

    let (outbound_tx, mut outbound_rx) = mpsc::channel(64);
    let (controller, handle) = CallController::new(
        args.room.clone(),
        platform::headless_stack(),
        settings,
        outbound_tx,
    );

    let controller_task = tokio::spawn(controller.run(events));

    // Pump controller output into the signaling channel; close it once the
    // controller (the only sender) is gone.
    let pump_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            channel.send(&msg).await;
        }
        channel.close().await;
    });

    run_command_loop(handle).await?;

    controller_task.await?;
    pump_task.await?;
    tracing::info!("Bye");
    Ok(())
}

/// Read stdin commands until the user quits or the call controller exits,
/// echoing state and transcript changes.
async fn run_command_loop(handle: CallHandle) -> anyhow::Result<()> {
    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut call_state = handle.call_state.clone();
    let mut transcript = handle.transcript.subscribe();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    let _ = handle.commands.send(UserCommand::Leave).await;
                    return Ok(());
                };
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                match parse_command(input) {
                    Some(command) => {
                        let leaving = command == UserCommand::Leave;
                        let _ = handle.commands.send(command).await;
                        if leaving {
                            return Ok(());
                        }
                    }
                    None => print_help(),
                }
            }
            changed = call_state.changed() => {
                if changed.is_err() {
                    // Controller gone (channel closed); nothing left to drive.
                    return Ok(());
                }
                println!("call state: {:?}", *call_state.borrow_and_update());
            }
            changed = transcript.changed() => {
                if changed.is_ok() {
                    println!("transcript: {}", *transcript.borrow_and_update());
                }
            }
        }
    }
}

fn parse_command(input: &str) -> Option<UserCommand> {
    let (head, rest) = match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    };
    match head {
        "call" => Some(UserCommand::RequestCall),
        "accept" => Some(UserCommand::AcceptCall),
        "decline" => Some(UserCommand::DeclineCall),
        "cancel" => Some(UserCommand::CancelCall),
        "end" => Some(UserCommand::EndCall),
        "mute" => Some(UserCommand::SetMuted(true)),
        "unmute" => Some(UserCommand::SetMuted(false)),
        "clear" => Some(UserCommand::ClearTranscript),
        "lang" => rest.parse::<Language>().ok().map(UserCommand::SetLanguage),
        "quit" | "exit" => Some(UserCommand::Leave),
        _ => None,
    }
}

fn print_help() {
    println!("commands: call | accept | decline | cancel | end | mute | unmute | lang <tag> | clear | quit");
}
