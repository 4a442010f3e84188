//! The signaling channel — a persistent WebSocket connection to the relay.
//!
//! One connection per room. Inbound control messages are delivered to a
//! single dispatcher as [`ChannelEvent`]s on an mpsc receiver; connectivity
//! is published on a `watch` channel so the UI can reflect it. While open, a
//! bare text `"ping"` frame is sent on a fixed interval to keep intermediate
//! proxies from idling the connection out. No pong is validated — a dead
//! connection is only noticed when the socket closes, at which point the
//! consumer must run full call teardown.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use walkie_common::WalkieResult;

use crate::protocol::SignalingMessage;

/// Events delivered to the channel's single dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A decoded signaling message from the remote peer.
    Message(SignalingMessage),
    /// The connection is gone. Equivalent to a call-end: run full teardown.
    Closed,
    /// Transport-level error. Always followed by `Closed`.
    Error(String),
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// A live signaling connection for one room.
pub struct SignalingChannel {
    writer: Arc<Mutex<WsSink>>,
    connected: watch::Receiver<bool>,
    events: Option<mpsc::Receiver<ChannelEvent>>,
    read_task: JoinHandle<()>,
    keepalive_task: JoinHandle<()>,
}

impl SignalingChannel {
    /// Connect to the relay for `room_id`, optionally identifying as `user_id`.
    ///
    /// Fails with a transport error if the WebSocket handshake cannot be
    /// established.
    pub async fn connect(
        relay_url: &str,
        room_id: &str,
        user_id: Option<&str>,
        keepalive: Duration,
    ) -> WalkieResult<Self> {
        let url = connect_url(relay_url, room_id, user_id);
        let (ws, _) = connect_async(url.as_str()).await?;
        info!(room = %room_id, "Signaling channel connected");

        let (sink, mut stream) = ws.split();
        let writer = Arc::new(Mutex::new(sink));

        let (event_tx, event_rx) = mpsc::channel::<ChannelEvent>(64);
        let (conn_tx, conn_rx) = watch::channel(true);

        let read_task = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if let Some(msg) = parse_frame(text.as_str()) {
                            if event_tx.send(ChannelEvent::Message(msg)).await.is_err() {
                                // Dispatcher went away; stop reading.
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Signaling read error");
                        let _ = event_tx.send(ChannelEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }
            let _ = conn_tx.send(false);
            let _ = event_tx.send(ChannelEvent::Closed).await;
            info!("Signaling channel closed");
        });

        let keepalive_task = tokio::spawn(run_keepalive(Arc::clone(&writer), keepalive));

        Ok(Self {
            writer,
            connected: conn_rx,
            events: Some(event_rx),
            read_task,
            keepalive_task,
        })
    }

    /// Take the inbound event receiver. The channel supports exactly one
    /// dispatcher; the receiver can only be taken once.
    pub fn take_events(&mut self) -> mpsc::Receiver<ChannelEvent> {
        self.events
            .take()
            .expect("signaling events already taken; the channel has a single dispatcher")
    }

    /// Watch channel reflecting whether the connection is open.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }

    /// Send a signaling message. If the channel is no longer open the
    /// failure is logged and swallowed; callers never see send errors.
    pub async fn send(&self, msg: &SignalingMessage) {
        if !*self.connected.borrow() {
            warn!(?msg, "Dropping signaling message: channel not open");
            return;
        }
        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = self.writer.lock().await.send(Message::Text(json.into())).await {
                    warn!(error = %e, "Failed to send signaling message");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode signaling message"),
        }
    }

    /// Close the connection and stop the keep-alive probe.
    pub async fn close(&self) {
        self.keepalive_task.abort();
        let _ = self.writer.lock().await.send(Message::Close(None)).await;
    }
}

impl Drop for SignalingChannel {
    fn drop(&mut self) {
        self.read_task.abort();
        self.keepalive_task.abort();
    }
}

/// Send a bare `"ping"` text frame on a fixed period until the sink errors.
async fn run_keepalive<S>(writer: Arc<Mutex<S>>, period: Duration)
where
    S: futures_util::Sink<Message> + Unpin + Send,
{
    loop {
        sleep(period).await;
        let mut sink = writer.lock().await;
        if sink.send(Message::Text("ping".into())).await.is_err() {
            break;
        }
        debug!("Keep-alive ping sent");
    }
}

/// Build the relay connect URL with room (and optional user) identifiers.
fn connect_url(relay_url: &str, room_id: &str, user_id: Option<&str>) -> String {
    let sep = if relay_url.contains('?') { '&' } else { '?' };
    match user_id {
        Some(uid) => format!("{relay_url}{sep}roomId={room_id}&userId={uid}"),
        None => format!("{relay_url}{sep}roomId={room_id}"),
    }
}

/// Decode one inbound text frame. Bare keep-alive frames and anything that
/// does not parse as a signaling message are logged and skipped.
fn parse_frame(text: &str) -> Option<SignalingMessage> {
    if text == "ping" || text == "pong" {
        return None;
    }
    match serde_json::from_str::<SignalingMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!(error = %e, frame = %text, "Ignoring unrecognized signaling frame");
            None
        }
    }
}
