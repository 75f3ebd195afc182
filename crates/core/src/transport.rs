//! WebSocket transport behind the session controller.
//!
//! A transport turns a connection into a stream of [`SessionEvent`]s and
//! hands back a [`Link`] for the two things the controller ever does to a
//! connection: send a text frame and close it.

use crate::{SessionEvent, error::SessionError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::time::Duration;
use tokio::{net::TcpStream, sync::mpsc, time::Instant};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::protocol::{CloseFrame, Message, frame::coding::CloseCode},
};
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

/// How long a local close waits for the peer's close reply.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Outbound half of a connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Link: Send {
    /// Queues one text frame.
    async fn send_text(&mut self, payload: &str) -> Result<(), SessionError>;

    /// Starts the close handshake, or abandons a handshake still in progress.
    async fn close(&mut self, code: u16, reason: &str) -> Result<(), SessionError>;
}

/// Opens connections.
pub trait Transport: Send + Sync {
    /// Starts connecting to `url` in the background.
    ///
    /// `Opened`, `Message` and `Closed` events are posted to `events` in wire
    /// order. `Closed` is posted exactly once per connection, including when
    /// the handshake fails.
    fn open(&self, url: &Url, events: mpsc::Sender<SessionEvent>) -> Box<dyn Link>;
}

#[derive(Debug)]
enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

/// A [`Link`] that forwards requests to the task owning the socket.
struct ChannelLink {
    outbound: mpsc::UnboundedSender<Outbound>,
}

#[async_trait]
impl Link for ChannelLink {
    async fn send_text(&mut self, payload: &str) -> Result<(), SessionError> {
        self.outbound
            .send(Outbound::Text(payload.to_owned()))
            .map_err(|_| SessionError::LinkGone)
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), SessionError> {
        self.outbound
            .send(Outbound::Close {
                code,
                reason: reason.to_owned(),
            })
            .map_err(|_| SessionError::LinkGone)
    }
}

/// Transport on top of `tokio-tungstenite`. Supports `ws` and `wss`.
#[derive(Debug, Clone, Copy)]
pub struct TungsteniteTransport {
    close_timeout: Duration,
}

impl TungsteniteTransport {
    /// Drops the socket if the peer has not answered a local close within
    /// `close_timeout`.
    pub fn with_close_timeout(close_timeout: Duration) -> Self {
        Self { close_timeout }
    }
}

impl Default for TungsteniteTransport {
    fn default() -> Self {
        Self::with_close_timeout(DEFAULT_CLOSE_TIMEOUT)
    }
}

impl Transport for TungsteniteTransport {
    fn open(&self, url: &Url, events: mpsc::Sender<SessionEvent>) -> Box<dyn Link> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let span = info_span!("socket", url = %url);
        let task = drive(url.clone(), events, outbound_rx, self.close_timeout);
        tokio::spawn(task.instrument(span));
        Box::new(ChannelLink {
            outbound: outbound_tx,
        })
    }
}

/// Owns one socket from handshake to teardown.
async fn drive(
    url: Url,
    events: mpsc::Sender<SessionEvent>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    close_timeout: Duration,
) {
    let connect = connect_async(url.as_str());
    tokio::pin!(connect);

    let socket = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((socket, _response)) => break socket,
                Err(e) => {
                    warn!(error = %e, "WebSocket handshake failed.");
                    report(&events, SessionEvent::Closed).await;
                    return;
                }
            },
            command = outbound.recv() => match command {
                Some(Outbound::Text(_)) => {
                    warn!("Dropping text frame queued before the handshake completed.");
                }
                Some(Outbound::Close { .. }) | None => {
                    info!("Handshake abandoned by the local side.");
                    report(&events, SessionEvent::Closed).await;
                    return;
                }
            },
        }
    };

    info!("WebSocket handshake complete.");
    report(&events, SessionEvent::Opened).await;

    let (mut sink, mut stream) = socket.split();
    let mut accepting_commands = true;
    let close_deadline = tokio::time::sleep(close_timeout);
    tokio::pin!(close_deadline);
    let mut close_sent = false;

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    report(&events, SessionEvent::Message(text.as_str().to_owned())).await;
                }
                Some(Ok(Message::Close(Some(frame)))) => {
                    debug!(
                        code = u16::from(frame.code),
                        reason = frame.reason.as_str(),
                        "Peer sent a close frame."
                    );
                }
                Some(Ok(Message::Close(None))) => {
                    debug!("Peer sent a close frame without a status.");
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!(len = data.len(), "Ignoring binary frame.");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket read failed.");
                    break;
                }
                None => break,
            },
            command = outbound.recv(), if accepting_commands => match command {
                Some(Outbound::Text(payload)) => {
                    if let Err(e) = write(&mut sink, Message::Text(payload.into())).await {
                        warn!(error = %e, "Failed to send text frame.");
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    if let Err(e) = write(&mut sink, Message::Close(Some(frame))).await {
                        warn!(error = %e, "Failed to send close frame.");
                    }
                    if !close_sent {
                        close_sent = true;
                        close_deadline.as_mut().reset(Instant::now() + close_timeout);
                    }
                }
                None => accepting_commands = false,
            },
            () = &mut close_deadline, if close_sent => {
                warn!(timeout = ?close_timeout, "Peer never answered the close; dropping the socket.");
                break;
            },
        }
    }

    info!("WebSocket connection finished.");
    report(&events, SessionEvent::Closed).await;
}

async fn write(sink: &mut WsSink, message: Message) -> Result<(), SessionError> {
    sink.send(message).await?;
    Ok(())
}

async fn report(events: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if events.send(event).await.is_err() {
        debug!("Session is no longer listening for transport events.");
    }
}
