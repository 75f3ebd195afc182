//! The `/ws` endpoint.
//!
//! Each connection is split in two halves that run side by side: the writer
//! greets the client and closes on it, the reader logs whatever the client
//! sends until the client's close frame arrives.

use axum::{
    Router,
    extract::{
        ConnectInfo, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
    routing::get,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::{future::Future, net::SocketAddr, ops::ControlFlow, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Reason sent with the peer's own close frame.
pub const CLOSE_REASON: &str = "Night-night";

/// How long the writer waits after the greeting before closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Linger {
    /// Close right after the greeting.
    #[default]
    Immediate,
    /// Close after a delay, unless the client closes first.
    For(Duration),
    /// Never close; wait for the client to do it.
    Forever,
}

/// What the peer saw, for callers that want to watch a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Connected(SocketAddr),
    Text {
        from: SocketAddr,
        text: String,
    },
    Closed {
        from: SocketAddr,
        code: Option<u16>,
        reason: Option<String>,
    },
}

/// Shared state handed to every connection.
#[derive(Clone, Debug, Default)]
pub struct PeerState {
    pub linger: Linger,
    pub observer: Option<mpsc::UnboundedSender<PeerEvent>>,
}

impl PeerState {
    pub fn new(linger: Linger) -> Self {
        Self {
            linger,
            observer: None,
        }
    }

    /// Reports every [`PeerEvent`] to `observer`.
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<PeerEvent>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn observe(&self, event: PeerEvent) {
        if let Some(observer) = &self.observer {
            let _ = observer.send(event);
        }
    }
}

/// Creates the router with the single `/ws` route.
pub fn create_router(state: Arc<PeerState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<PeerState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<PeerState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

#[instrument(name = "peer_conn", skip_all, fields(from = %from))]
async fn handle_socket(socket: WebSocket, from: SocketAddr, state: Arc<PeerState>) {
    info!("Client connected.");
    state.observe(PeerEvent::Connected(from));

    let (sender, receiver) = socket.split();
    let client_done = CancellationToken::new();

    tokio::join!(
        write(sender, from, state.linger, client_done.clone()),
        read(receiver, from, &state, client_done),
    );
    info!("Connection finished.");
}

/// Greets the client, then closes the connection once the linger is over.
async fn write(
    mut sender: SplitSink<WebSocket, Message>,
    from: SocketAddr,
    linger: Linger,
    client_done: CancellationToken,
) {
    let greeting = format!("Hello there client {from}!");
    if let Err(e) = sender.send(Message::Text(greeting.into())).await {
        warn!(error = %e, "Could not send greeting.");
        return;
    }

    let close_first = match linger {
        Linger::Immediate => true,
        Linger::For(delay) => tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            () = client_done.cancelled() => false,
        },
        Linger::Forever => {
            client_done.cancelled().await;
            false
        }
    };

    if close_first {
        info!("Closing the connection for {from}.");
        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: Utf8Bytes::from_static(CLOSE_REASON),
        };
        if let Err(e) = sender.send(Message::Close(Some(frame))).await {
            warn!(error = %e, "Unable to close the connection.");
        }
    } else if let Err(e) = sender.close().await {
        // The client closed first; this only flushes the close reply.
        debug!(error = %e, "Close reply not flushed.");
    }
}

/// Logs client messages until the client closes or the socket breaks.
async fn read(
    mut receiver: SplitStream<WebSocket>,
    from: SocketAddr,
    state: &PeerState,
    client_done: CancellationToken,
) {
    while let Some(Ok(message)) = receiver.next().await {
        if handle_message(message, from, state).is_break() {
            break;
        }
    }
    client_done.cancel();
}

fn handle_message(message: Message, from: SocketAddr, state: &PeerState) -> ControlFlow<()> {
    match message {
        Message::Text(text) => {
            info!("{from} sent the following text message: {:?}", text.as_str());
            state.observe(PeerEvent::Text {
                from,
                text: text.as_str().to_owned(),
            });
        }
        Message::Binary(data) => {
            debug!(len = data.len(), "Ignoring binary message.");
        }
        Message::Ping(_) | Message::Pong(_) => {}
        Message::Close(Some(frame)) => {
            info!(
                code = frame.code,
                reason = frame.reason.as_str(),
                "{from} asked to close."
            );
            state.observe(PeerEvent::Closed {
                from,
                code: Some(frame.code),
                reason: Some(frame.reason.as_str().to_owned()),
            });
            return ControlFlow::Break(());
        }
        Message::Close(None) => {
            info!("{from} closed without a close frame.");
            state.observe(PeerEvent::Closed {
                from,
                code: None,
                reason: None,
            });
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:4242".parse().unwrap()
    }

    #[test]
    fn test_text_is_observed_and_continues() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = PeerState::default().with_observer(tx);

        let flow = handle_message(Message::Text(Utf8Bytes::from_static("[ALL DONE]")), addr(), &state);
        assert!(flow.is_continue());
        assert_eq!(
            rx.try_recv().unwrap(),
            PeerEvent::Text {
                from: addr(),
                text: "[ALL DONE]".to_string()
            }
        );
    }

    #[test]
    fn test_close_frame_breaks_and_reports_code() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = PeerState::default().with_observer(tx);

        let frame = CloseFrame {
            code: 3000,
            reason: Utf8Bytes::from_static("Time to die"),
        };
        let flow = handle_message(Message::Close(Some(frame)), addr(), &state);
        assert!(flow.is_break());
        assert_eq!(
            rx.try_recv().unwrap(),
            PeerEvent::Closed {
                from: addr(),
                code: Some(3000),
                reason: Some("Time to die".to_string())
            }
        );
    }

    #[test]
    fn test_bare_close_breaks() {
        let state = PeerState::new(Linger::Forever);
        let flow = handle_message(Message::Close(None), addr(), &state);
        assert!(flow.is_break());
    }

    #[test]
    fn test_binary_and_control_frames_are_ignored() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = PeerState::default().with_observer(tx);

        assert!(handle_message(Message::Binary(vec![1, 2, 3].into()), addr(), &state).is_continue());
        assert!(handle_message(Message::Ping(Vec::new().into()), addr(), &state).is_continue());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_default_linger_is_immediate() {
        assert_eq!(PeerState::default().linger, Linger::Immediate);
    }
}
