use thiserror::Error;

/// Failures while turning a page location into a socket address.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid URL: {0}")]
    Parse(#[from] url::ParseError),
}

/// Failures reported by a [`Link`](crate::transport::Link).
///
/// The controller never acts on these beyond logging them: any broken
/// connection is reported to it as a plain close.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection task has already terminated")]
    LinkGone,
    #[error("cannot {0} while the connection is {1}")]
    InvalidPhase(&'static str, crate::phase::Phase),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
