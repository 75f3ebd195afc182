//! Countdown Core Library
//!
//! A single scripted WebSocket session: connect, react to the peer's frames,
//! and shut the connection down on a fixed timer. The platform pieces (the
//! socket itself and the clock) sit behind the `transport` and `timer`
//! traits so the controller in `session` can be driven without a network.

pub mod address;
pub mod error;
pub mod log_sink;
pub mod phase;
pub mod session;
pub mod timer;
pub mod transport;
pub mod view;

use std::time::Duration;

/// Close status sent when the session timer expires. Private-use range.
pub const CLOSE_CODE: u16 = 3000;

/// Close reason sent alongside [`CLOSE_CODE`].
pub const CLOSE_REASON: &str = "Time to die";

/// Text frame sent by the farewell variant right before closing.
pub const FAREWELL_PAYLOAD: &str = "[ALL DONE]";

/// Address used by the farewell variant.
pub const FIXED_SOCKET_URL: &str = "ws://localhost:3000/ws";

/// Delay between session start and the scripted close.
pub const DEFAULT_CLOSE_AFTER: Duration = Duration::from_millis(10_000);

/// Lifecycle notifications fed into a session's event queue.
///
/// The transport produces `Opened`, `Message` and `Closed`; the scheduler
/// produces `TimerFired`. All of them are consumed by one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The handshake completed.
    Opened,
    /// One inbound text frame.
    Message(String),
    /// The connection is gone, whatever the cause.
    Closed,
    /// The shutdown timer expired.
    TimerFired,
}
