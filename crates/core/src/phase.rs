//! Lifecycle phases of a session and the legal moves between them.

use std::fmt;

/// Where a session is in its lifetime. `Open` is never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Something that may move a session to another phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The transport finished its handshake.
    Opened,
    /// The local side asked for the connection to be closed.
    CloseRequested,
    /// The transport reported the connection gone.
    Closed,
}

impl Phase {
    /// Returns the phase reached by applying `transition`, or `None` if the
    /// transition does not apply in the current phase.
    pub fn apply(self, transition: Transition) -> Option<Phase> {
        match (self, transition) {
            (Phase::Connecting, Transition::Opened) => Some(Phase::Open),
            (Phase::Connecting | Phase::Open, Transition::CloseRequested) => Some(Phase::Closing),
            (Phase::Connecting | Phase::Open | Phase::Closing, Transition::Closed) => {
                Some(Phase::Closed)
            }
            _ => None,
        }
    }

    pub fn is_open(self) -> bool {
        self == Phase::Open
    }

    /// A close request is only meaningful before one is already underway.
    pub fn accepts_close(self) -> bool {
        matches!(self, Phase::Connecting | Phase::Open)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connecting => "connecting",
            Phase::Open => "open",
            Phase::Closing => "closing",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}
