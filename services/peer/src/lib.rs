//! Countdown Peer Library Crate
//!
//! The server end the countdown clients talk to: a single `/ws` endpoint
//! that greets every client and then closes on it.

pub mod config;
pub mod server;
