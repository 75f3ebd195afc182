//! Countdown Client Library Crate
//!
//! Configuration, command-line parsing and the glue that runs a single
//! scripted session. The `countdown-client` binary is a thin wrapper around
//! this library.

pub mod cli;
pub mod config;
pub mod runner;
