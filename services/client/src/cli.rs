//! Command-line interface. Flags take precedence over the environment.

use crate::config::Config;
use clap::{Parser, Subcommand};
use countdown_core::{address::derive_socket_url, error::AddressError, session::SessionSettings};
use std::{path::PathBuf, time::Duration};
use url::Url;

#[derive(Parser, Debug)]
#[command(version, about = "Opens one WebSocket session and closes it on a timer")]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Mode,

    /// Milliseconds between connecting and the scripted close.
    #[arg(long, global = true)]
    pub close_after_ms: Option<u64>,

    /// Stop waiting for the timer once the server has closed the connection.
    #[arg(long, global = true)]
    pub cancel_timer_on_close: bool,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Render every server message into a document view.
    Render {
        /// Page location to derive the socket address from.
        #[arg(long)]
        page_url: Option<Url>,
        /// Mirror the document to this HTML file.
        #[arg(long)]
        render_path: Option<PathBuf>,
    },
    /// Log every server message and say goodbye before closing.
    Farewell {
        /// Socket address to connect to.
        #[arg(long)]
        url: Option<Url>,
    },
}

/// What the client will do once resolved against the configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanKind {
    Render { mirror: Option<PathBuf> },
    Farewell,
}

/// A fully resolved session to run.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub url: Url,
    pub kind: PlanKind,
    pub settings: SessionSettings,
}

impl Cli {
    /// Merges the flags over `config` and resolves the socket address.
    pub fn into_plan(self, config: &Config) -> Result<SessionPlan, AddressError> {
        let settings = SessionSettings {
            close_after: self
                .close_after_ms
                .map(Duration::from_millis)
                .unwrap_or(config.close_after),
            cancel_timer_on_close: self.cancel_timer_on_close || config.cancel_timer_on_close,
        };

        let (url, kind) = match self.mode {
            Mode::Render {
                page_url,
                render_path,
            } => {
                let page = page_url.unwrap_or_else(|| config.page_url.clone());
                (
                    derive_socket_url(&page)?,
                    PlanKind::Render {
                        mirror: render_path.or_else(|| config.render_path.clone()),
                    },
                )
            }
            Mode::Farewell { url } => (
                url.unwrap_or_else(|| config.socket_url.clone()),
                PlanKind::Farewell,
            ),
        };

        Ok(SessionPlan {
            url,
            kind,
            settings,
        })
    }
}
