//! The session lifecycle controller.
//!
//! A [`SessionController`] owns exactly one connection. Construction opens
//! the connection and arms the shutdown timer; [`SessionController::run`]
//! then drains a single event queue, so the open, message, close and timer
//! handlers never run concurrently.

use crate::{
    CLOSE_CODE, CLOSE_REASON, DEFAULT_CLOSE_AFTER, FAREWELL_PAYLOAD, SessionEvent,
    error::SessionError,
    log_sink::LogSink,
    phase::{Phase, Transition},
    timer::Scheduler,
    transport::{Link, Transport},
    view::Renderer,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Line logged when the handshake completes.
pub const OPENED_LINE: &str = "WebSocket connection opened";

/// Line logged when the connection is gone.
pub const CLOSED_LINE: &str = "WebSocket connection closed";

/// Prefix for inbound frames logged by the farewell variant.
pub const MESSAGE_PREFIX: &str = "Message from server: ";

const EVENT_QUEUE_DEPTH: usize = 64;

/// What a session does with inbound frames and at shutdown.
#[derive(Clone)]
pub enum Variant {
    /// Renders every frame into the document, replacing what was there.
    Render(Arc<dyn Renderer>),
    /// Logs every frame and sends [`FAREWELL_PAYLOAD`] right before closing.
    Farewell,
}

impl Variant {
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Render(_) => "render",
            Variant::Farewell => "farewell",
        }
    }
}

/// Tunables for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Delay between construction and the scripted close.
    pub close_after: Duration,
    /// Cancel the shutdown timer when the peer closes first.
    pub cancel_timer_on_close: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            close_after: DEFAULT_CLOSE_AFTER,
            cancel_timer_on_close: false,
        }
    }
}

/// Which side ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseInitiator {
    Local,
    Remote,
}

/// What happened over a session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub messages: usize,
    pub close_events: usize,
    pub closed_by: Option<CloseInitiator>,
    pub farewell_sent: bool,
}

/// Drives one connection from open to close.
pub struct SessionController {
    url: Url,
    variant: Variant,
    log: Arc<dyn LogSink>,
    link: Box<dyn Link>,
    events: mpsc::Receiver<SessionEvent>,
    timer: CancellationToken,
    timer_settled: bool,
    settings: SessionSettings,
    phase: Phase,
    messages: usize,
    close_events: usize,
    close_requested: bool,
    farewell_sent: bool,
}

impl SessionController {
    /// Opens the connection to `url` and arms the shutdown timer.
    ///
    /// Must be called inside a Tokio runtime when the default transport or
    /// scheduler is used.
    pub fn start(
        url: Url,
        variant: Variant,
        log: Arc<dyn LogSink>,
        transport: &dyn Transport,
        scheduler: &dyn Scheduler,
        settings: SessionSettings,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        info!(%url, variant = variant.name(), close_after = ?settings.close_after, "Starting session.");
        let link = transport.open(&url, events_tx.clone());
        let timer = scheduler.arm(settings.close_after, events_tx);

        Self {
            url,
            variant,
            log,
            link,
            events: events_rx,
            timer,
            timer_settled: false,
            settings,
            phase: Phase::Connecting,
            messages: 0,
            close_events: 0,
            close_requested: false,
            farewell_sent: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Processes events until the connection is closed and the timer has
    /// either fired or been cancelled.
    #[instrument(name = "session", skip_all, fields(url = %self.url))]
    pub async fn run(mut self) -> SessionSummary {
        while !self.is_finished() {
            let Some(event) = self.events.recv().await else {
                warn!("Event queue drained before the session finished.");
                break;
            };
            self.dispatch(event).await;
        }

        SessionSummary {
            messages: self.messages,
            close_events: self.close_events,
            closed_by: self.closed_by(),
            farewell_sent: self.farewell_sent,
        }
    }

    fn is_finished(&self) -> bool {
        self.phase == Phase::Closed && self.timer_settled
    }

    fn closed_by(&self) -> Option<CloseInitiator> {
        match (self.phase, self.close_requested) {
            (Phase::Closed, true) => Some(CloseInitiator::Local),
            (Phase::Closed, false) => Some(CloseInitiator::Remote),
            _ => None,
        }
    }

    async fn dispatch(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Opened => self.on_open(),
            SessionEvent::Message(payload) => self.on_message(&payload),
            SessionEvent::Closed => self.on_close(),
            SessionEvent::TimerFired => self.on_timer().await,
        }
    }

    fn advance(&mut self, transition: Transition) -> bool {
        match self.phase.apply(transition) {
            Some(next) => {
                debug!(from = %self.phase, to = %next, "Phase change.");
                self.phase = next;
                true
            }
            None => {
                debug!(phase = %self.phase, ?transition, "Transition ignored.");
                false
            }
        }
    }

    fn on_open(&mut self) {
        if self.advance(Transition::Opened) {
            self.log.line(OPENED_LINE);
        }
    }

    fn on_message(&mut self, payload: &str) {
        if !self.phase.is_open() {
            debug!(phase = %self.phase, "Dropping frame received outside the open phase.");
            return;
        }
        self.messages += 1;
        match &self.variant {
            Variant::Render(renderer) => renderer.render(payload),
            Variant::Farewell => self.log.line(&format!("{}{}", MESSAGE_PREFIX, payload)),
        }
    }

    fn on_close(&mut self) {
        if !self.advance(Transition::Closed) {
            return;
        }
        self.close_events += 1;
        self.log.line(CLOSED_LINE);

        if self.settings.cancel_timer_on_close && !self.timer_settled {
            self.timer.cancel();
            self.timer_settled = true;
            debug!("Shutdown timer cancelled after close.");
        }
    }

    async fn on_timer(&mut self) {
        if self.timer_settled || self.timer.is_cancelled() {
            return;
        }
        self.timer_settled = true;
        info!(phase = %self.phase, "Session timer expired.");

        if matches!(self.variant, Variant::Farewell) {
            match self.send_farewell().await {
                Ok(()) => self.farewell_sent = true,
                Err(e) => debug!(error = %e, "Farewell not sent."),
            }
        }
        self.close().await;
    }

    async fn send_farewell(&mut self) -> Result<(), SessionError> {
        if !self.phase.is_open() {
            return Err(SessionError::InvalidPhase("send", self.phase));
        }
        self.link.send_text(FAREWELL_PAYLOAD).await
    }

    /// Requests the scripted close. A no-op once a close is underway or done.
    async fn close(&mut self) {
        if !self.phase.accepts_close() {
            debug!(phase = %self.phase, "Close skipped; connection already closing or closed.");
            return;
        }
        self.advance(Transition::CloseRequested);
        self.close_requested = true;
        if let Err(e) = self.link.close(CLOSE_CODE, CLOSE_REASON).await {
            warn!(error = %e, "Close request failed.");
        }
    }
}
