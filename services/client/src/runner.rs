//! Runs a resolved [`SessionPlan`] on the real transport and clock.

use crate::cli::{PlanKind, SessionPlan};
use countdown_core::{
    log_sink::LogSink,
    session::{SessionController, SessionSummary, Variant},
    timer::TokioScheduler,
    transport::TungsteniteTransport,
    view::DocumentBody,
};
use std::sync::Arc;

/// Result of running a plan.
#[derive(Debug)]
pub struct Outcome {
    pub summary: SessionSummary,
    /// The document, for the render variant.
    pub document: Option<Arc<DocumentBody>>,
}

/// Connects, runs the session to completion and reports what happened.
pub async fn execute(plan: SessionPlan, log: Arc<dyn LogSink>) -> Outcome {
    let document = match &plan.kind {
        PlanKind::Render { mirror: Some(path) } => Some(Arc::new(DocumentBody::with_mirror(path))),
        PlanKind::Render { mirror: None } => Some(Arc::new(DocumentBody::new())),
        PlanKind::Farewell => None,
    };
    let variant = match &document {
        Some(document) => Variant::Render(document.clone()),
        None => Variant::Farewell,
    };

    let session = SessionController::start(
        plan.url,
        variant,
        log,
        &TungsteniteTransport::default(),
        &TokioScheduler,
        plan.settings,
    );
    let summary = session.run().await;

    Outcome { summary, document }
}
