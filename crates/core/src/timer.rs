//! One-shot timers that post into a session's event queue.

use crate::SessionEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Arms one-shot timers.
pub trait Scheduler: Send + Sync {
    /// Posts [`SessionEvent::TimerFired`] to `events` once `delay` has
    /// elapsed, unless the returned token is cancelled first.
    fn arm(&self, delay: Duration, events: mpsc::Sender<SessionEvent>) -> CancellationToken;
}

/// Timers backed by `tokio::time`. Must be used inside a Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn arm(&self, delay: Duration, events: mpsc::Sender<SessionEvent>) -> CancellationToken {
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if events.send(SessionEvent::TimerFired).await.is_err() {
                        debug!("Session gone before its timer fired.");
                    }
                }
                () = cancel.cancelled() => {
                    debug!("Session timer cancelled.");
                }
            }
        });
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::channel(4);
        let start = tokio::time::Instant::now();
        let _token = TokioScheduler.arm(Duration::from_secs(10), tx);

        let event = rx.recv().await;
        assert_eq!(event, Some(SessionEvent::TimerFired));
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::channel(4);
        let token = TokioScheduler.arm(Duration::from_secs(10), tx);

        tokio::time::sleep(Duration::from_secs(3)).await;
        token.cancel();

        // The sender is dropped with the timer task, so the queue drains empty.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_is_one_shot() {
        let (tx, mut rx) = mpsc::channel(4);
        let _token = TokioScheduler.arm(Duration::from_millis(500), tx);

        assert_eq!(rx.recv().await, Some(SessionEvent::TimerFired));
        assert_eq!(rx.recv().await, None);
    }
}
