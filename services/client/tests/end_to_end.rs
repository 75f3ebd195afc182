//! Runs the client against a real peer on an ephemeral port.

use countdown_client::{
    cli::{PlanKind, SessionPlan},
    runner::execute,
};
use countdown_core::{
    address::socket_url_for_page,
    log_sink::MemoryLog,
    session::{CLOSED_LINE, CloseInitiator, MESSAGE_PREFIX, OPENED_LINE, SessionSettings},
    view::message_view,
};
use countdown_peer::server::{Linger, PeerEvent, PeerState, serve};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot},
    time::Instant,
};
use url::Url;

const SHORT_TIMER: Duration = Duration::from_millis(300);

struct RunningPeer {
    addr: SocketAddr,
    events: mpsc::UnboundedReceiver<PeerEvent>,
    _stop: oneshot::Sender<()>,
}

impl RunningPeer {
    fn drain(&mut self) -> Vec<PeerEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }
}

async fn start_peer(linger: Linger) -> RunningPeer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (events_tx, events) = mpsc::unbounded_channel();
    let (stop, stopped) = oneshot::channel::<()>();
    let state = Arc::new(PeerState::new(linger).with_observer(events_tx));
    tokio::spawn(serve(listener, state, async {
        let _ = stopped.await;
    }));
    RunningPeer {
        addr,
        events,
        _stop: stop,
    }
}

fn settings() -> SessionSettings {
    SessionSettings {
        close_after: SHORT_TIMER,
        cancel_timer_on_close: false,
    }
}

#[tokio::test]
async fn farewell_session_says_goodbye_then_closes() {
    let mut peer = start_peer(Linger::Forever).await;
    let log = MemoryLog::new();
    let plan = SessionPlan {
        url: Url::parse(&format!("ws://{}/ws", peer.addr)).unwrap(),
        kind: PlanKind::Farewell,
        settings: settings(),
    };

    let outcome = tokio::time::timeout(Duration::from_secs(10), execute(plan, Arc::new(log.clone())))
        .await
        .expect("session finishes");

    assert!(outcome.summary.farewell_sent);
    assert_eq!(outcome.summary.messages, 1);
    assert_eq!(outcome.summary.close_events, 1);
    assert_eq!(outcome.summary.closed_by, Some(CloseInitiator::Local));
    assert!(outcome.document.is_none());

    let lines = log.lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], OPENED_LINE);
    assert!(lines[1].starts_with(&format!("{MESSAGE_PREFIX}Hello there client 127.0.0.1:")));
    assert_eq!(lines[2], CLOSED_LINE);

    let seen: Vec<PeerEvent> = peer
        .drain()
        .into_iter()
        .filter(|event| !matches!(event, PeerEvent::Connected(_)))
        .collect();
    assert_eq!(seen.len(), 2);
    assert!(matches!(&seen[0], PeerEvent::Text { text, .. } if text == "[ALL DONE]"));
    assert!(matches!(
        &seen[1],
        PeerEvent::Closed { code: Some(3000), reason: Some(reason), .. } if reason == "Time to die"
    ));
}

#[tokio::test]
async fn render_session_shows_greeting_and_survives_remote_close() {
    let peer = start_peer(Linger::Immediate).await;
    let log = MemoryLog::new();
    let plan = SessionPlan {
        url: socket_url_for_page(&format!("http://{}/index.html", peer.addr)).unwrap(),
        kind: PlanKind::Render { mirror: None },
        settings: settings(),
    };

    let begin = Instant::now();
    let outcome = tokio::time::timeout(Duration::from_secs(10), execute(plan, Arc::new(log.clone())))
        .await
        .expect("session finishes");

    // The peer closed first, but the session still waits for its timer.
    assert!(begin.elapsed() >= SHORT_TIMER);
    assert_eq!(outcome.summary.closed_by, Some(CloseInitiator::Remote));
    assert_eq!(outcome.summary.close_events, 1);
    assert_eq!(outcome.summary.messages, 1);
    assert!(!outcome.summary.farewell_sent);

    let document = outcome.document.expect("render sessions keep a document");
    let content = document.content();
    let open_tag = message_view("");
    let open_tag = open_tag.trim_end_matches("</div>");
    assert!(content.starts_with(&format!("{open_tag}Hello there client 127.0.0.1:")));
    assert!(content.ends_with("!</div>"));
    assert_eq!(log.lines(), vec![OPENED_LINE, CLOSED_LINE]);
}

#[tokio::test]
async fn render_session_mirrors_document_to_file() {
    let peer = start_peer(Linger::Immediate).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.html");
    let plan = SessionPlan {
        url: socket_url_for_page(&format!("http://{}/", peer.addr)).unwrap(),
        kind: PlanKind::Render {
            mirror: Some(path.clone()),
        },
        settings: SessionSettings {
            cancel_timer_on_close: true,
            ..settings()
        },
    };

    let outcome = tokio::time::timeout(Duration::from_secs(10), execute(plan, Arc::new(MemoryLog::new())))
        .await
        .expect("session finishes");

    assert_eq!(outcome.summary.closed_by, Some(CloseInitiator::Remote));
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("Hello there client 127.0.0.1:"));
}

#[tokio::test]
async fn unreachable_server_ends_in_a_single_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let log = MemoryLog::new();
    let plan = SessionPlan {
        url: Url::parse(&format!("ws://{}/ws", addr)).unwrap(),
        kind: PlanKind::Farewell,
        settings: settings(),
    };

    let outcome = tokio::time::timeout(Duration::from_secs(10), execute(plan, Arc::new(log.clone())))
        .await
        .expect("session finishes");

    assert_eq!(outcome.summary.close_events, 1);
    assert_eq!(outcome.summary.messages, 0);
    assert!(!outcome.summary.farewell_sent);
    assert_eq!(log.lines(), vec![CLOSED_LINE]);
}

