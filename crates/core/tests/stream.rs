//! End-to-end session scenarios driven through the public API only

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use relaystream_core::transport::{
    ConnectError, Transport, TransportEvent, CLOSE_POLICY_VIOLATION,
};
use relaystream_core::{
    ConnectionState, Failure, RelaySession, Result, SessionConfig, SessionRoster,
    StaticTokenProvider, StreamError, TerminalSurface, TransportConnector,
};

#[derive(Clone, Default)]
struct RecordingSurface {
    output: Arc<Mutex<String>>,
}

impl RecordingSurface {
    fn output(&self) -> String {
        self.output.lock().unwrap().clone()
    }
}

impl TerminalSurface for RecordingSurface {
    fn write(&mut self, text: &str) -> Result<()> {
        self.output.lock().unwrap().push_str(text);
        Ok(())
    }

    fn resize(&mut self, _cols: u16, _rows: u16) -> Result<()> {
        Ok(())
    }
}

struct FixedRoster(Vec<String>);

#[async_trait]
impl SessionRoster for FixedRoster {
    async fn list_sessions(&self, _token: &str) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

struct ChannelTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    sent: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sent
            .send(text)
            .map_err(|_| StreamError::NotConnected)?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) {
        self.events.close();
    }
}

struct RelayHandle {
    events: mpsc::UnboundedSender<TransportEvent>,
    sent: mpsc::UnboundedReceiver<String>,
}

fn transport_pair() -> (ChannelTransport, RelayHandle) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    (
        ChannelTransport {
            events: event_rx,
            sent: sent_tx,
        },
        RelayHandle {
            events: event_tx,
            sent: sent_rx,
        },
    )
}

struct QueueConnector {
    transports: Mutex<VecDeque<ChannelTransport>>,
    attempts: Mutex<usize>,
}

impl QueueConnector {
    fn new(transports: Vec<ChannelTransport>) -> Arc<Self> {
        Arc::new(Self {
            transports: Mutex::new(transports.into()),
            attempts: Mutex::new(0),
        })
    }

    fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl TransportConnector for QueueConnector {
    async fn connect(
        &self,
        _url: &str,
        _token: &str,
    ) -> std::result::Result<Box<dyn Transport>, ConnectError> {
        *self.attempts.lock().unwrap() += 1;
        match self.transports.lock().unwrap().pop_front() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(ConnectError::Failed("relay unreachable".to_string())),
        }
    }
}

fn start(connector: Arc<QueueConnector>, surface: RecordingSurface) -> RelaySession {
    RelaySession::start(
        "abc",
        SessionConfig::default(),
        Arc::new(StaticTokenProvider::new(Some("tok".to_string()))),
        Arc::new(FixedRoster(vec!["abc".to_string()])),
        connector,
        Box::new(surface),
    )
}

#[tokio::test(start_paused = true)]
async fn full_session_lifecycle() {
    let (transport, mut relay) = transport_pair();
    let connector = QueueConnector::new(vec![transport]);
    let surface = RecordingSurface::default();
    let session = start(connector.clone(), surface.clone());

    let mut state = session.watch_state();
    state
        .wait_for(|s| *s == ConnectionState::Connected)
        .await
        .unwrap();
    assert_eq!(
        relay.sent.recv().await.unwrap(),
        r#"{"type":"join_session","session_id":"abc"}"#
    );

    // One output frame, header and payload fragmented across messages.
    let _ = relay.events.send(TransportEvent::Binary(Bytes::from_static(&[0, 0, 0])));
    let _ = relay
        .events
        .send(TransportEvent::Binary(Bytes::from_static(&[0, 5, b'h', b'e'])));
    let _ = relay
        .events
        .send(TransportEvent::Binary(Bytes::from_static(b"llo")));

    for _ in 0..1000 {
        if surface.output() == "hello" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(surface.output(), "hello");

    // Keystrokes go back out as input messages.
    session.input("q");
    assert_eq!(
        relay.sent.recv().await.unwrap(),
        r#"{"type":"input","data":"q"}"#
    );

    // Remote end of session is terminal; stopping afterwards is harmless.
    let _ = relay
        .events
        .send(TransportEvent::Text(r#"{"type":"session_ended"}"#.to_string()));
    assert_eq!(session.wait_terminal().await, ConnectionState::Ended);
    assert_eq!(connector.attempts(), 1);
    session.stop().await;
}

#[tokio::test(start_paused = true)]
async fn auth_rejecting_close_never_reconnects() {
    let (transport, relay) = transport_pair();
    let connector = QueueConnector::new(vec![transport]);
    let session = start(connector.clone(), RecordingSurface::default());

    let mut state = session.watch_state();
    state
        .wait_for(|s| *s == ConnectionState::Connected)
        .await
        .unwrap();
    let _ = relay.events.send(TransportEvent::Closed {
        code: Some(CLOSE_POLICY_VIOLATION),
    });

    assert_eq!(
        session.wait_terminal().await,
        ConnectionState::Failed(Failure::AuthRejected)
    );

    // Well past any reconnect delay: still only the original attempt.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempts(), 1);
    session.stop().await;
}
