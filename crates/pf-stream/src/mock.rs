//! In-memory transport for tests.
//!
//! Sockets opened through [`MockTransport`] do nothing on their own; a test
//! drives them through [`MockSocket`] handles (`accept`, `text`, `fail`, …)
//! and inspects what the client sent.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use pf_core::{
    error::FeedError,
    ws::{EventSender, Socket, SocketEvent, SocketEventKind, Transport},
};

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    sockets: Arc<Mutex<Vec<MockSocket>>>,
}

impl MockTransport {
    pub(crate) fn open_count(&self) -> usize {
        self.sockets.lock().unwrap().len()
    }

    pub(crate) fn socket(&self, idx: usize) -> MockSocket {
        self.sockets.lock().unwrap()[idx].clone()
    }

    pub(crate) fn last(&self) -> MockSocket {
        self.sockets.lock().unwrap().last().cloned().expect("no socket opened")
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &str, conn_id: u64, events: EventSender) -> Box<dyn Socket> {
        let socket = MockSocket {
            inner: Arc::new(MockInner {
                conn_id,
                url: url.to_owned(),
                events,
                sent: Mutex::new(Vec::new()),
                open: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        };
        self.sockets.lock().unwrap().push(socket.clone());
        Box::new(socket)
    }
}

struct MockInner {
    conn_id: u64,
    url: String,
    events: EventSender,
    sent: Mutex<Vec<String>>,
    open: AtomicBool,
    closed: AtomicBool,
}

/// Test-side handle to one opened socket (also the client's `Socket`).
#[derive(Clone)]
pub(crate) struct MockSocket {
    inner: Arc<MockInner>,
}

impl MockSocket {
    fn emit(&self, kind: SocketEventKind) {
        let _ = self.inner.events.send(SocketEvent::new(self.inner.conn_id, kind));
    }

    pub(crate) fn url(&self) -> String {
        self.inner.url.clone()
    }

    /// Complete the handshake.
    pub(crate) fn accept(&self) {
        self.inner.open.store(true, Ordering::SeqCst);
        self.emit(SocketEventKind::Opened);
    }

    pub(crate) fn text(&self, text: impl Into<String>) {
        self.emit(SocketEventKind::Text(text.into()));
    }

    pub(crate) fn binary(&self, data: Vec<u8>) {
        self.emit(SocketEventKind::Binary(data));
    }

    pub(crate) fn error(&self, detail: &str) {
        self.emit(SocketEventKind::Error(detail.into()));
    }

    /// Remote side goes away.
    pub(crate) fn drop_connection(&self) {
        self.inner.open.store(false, Ordering::SeqCst);
        self.emit(SocketEventKind::Closed);
    }

    /// Outbound path breaks; the close event has not been delivered yet.
    pub(crate) fn sever(&self) {
        self.inner.open.store(false, Ordering::SeqCst);
    }

    /// Failed connect: error then close, as the real transport reports it.
    pub(crate) fn fail(&self, detail: &str) {
        self.error(detail);
        self.drop_connection();
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.inner.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent().iter().map(|s| serde_json::from_str(s).unwrap()).collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Socket for MockSocket {
    fn conn_id(&self) -> u64 {
        self.inner.conn_id
    }

    fn send(&self, text: String) -> Result<(), FeedError> {
        if !self.inner.open.load(Ordering::SeqCst) || self.is_closed() {
            return Err(FeedError::Closed);
        }
        self.inner.sent.lock().unwrap().push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.inner.open.store(false, Ordering::SeqCst);
        self.inner.closed.store(true, Ordering::SeqCst);
    }
}
