//! Scripted in-memory transports.
//!
//! Every open is counted, live connections are tracked (including the peak),
//! and each accepted connection exposes a peer handle that plays the server
//! side.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::transport::{
    EventStream, ServerSentEvent, SocketConnection, TransportError, TransportProvider,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Let spawned tasks run until they block. With a paused clock this also
/// advances time by one millisecond.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[derive(Default)]
struct MockState {
    websocket_unavailable: AtomicBool,
    socket_opens: AtomicUsize,
    stream_opens: AtomicUsize,
    live: Arc<AtomicUsize>,
    peak_live: Arc<AtomicUsize>,
    scripted: Mutex<VecDeque<TransportError>>,
    fail_always: Mutex<Option<TransportError>>,
    urls: Mutex<Vec<Url>>,
    sockets: Mutex<Vec<MockSocketPeer>>,
    streams: Mutex<Vec<MockStreamPeer>>,
}

impl MockState {
    fn next_failure(&self) -> Option<TransportError> {
        if let Some(err) = lock(&self.scripted).pop_front() {
            return Some(err);
        }
        lock(&self.fail_always).clone()
    }

    fn connect(&self) -> LiveGuard {
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_live.fetch_max(now, Ordering::SeqCst);
        LiveGuard {
            live: self.live.clone(),
        }
    }
}

/// Decrements the live counter when the client drops its connection.
struct LiveGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct MockTransports {
    state: Arc<MockState>,
}

impl MockTransports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_websocket_available(&self, available: bool) {
        self.state
            .websocket_unavailable
            .store(!available, Ordering::SeqCst);
    }

    /// Fail the next open (of either kind) with `err`. Calls queue up.
    pub fn fail_next(&self, err: TransportError) {
        lock(&self.state.scripted).push_back(err);
    }

    /// Fail every open once the scripted failures are used up.
    pub fn fail_always(&self, err: TransportError) {
        *lock(&self.state.fail_always) = Some(err);
    }

    pub fn stop_failing(&self) {
        lock(&self.state.scripted).clear();
        *lock(&self.state.fail_always) = None;
    }

    pub fn socket_opens(&self) -> usize {
        self.state.socket_opens.load(Ordering::SeqCst)
    }

    pub fn stream_opens(&self) -> usize {
        self.state.stream_opens.load(Ordering::SeqCst)
    }

    /// Connections the client currently holds.
    pub fn live(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    /// Most connections ever held at once.
    pub fn peak_live(&self) -> usize {
        self.state.peak_live.load(Ordering::SeqCst)
    }

    /// Every URL an open was attempted on, in order.
    pub fn urls(&self) -> Vec<Url> {
        lock(&self.state.urls).clone()
    }

    pub fn sockets(&self) -> Vec<MockSocketPeer> {
        lock(&self.state.sockets).clone()
    }

    pub fn last_socket(&self) -> Option<MockSocketPeer> {
        lock(&self.state.sockets).last().cloned()
    }

    pub fn last_stream(&self) -> Option<MockStreamPeer> {
        lock(&self.state.streams).last().cloned()
    }
}

#[async_trait]
impl TransportProvider for MockTransports {
    fn websocket_available(&self) -> bool {
        !self.state.websocket_unavailable.load(Ordering::SeqCst)
    }

    async fn open_socket(&self, url: &Url) -> Result<Box<dyn SocketConnection>, TransportError> {
        self.state.socket_opens.fetch_add(1, Ordering::SeqCst);
        lock(&self.state.urls).push(url.clone());
        if let Some(err) = self.state.next_failure() {
            return Err(err);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let peer = MockSocketPeer {
            inbound: Arc::new(Mutex::new(Some(tx))),
            sent: Arc::new(Mutex::new(Vec::new())),
        };
        lock(&self.state.sockets).push(peer.clone());

        Ok(Box::new(MockSocket {
            inbound: rx,
            sent: peer.sent.clone(),
            _live: self.state.connect(),
        }))
    }

    async fn open_event_stream(&self, url: &Url) -> Result<Box<dyn EventStream>, TransportError> {
        self.state.stream_opens.fetch_add(1, Ordering::SeqCst);
        lock(&self.state.urls).push(url.clone());
        if let Some(err) = self.state.next_failure() {
            return Err(err);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let peer = MockStreamPeer {
            inbound: Arc::new(Mutex::new(Some(tx))),
        };
        lock(&self.state.streams).push(peer.clone());

        Ok(Box::new(MockStream {
            inbound: rx,
            _live: self.state.connect(),
        }))
    }
}

type Inbound<T> = Arc<Mutex<Option<mpsc::UnboundedSender<Result<T, TransportError>>>>>;

/// Server side of one accepted mock socket.
#[derive(Clone)]
pub struct MockSocketPeer {
    inbound: Inbound<String>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl MockSocketPeer {
    pub fn push_text(&self, text: impl Into<String>) {
        if let Some(tx) = lock(&self.inbound).as_ref() {
            let _ = tx.send(Ok(text.into()));
        }
    }

    /// Drop the connection with an error.
    pub fn fail(&self, err: TransportError) {
        if let Some(tx) = lock(&self.inbound).take() {
            let _ = tx.send(Err(err));
        }
    }

    /// Close the connection cleanly.
    pub fn close(&self) {
        lock(&self.inbound).take();
    }

    /// Frames the client has sent, oldest first.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// Whether the client has dropped its end.
    pub fn client_gone(&self) -> bool {
        lock(&self.inbound).as_ref().map_or(true, |tx| tx.is_closed())
    }
}

struct MockSocket {
    inbound: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    sent: Arc<Mutex<Vec<String>>>,
    _live: LiveGuard,
}

#[async_trait]
impl SocketConnection for MockSocket {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        lock(&self.sent).push(text);
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await
    }
}

/// Server side of one accepted mock event stream.
#[derive(Clone)]
pub struct MockStreamPeer {
    inbound: Inbound<ServerSentEvent>,
}

impl MockStreamPeer {
    pub fn push_event(&self, name: &str, data: &str) {
        if let Some(tx) = lock(&self.inbound).as_ref() {
            let _ = tx.send(Ok(ServerSentEvent::new(name, data)));
        }
    }

    pub fn fail(&self, err: TransportError) {
        if let Some(tx) = lock(&self.inbound).take() {
            let _ = tx.send(Err(err));
        }
    }

    pub fn close(&self) {
        lock(&self.inbound).take();
    }

    pub fn client_gone(&self) -> bool {
        lock(&self.inbound).as_ref().map_or(true, |tx| tx.is_closed())
    }
}

struct MockStream {
    inbound: mpsc::UnboundedReceiver<Result<ServerSentEvent, TransportError>>,
    _live: LiveGuard,
}

#[async_trait]
impl EventStream for MockStream {
    async fn next_event(&mut self) -> Option<Result<ServerSentEvent, TransportError>> {
        self.inbound.recv().await
    }
}
