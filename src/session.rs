//! One WebSocket connection per activation of the chat view.
//!
//! The socket lives in a background task. Lifecycle observations flow back to
//! the view as [`SessionEvent`]s in the order the transport produced them.
//! There is no reconnect, no heartbeat and no outbound queue: frames sent
//! while the socket is not open are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::message::{decode_server_frame, ChatMessage, ClientFrame};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Opened,
    /// A full replacement of the displayed list.
    Messages(Vec<ChatMessage>),
    Error(String),
    /// Always the final event of a session.
    Closed,
}

/// Commands from the view to the socket task.
#[derive(Debug, PartialEq, Eq)]
pub enum Outbound {
    Frame(String),
    Close,
}

pub struct Session {
    url: String,
    outbound: mpsc::UnboundedSender<Outbound>,
    open: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Start connecting to `url`. Must be called inside a tokio runtime.
    pub fn open(url: &str, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        let (outbound, rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));

        info!(url, "opening chat session");
        let task = tokio::spawn(run_socket(url.to_string(), rx, events, Arc::clone(&open)));

        Self {
            url: url.to_string(),
            outbound,
            open,
            task: Some(task),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Fire-and-forget send. Nothing is awaited or confirmed.
    pub fn send(&self, frame: &ClientFrame) {
        if !self.is_open() {
            debug!(?frame, "socket not open, dropping frame");
            return;
        }

        match frame.encode() {
            Ok(text) => {
                if self.outbound.send(Outbound::Frame(text)).is_err() {
                    debug!("socket task gone, dropping frame");
                }
            }
            Err(e) => warn!("failed to encode frame: {}", e),
        }
    }

    /// Close the connection and wait for the socket task to finish.
    pub async fn close(mut self) {
        let _ = self.outbound.send(Outbound::Close);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("socket task ended abnormally: {}", e);
            }
        }
    }

    /// A session with no socket behind it; outbound frames land in the receiver.
    #[cfg(test)]
    pub(crate) fn detached(open: bool) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let session = Self {
            url: "ws://detached".to_string(),
            outbound,
            open: Arc::new(AtomicBool::new(open)),
            task: None,
        };
        (session, rx)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Release on every exit path, even if the connection never opened.
        let _ = self.outbound.send(Outbound::Close);
    }
}

async fn run_socket(
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<SessionEvent>,
    open: Arc<AtomicBool>,
) {
    // Until the socket is open nothing but Close (or a dropped Session) can arrive.
    let stream = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!(%url, "websocket error: {}", e);
                let _ = events.send(SessionEvent::Error(e.to_string()));
                info!(%url, "connection closed");
                let _ = events.send(SessionEvent::Closed);
                return;
            }
        },
        _ = outbound.recv() => {
            info!(%url, "session released before the connection opened");
            let _ = events.send(SessionEvent::Closed);
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    info!(%url, "connection established");
    let _ = events.send(SessionEvent::Opened);

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        error!(%url, "websocket error: {}", e);
                        let _ = events.send(SessionEvent::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = write.close().await {
                        debug!("close handshake failed: {}", e);
                    }
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(payload))) => match decode_server_frame(payload.as_str()) {
                    Ok(messages) => {
                        debug!(count = messages.len(), "received message list");
                        let _ = events.send(SessionEvent::Messages(messages));
                    }
                    Err(e) => warn!("ignoring malformed server frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(%url, "websocket error: {}", e);
                    let _ = events.send(SessionEvent::Error(e.to_string()));
                    break;
                }
            },
        }
    }

    open.store(false, Ordering::SeqCst);
    info!(%url, "connection closed");
    let _ = events.send(SessionEvent::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;
    use tokio_tungstenite::{accept_async, WebSocketStream};

    const WAIT: Duration = Duration::from_secs(5);

    async fn serve_once() -> (String, JoinHandle<WebSocketStream<TcpStream>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            accept_async(tcp).await.unwrap()
        });
        (format!("ws://{addr}"), server)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        timeout(WAIT, rx.recv()).await.unwrap().unwrap()
    }

    fn sample(id: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            name: "Bob".to_string(),
            message: format!("message {id}"),
            date: "19 October 2026, 09:05 AM".to_string(),
            sending: false,
        }
    }

    #[tokio::test]
    async fn test_session_round_trip_and_release() {
        let (url, server) = serve_once().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::open(&url, tx);

        assert_eq!(next_event(&mut rx).await, SessionEvent::Opened);
        assert!(session.is_open());
        let mut peer = server.await.unwrap();

        let list = vec![sample("1"), sample("2")];
        let payload = serde_json::to_string(&list).unwrap();
        peer.send(Message::Text(payload.into())).await.unwrap();
        assert_eq!(next_event(&mut rx).await, SessionEvent::Messages(list));

        session.send(&ClientFrame::ClearAll);
        match timeout(WAIT, peer.next()).await.unwrap() {
            Some(Ok(Message::Text(text))) => assert_eq!(text.as_str(), "\"clearAll\""),
            other => panic!("unexpected frame {other:?}"),
        }

        drop(session);
        match timeout(WAIT, peer.next()).await.unwrap() {
            Some(Ok(Message::Close(_))) | None => {}
            other => panic!("expected close, got {other:?}"),
        }
        assert_eq!(next_event(&mut rx).await, SessionEvent::Closed);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        let (url, server) = serve_once().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _session = Session::open(&url, tx);

        assert_eq!(next_event(&mut rx).await, SessionEvent::Opened);
        let mut peer = server.await.unwrap();

        peer.send(Message::Text("not json".to_string().into())).await.unwrap();
        let list = vec![sample("3")];
        let payload = serde_json::to_string(&list).unwrap();
        peer.send(Message::Text(payload.into())).await.unwrap();

        assert_eq!(next_event(&mut rx).await, SessionEvent::Messages(list));
    }

    #[tokio::test]
    async fn test_server_close_ends_session() {
        let (url, server) = serve_once().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::open(&url, tx);

        assert_eq!(next_event(&mut rx).await, SessionEvent::Opened);
        let mut peer = server.await.unwrap();
        peer.close(None).await.unwrap();

        assert_eq!(next_event(&mut rx).await, SessionEvent::Closed);
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error_then_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::open(&format!("ws://{addr}"), tx);

        assert!(matches!(next_event(&mut rx).await, SessionEvent::Error(_)));
        assert_eq!(next_event(&mut rx).await, SessionEvent::Closed);
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_release_before_open_closes_session() {
        // Accepted by the kernel backlog but never handshaken.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::open(&format!("ws://{addr}"), tx);
        assert!(!session.is_open());

        // Not open yet, so this is dropped rather than queued.
        session.send(&ClientFrame::ClearAll);

        session.close().await;
        assert_eq!(next_event(&mut rx).await, SessionEvent::Closed);
        drop(listener);
    }

    #[test]
    fn test_send_on_closed_session_is_dropped() {
        let (session, mut rx) = Session::detached(false);
        session.send(&ClientFrame::ClearAll);
        drop(session);
        assert_eq!(rx.try_recv(), Ok(Outbound::Close));
        assert!(rx.try_recv().is_err());
    }
}
