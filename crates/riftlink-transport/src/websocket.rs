//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Each [`WebSocketTransport`] owns one background connection task on the
//! runtime handed to its [`WebSocketConnector`]:
//!
//! ```text
//!  call() ──▶ outbound channel ──▶ writer task ──▶ socket
//!                                                    │
//!  completions / events ◀── reader loop (connection task) ◀┘
//! ```
//!
//! Calls are correlated by `invoke_id`. When the connection ends for any
//! reason, every outstanding completion is failed with
//! [`CallFailure::Closed`] and a single `Disconnected` event is emitted.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use riftlink_protocol::{
    CallRequest, Codec, Frame, Header, JsonCodec, ProtocolError, StatusInfo,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{
    CallFailure, CallOutcome, Completion, ConnectionId, Connector, EventSink, HeaderSet,
    Transport, TransportError, TransportEvent, TransportOptions,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Upper bound on the proxy's reply to a `CONNECT` request.
const MAX_PROXY_RESPONSE: usize = 8 * 1024;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// WebSocketConnector
// ---------------------------------------------------------------------------

/// Creates [`WebSocketTransport`]s that run on a fixed Tokio runtime.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    runtime: Handle,
}

impl WebSocketConnector {
    /// Transports created by this connector spawn their tasks on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Uses the runtime the caller is currently running on.
    pub fn current() -> Result<Self, TransportError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| TransportError::Connect(e.to_string()))
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, options: TransportOptions) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(WebSocketTransport::new(self.runtime.clone(), options)))
    }
}

// ---------------------------------------------------------------------------
// WebSocketTransport
// ---------------------------------------------------------------------------

/// A single gateway connection over WebSocket.
pub struct WebSocketTransport {
    runtime: Handle,
    options: TransportOptions,
    shared: Arc<Shared>,
}

/// Calls awaiting a reply. `open` flips to false exactly once, under the
/// same lock that drains `calls`, so no completion can be stranded.
struct Pending {
    open: bool,
    calls: HashMap<u64, Completion>,
}

/// State shared between the transport handle and its connection task.
struct Shared {
    id: ConnectionId,
    codec: JsonCodec,
    sink: RwLock<Option<EventSink>>,
    headers: Mutex<HeaderSet>,
    pending: Mutex<Pending>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    client_id: Mutex<Option<String>>,
    next_invoke: AtomicU64,
    started: AtomicBool,
    connected: AtomicBool,
    closing: AtomicBool,
    disconnected: AtomicBool,
    shutdown: Notify,
}

impl WebSocketTransport {
    /// Creates an unconnected transport. Call [`Transport::connect`] to
    /// start the connection task.
    pub fn new(runtime: Handle, options: TransportOptions) -> Self {
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            runtime,
            options,
            shared: Arc::new(Shared {
                id,
                codec: JsonCodec,
                sink: RwLock::new(None),
                headers: Mutex::new(HeaderSet::new()),
                pending: Mutex::new(Pending {
                    open: true,
                    calls: HashMap::new(),
                }),
                outbound: Mutex::new(None),
                client_id: Mutex::new(None),
                next_invoke: AtomicU64::new(1),
                started: AtomicBool::new(false),
                connected: AtomicBool::new(false),
                closing: AtomicBool::new(false),
                disconnected: AtomicBool::new(false),
                shutdown: Notify::new(),
            }),
        }
    }

    /// Returns this transport's identifier.
    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }
}

impl Transport for WebSocketTransport {
    fn set_event_sink(&self, sink: EventSink) {
        *self.shared.sink.write() = Some(sink);
    }

    fn connect(&self, url: &str) -> Result<(), TransportError> {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::Connect("connect already started".into()));
        }
        if self.shared.closing.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed("transport closed".into()));
        }

        let id = self.shared.id;
        tracing::info!(%id, url, proxy = ?self.options.proxy, "connecting to gateway");

        let shared = Arc::clone(&self.shared);
        let options = self.options.clone();
        let url = url.to_string();
        self.runtime.spawn(async move {
            run_connection(shared, url, options).await;
        });
        Ok(())
    }

    fn add_header(&self, header: Header) {
        self.shared.headers.lock().insert(header);
    }

    fn call(&self, request: CallRequest, on_complete: Completion) -> Result<(), TransportError> {
        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let outbound = self
            .shared
            .outbound
            .lock()
            .clone()
            .ok_or(TransportError::NotConnected)?;

        let invoke_id = self.shared.next_invoke.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(id = %self.shared.id, invoke_id, call = %request, "issuing call");
        let headers = self.shared.headers.lock().to_vec();
        let frame = Frame::invoke(invoke_id, request, headers);

        {
            let mut pending = self.shared.pending.lock();
            if !pending.open {
                return Err(TransportError::ConnectionClosed("connection closed".into()));
            }
            pending.calls.insert(invoke_id, on_complete);
        }

        if outbound.send(frame).is_err() {
            // The writer is gone. If the completion is still ours, hand it
            // back to the caller as an error; otherwise shutdown already
            // ran it.
            let reclaimed = self.shared.pending.lock().calls.remove(&invoke_id);
            if reclaimed.is_some() {
                return Err(TransportError::ConnectionClosed("writer stopped".into()));
            }
        }
        Ok(())
    }

    fn close(&self) {
        if self.shared.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(id = %self.shared.id, "closing transport");

        let outbound = self.shared.outbound.lock().clone();
        if let Some(tx) = outbound {
            let _ = tx.send(Frame::Close {
                reason: "client closing".into(),
            });
        }
        self.shared.shutdown.notify_one();

        if !self.shared.started.load(Ordering::SeqCst) {
            self.shared.finish("closed before connect");
        }
    }

    fn client_id(&self) -> Option<String> {
        self.shared.client_id.lock().clone()
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl Shared {
    fn emit(&self, event: TransportEvent) {
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink(event);
        }
    }

    fn complete(&self, invoke_id: u64, outcome: CallOutcome) -> Result<(), ProtocolError> {
        let completion = self.pending.lock().calls.remove(&invoke_id);
        let completion = completion.ok_or_else(|| {
            ProtocolError::InvalidMessage(format!("reply for unknown invoke id {invoke_id}"))
        })?;
        completion(outcome);
        Ok(())
    }

    fn read_frame(&self, data: &[u8]) -> Option<String> {
        match self.handle_frame(data) {
            Ok(end) => end,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "dropping inbound frame");
                None
            }
        }
    }

    /// Tears the connection state down. Safe to call more than once.
    fn finish(&self, reason: &str) {
        self.outbound.lock().take();
        self.connected.store(false, Ordering::SeqCst);

        let drained: Vec<Completion> = {
            let mut pending = self.pending.lock();
            pending.open = false;
            pending.calls.drain().map(|(_, completion)| completion).collect()
        };
        if !drained.is_empty() {
            tracing::debug!(id = %self.id, count = drained.len(), "failing outstanding calls");
        }
        for completion in drained {
            completion(Err(CallFailure::Closed(reason.to_string())));
        }

        if !self.disconnected.swap(true, Ordering::SeqCst) {
            tracing::info!(id = %self.id, reason, "gateway connection closed");
            self.emit(TransportEvent::Disconnected);
        }
    }

    /// Handles one inbound frame. Returns `Some(reason)` when the
    /// connection should end.
    ///
    /// A frame that cannot be decoded, or that answers a call nobody is
    /// waiting for, is an error for that frame only; the reader logs it
    /// and keeps going.
    fn handle_frame(&self, data: &[u8]) -> Result<Option<String>, TransportError> {
        let frame: Frame = self.codec.decode(data)?;

        match frame {
            Frame::ConnectAck { client_id } => {
                tracing::debug!(id = %self.id, %client_id, "connect acknowledged");
                *self.client_id.lock() = Some(client_id);
                if !self.connected.swap(true, Ordering::SeqCst) {
                    self.emit(TransportEvent::Connected);
                }
            }
            Frame::Status { info } => {
                let fatal = info.is_error() && !self.connected.load(Ordering::SeqCst);
                let reason = info.to_string();
                self.emit(TransportEvent::Status(info));
                if fatal {
                    return Ok(Some(reason));
                }
            }
            Frame::Result { invoke_id, body } => self.complete(invoke_id, Ok(body))?,
            Frame::Error { invoke_id, fault } => {
                self.complete(invoke_id, Err(CallFailure::Fault(fault)))?;
            }
            Frame::Close { reason } => return Ok(Some(reason)),
            Frame::Connect { .. } | Frame::Invoke { .. } => {
                tracing::debug!(id = %self.id, "ignoring client-bound frame from gateway");
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

async fn run_connection(shared: Arc<Shared>, url: String, options: TransportOptions) {
    let opened = tokio::select! {
        result = open_stream(&url, options.proxy.as_deref()) => result,
        _ = shared.shutdown.notified() => {
            shared.finish("closed before connect");
            return;
        }
    };

    let ws = match opened {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(id = %shared.id, error = %e, "gateway connect failed");
            shared.emit(TransportEvent::Status(StatusInfo::error(
                "NetConnection.Connect.Failed",
                e.to_string(),
            )));
            shared.finish(&e.to_string());
            return;
        }
    };

    let (mut write, mut read) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
    let _ = tx.send(Frame::Connect {
        object_encoding: options.object_encoding,
        app: options.app.clone(),
    });
    *shared.outbound.lock() = Some(tx);

    let writer_shared = Arc::clone(&shared);
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let bytes = match writer_shared.codec.encode(&frame) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(id = %writer_shared.id, error = %e, "failed to encode frame");
                    continue;
                }
            };
            if let Err(e) = write.send(Message::Binary(bytes.into())).await {
                tracing::debug!(id = %writer_shared.id, error = %e, "send failed");
                break;
            }
        }
        let _ = write.close().await;
    });

    let reason = loop {
        let msg = tokio::select! {
            msg = read.next() => msg,
            _ = shared.shutdown.notified() => break "closed by client".to_string(),
        };
        match msg {
            Some(Ok(Message::Binary(data))) => {
                if let Some(reason) = shared.read_frame(&data) {
                    break reason;
                }
            }
            Some(Ok(Message::Text(text))) => {
                if let Some(reason) = shared.read_frame(text.as_bytes()) {
                    break reason;
                }
            }
            Some(Ok(Message::Close(_))) | None => break "closed by gateway".to_string(),
            Some(Ok(_)) => continue, // ping/pong/frame
            Some(Err(e)) => break e.to_string(),
        }
    };

    shared.finish(&reason);
    let _ = writer.await;
}

/// Opens the WebSocket, tunnelling through `proxy` when one is set.
async fn open_stream(url: &str, proxy: Option<&str>) -> Result<WsStream, TransportError> {
    let request = url
        .into_client_request()
        .map_err(|e| TransportError::Connect(e.to_string()))?;

    let Some(proxy) = proxy else {
        let (ws, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        return Ok(ws);
    };

    let uri = request.uri();
    let host = uri
        .host()
        .ok_or_else(|| TransportError::Connect(format!("no host in {url}")))?
        .to_string();
    let default_port = if uri.scheme_str() == Some("wss") { 443 } else { 80 };
    let port = uri.port_u16().unwrap_or(default_port);

    let mut stream = TcpStream::connect(proxy).await?;
    tunnel(&mut stream, &host, port).await?;
    tracing::debug!(proxy, %host, port, "proxy tunnel established");

    let (ws, _) = tokio_tungstenite::client_async_tls(request, stream)
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;
    Ok(ws)
}

/// Asks an HTTP proxy for a `CONNECT` tunnel to `host:port`.
///
/// Reads the reply one byte at a time so nothing past the header block is
/// consumed from the stream.
async fn tunnel(stream: &mut TcpStream, host: &str, port: u16) -> Result<(), TransportError> {
    let request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !response.ends_with(b"\r\n\r\n") {
        if response.len() >= MAX_PROXY_RESPONSE {
            return Err(TransportError::Connect("proxy response too large".into()));
        }
        if stream.read(&mut byte).await? == 0 {
            return Err(TransportError::Connect("proxy closed the tunnel".into()));
        }
        response.push(byte[0]);
    }

    let text = String::from_utf8_lossy(&response);
    let status_line = text.lines().next().unwrap_or_default();
    if status_line.split_whitespace().nth(1) == Some("200") {
        Ok(())
    } else {
        Err(TransportError::Connect(format!(
            "proxy refused tunnel: {status_line}"
        )))
    }
}
