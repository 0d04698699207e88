//! Scripted fakes for driving `RpcClient` without a network.
//!
//! - [`FakeConnector`] hands out [`FakeTransport`]s and remembers them.
//! - [`FakeTransport`] answers calls from a [`Script`], synchronously or
//!   by holding the completion until the test releases it.
//! - [`FakeAcquirer`] issues a fixed token, optionally after failing.
//! - [`Harness`] wires them into a client and collects callback output.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use riftlink::auth::{AuthToken, Credentials, NetworkError, TokenAcquirer};
use riftlink::protocol::{CallRequest, Fault, Header, StatusInfo, Value};
use riftlink::transport::{
    CallFailure, Completion, Connector, EventSink, HeaderSet, Transport, TransportError,
    TransportEvent, TransportOptions,
};
use riftlink::{
    ClientConfig, ClientInfo, ConnectResult, ConnectionProfile, ProxySettings, RegionEndpoints,
    RpcClient, RpcClientBuilder,
};
use serde_json::json;

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

pub const LOGIN_QUEUE_URL: &str = "https://lq.test.example/login-queue/rest/queue/authenticate";
pub const RPC_URL: &str = "wss://prod.test.example:2099";

// =========================================================================
// Scripts
// =========================================================================

/// How the fake answers one call.
pub enum Reply {
    Value(Value),
    Fault(Fault),
    /// Keep the completion until the test releases it.
    Hold,
}

pub type Script = Arc<dyn Fn(&CallRequest) -> Reply + Send + Sync>;

/// A script that completes the handshake (session token `S1`) and
/// answers everything else with `ops`.
pub fn handshake_then(ops: impl Fn(&CallRequest) -> Reply + Send + Sync + 'static) -> Script {
    Arc::new(move |request: &CallRequest| {
        match (request.destination.as_deref(), request.operation.as_str()) {
            (Some("loginService"), "login") => Reply::Value(json!({ "token": "S1" })),
            (None, "auth") => Reply::Value(json!("success")),
            _ => ops(request),
        }
    })
}

/// Completes the handshake and faults every other call.
pub fn handshake_only() -> Script {
    handshake_then(|request| {
        Reply::Fault(Fault::new("Server.Processing", format!("unexpected {request}")))
    })
}

// =========================================================================
// Transport
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Emit `Connected` straight away.
    Accept,
    /// Emit an error status followed by `Disconnected`.
    Refuse,
    /// Emit nothing; the test drives events by hand.
    Silent,
}

pub struct FakeTransport {
    script: Script,
    behavior: ConnectBehavior,
    options: TransportOptions,
    sink: Mutex<Option<EventSink>>,
    headers: Mutex<HeaderSet>,
    calls: Mutex<Vec<CallRequest>>,
    held: Mutex<Vec<(CallRequest, Completion)>>,
    connect_urls: Mutex<Vec<String>>,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl FakeTransport {
    fn new(script: Script, behavior: ConnectBehavior, options: TransportOptions) -> Self {
        Self {
            script,
            behavior,
            options,
            sink: Mutex::new(None),
            headers: Mutex::new(HeaderSet::new()),
            calls: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
            connect_urls: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn emit(&self, event: TransportEvent) {
        let sink = self.sink.lock().clone();
        if let Some(sink) = sink {
            sink(event);
        }
    }

    /// Marks the connection usable and announces it.
    pub fn accept(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.emit(TransportEvent::Connected);
    }

    /// Simulates the gateway dropping the connection.
    pub fn drop_connection(&self) {
        self.shut_down("dropped by gateway");
    }

    pub fn calls(&self) -> Vec<CallRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls other than the two handshake stages.
    pub fn service_calls(&self) -> Vec<CallRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation != "auth" && c.destination.as_deref() != Some("loginService"))
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<Value> {
        self.headers.lock().get(name).map(|h| h.value.clone())
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    pub fn take_held(&self) -> Vec<(CallRequest, Completion)> {
        std::mem::take(&mut *self.held.lock())
    }

    pub fn connect_urls(&self) -> Vec<String> {
        self.connect_urls.lock().clone()
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn shut_down(&self, reason: &str) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.connected.store(false, Ordering::SeqCst);
        for (_, completion) in self.take_held() {
            completion(Err(CallFailure::Closed(reason.into())));
        }
        self.emit(TransportEvent::Disconnected);
    }
}

impl Transport for FakeTransport {
    fn set_event_sink(&self, sink: EventSink) {
        *self.sink.lock() = Some(sink);
    }

    fn connect(&self, url: &str) -> Result<(), TransportError> {
        self.connect_urls.lock().push(url.to_string());
        match self.behavior {
            ConnectBehavior::Accept => self.accept(),
            ConnectBehavior::Refuse => {
                self.emit(TransportEvent::Status(StatusInfo::error(
                    "NetConnection.Connect.Failed",
                    "connection refused",
                )));
                self.shut_down("refused");
            }
            ConnectBehavior::Silent => {}
        }
        Ok(())
    }

    fn add_header(&self, header: Header) {
        self.headers.lock().insert(header);
    }

    fn call(&self, request: CallRequest, on_complete: Completion) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed("transport closed".into()));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.calls.lock().push(request.clone());

        match (self.script)(&request) {
            Reply::Value(value) => on_complete(Ok(value)),
            Reply::Fault(fault) => on_complete(Err(CallFailure::Fault(fault))),
            Reply::Hold => self.held.lock().push((request, on_complete)),
        }
        Ok(())
    }

    fn close(&self) {
        self.shut_down("closed by client");
    }

    fn client_id(&self) -> Option<String> {
        Some("fake-client".into())
    }
}

// =========================================================================
// Connector
// =========================================================================

#[derive(Clone)]
pub struct FakeConnector {
    script: Script,
    behavior: ConnectBehavior,
    opened: Arc<Mutex<Vec<Arc<FakeTransport>>>>,
}

impl FakeConnector {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            behavior: ConnectBehavior::Accept,
            opened: Arc::default(),
        }
    }

    pub fn with_behavior(mut self, behavior: ConnectBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.lock().len()
    }

    /// The most recently opened transport.
    pub fn last(&self) -> Arc<FakeTransport> {
        let last = self.opened.lock().last().cloned();
        last.expect("a transport should have been opened")
    }
}

impl Connector for FakeConnector {
    fn open(&self, options: TransportOptions) -> Result<Arc<dyn Transport>, TransportError> {
        let transport = Arc::new(FakeTransport::new(
            Arc::clone(&self.script),
            self.behavior,
            options,
        ));
        self.opened.lock().push(Arc::clone(&transport));
        let transport: Arc<dyn Transport> = transport;
        Ok(transport)
    }
}

// =========================================================================
// Token acquirer
// =========================================================================

#[derive(Clone)]
pub struct FakeAcquirer {
    token: String,
    failures_left: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeAcquirer {
    pub fn issuing(token: &str) -> Self {
        Self {
            token: token.into(),
            failures_left: Arc::new(AtomicUsize::new(0)),
            requests: Arc::default(),
        }
    }

    /// Fails with HTTP 503 `failures` times, then issues `token`.
    pub fn failing_first(failures: usize, token: &str) -> Self {
        let acquirer = Self::issuing(token);
        acquirer.failures_left.store(failures, Ordering::SeqCst);
        acquirer
    }

    pub fn always_failing() -> Self {
        Self::failing_first(usize::MAX, "unused")
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// `(gateway url, username)` for every request, in order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }
}

impl TokenAcquirer for FakeAcquirer {
    fn acquire(
        &self,
        gateway_url: &str,
        credentials: &Credentials,
    ) -> Result<AuthToken, NetworkError> {
        self.requests
            .lock()
            .push((gateway_url.to_string(), credentials.username.clone()));

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(NetworkError::Status(503));
        }
        Ok(AuthToken {
            token: self.token.clone(),
            status: "LOGIN".into(),
            rate: 0,
        })
    }
}

// =========================================================================
// Harness
// =========================================================================

pub fn profile() -> ConnectionProfile {
    ConnectionProfile {
        credentials: Credentials::new("summoner", "hunter2"),
        region: RegionEndpoints {
            login_queue_url: LOGIN_QUEUE_URL.into(),
            rpc_url: RPC_URL.into(),
        },
        client: ClientInfo {
            client_version: "1.55.12".into(),
            locale: "en_US".into(),
            domain: "lolclient.lol.riotgames.com".into(),
            ip_address: "10.0.0.5".into(),
        },
        proxy: ProxySettings {
            login_queue: None,
            rpc: Some("proxy.test.example:3128".into()),
        },
    }
}

pub struct Harness {
    pub client: RpcClient<FakeConnector, FakeAcquirer>,
    pub connector: FakeConnector,
    pub acquirer: FakeAcquirer,
    pub disconnects: Arc<AtomicUsize>,
    pub statuses: Arc<Mutex<Vec<StatusInfo>>>,
    results: Receiver<ConnectResult>,
}

impl Harness {
    pub fn new(connector: FakeConnector, acquirer: FakeAcquirer) -> Self {
        Self::with_config(connector, acquirer, ClientConfig::default())
    }

    pub fn with_config(
        connector: FakeConnector,
        acquirer: FakeAcquirer,
        config: ClientConfig,
    ) -> Self {
        let (tx, results) = mpsc::channel();
        let disconnects = Arc::new(AtomicUsize::new(0));
        let statuses = Arc::new(Mutex::new(Vec::new()));

        let disconnect_count = Arc::clone(&disconnects);
        let status_log = Arc::clone(&statuses);
        let client = RpcClientBuilder::new(profile())
            .config(config)
            .on_connect(move |result| {
                let _ = tx.send(result);
            })
            .on_disconnect(move || {
                disconnect_count.fetch_add(1, Ordering::SeqCst);
            })
            .on_status(move |info| status_log.lock().push(info.clone()))
            .build(connector.clone(), acquirer.clone());

        Self {
            client,
            connector,
            acquirer,
            disconnects,
            statuses,
            results,
        }
    }

    /// Waits for the next connect callback.
    pub fn next_result(&self) -> ConnectResult {
        self.results
            .recv_timeout(WAIT)
            .expect("connect callback should fire")
    }

    /// `true` if no further connect callback arrives within a short grace
    /// period.
    pub fn no_more_results(&self) -> bool {
        matches!(
            self.results.recv_timeout(Duration::from_millis(200)),
            Err(RecvTimeoutError::Timeout)
        )
    }

    /// Connects and asserts the handshake succeeds.
    pub fn connect_ready(&self) {
        self.client.connect().expect("connect should start");
        let result = self.next_result();
        assert!(result.is_success(), "handshake should succeed, got {result}");
    }

    pub fn transport(&self) -> Arc<FakeTransport> {
        self.connector.last()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

/// Polls `condition` until it holds or [`WAIT`] elapses.
pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
