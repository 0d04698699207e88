//! The RPC client and its connection coordinator.
//!
//! [`RpcClient`] owns one connection at a time. `connect` runs the
//! handshake from [`crate::handshake`] across three contexts: the caller's
//! thread, a token worker thread, and whatever context the transport
//! delivers events on. All of them funnel into one handler, which
//! advances the state machine under a lock and performs the resulting
//! effect after releasing it.

use std::mem;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use riftlink_auth::{AuthToken, NetworkError, Session, TokenAcquirer};
use riftlink_protocol::{
    AuthenticationCredentials, CallRequest, CommandMessage, ENDPOINT_HEADER,
    FLEX_CLIENT_ID_HEADER, Fault, Header, ObjectEncoding, ProtocolError, REQUEST_TIMEOUT_HEADER,
    StatusInfo, Value,
};
use riftlink_transport::{
    CallFailure, CallOutcome, Connector, Transport, TransportEvent, TransportOptions,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge::{PendingRegistry, SyncBridge};
use crate::config::{ClientConfig, ConnectionProfile};
use crate::dispatch::{Dispatcher, Operation, TransportSlot};
use crate::error::RpcError;
use crate::handshake::{ConnectionState, Effect, Event, Phase, transition};
use crate::result::ConnectResult;

const LOGIN_SERVICE: &str = "loginService";
const LOGIN_OPERATION: &str = "login";
const FLEX_AUTH_COMMAND: &str = "auth";
const TOKEN_WORKER_NAME: &str = "riftlink-token";

/// Receives the outcome of every connection attempt, exactly once each.
pub type ConnectCallback = Arc<dyn Fn(ConnectResult) + Send + Sync>;
/// Fires once when a ready session ends.
pub type DisconnectCallback = Arc<dyn Fn() + Send + Sync>;
/// Receives every status notification from the transport.
pub type StatusCallback = Arc<dyn Fn(&StatusInfo) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    on_connect: Option<ConnectCallback>,
    on_disconnect: Option<DisconnectCallback>,
    on_status: Option<StatusCallback>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and creates an [`RpcClient`].
///
/// ```rust,no_run
/// # use riftlink::prelude::*;
/// # fn demo(profile: ConnectionProfile, connector: WebSocketConnector) {
/// let acquirer = profile.token_acquirer();
/// let client = RpcClientBuilder::new(profile)
///     .on_connect(|result| println!("{result}"))
///     .build(connector, acquirer);
/// client.connect().unwrap();
/// # }
/// ```
pub struct RpcClientBuilder {
    profile: ConnectionProfile,
    config: ClientConfig,
    callbacks: Callbacks,
}

impl RpcClientBuilder {
    pub fn new(profile: ConnectionProfile) -> Self {
        Self {
            profile,
            config: ClientConfig::default(),
            callbacks: Callbacks::default(),
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Called from a worker or transport context, never from `connect`
    /// itself unless the attempt fails synchronously.
    pub fn on_connect(mut self, callback: impl Fn(ConnectResult) + Send + Sync + 'static) -> Self {
        self.callbacks.on_connect = Some(Arc::new(callback));
        self
    }

    pub fn on_disconnect(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_disconnect = Some(Arc::new(callback));
        self
    }

    pub fn on_status(mut self, callback: impl Fn(&StatusInfo) + Send + Sync + 'static) -> Self {
        self.callbacks.on_status = Some(Arc::new(callback));
        self
    }

    pub fn build<C: Connector, A: TokenAcquirer>(self, connector: C, acquirer: A) -> RpcClient<C, A> {
        let slot = Arc::new(TransportSlot::default());
        let pending = Arc::new(PendingRegistry::default());
        let dispatcher = Dispatcher::new(Arc::clone(&slot), self.config.endpoint.clone());
        let bridge = SyncBridge::new(Arc::clone(&pending), self.config.request_timeout);

        RpcClient {
            inner: Arc::new(Inner {
                profile: self.profile,
                config: self.config,
                connector,
                acquirer,
                callbacks: self.callbacks,
                machine: Mutex::new(Machine {
                    phase: Phase::Idle,
                    attempt: 0,
                    transport: None,
                }),
                slot,
                pending,
            }),
            dispatcher,
            bridge,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// An authenticated RPC session with the game platform.
///
/// # Blocking calls
///
/// The blocking methods wait on the calling thread for up to
/// [`ClientConfig::request_timeout`]. Do not call them from inside a
/// callback or a completion handler: those run on the transport's own
/// context, which must stay free to deliver the result.
pub struct RpcClient<C: Connector, A: TokenAcquirer> {
    inner: Arc<Inner<C, A>>,
    dispatcher: Dispatcher,
    bridge: SyncBridge,
}

impl<C: Connector, A: TokenAcquirer> RpcClient<C, A> {
    /// Starts a connection attempt and returns immediately. The outcome
    /// arrives through the connect callback.
    ///
    /// # Errors
    /// [`RpcError::AlreadyActive`] while another attempt or a ready
    /// session exists.
    pub fn connect(&self) -> Result<(), RpcError> {
        let (attempt, effect, transport) = {
            let mut machine = self.inner.machine.lock();
            if machine.phase.is_active() {
                return Err(RpcError::AlreadyActive);
            }
            machine.attempt += 1;
            machine.transport = None;
            let (effect, transport) = self.inner.advance(&mut machine, Event::Start);
            (machine.attempt, effect, transport)
        };
        info!(attempt, user = %self.inner.profile.credentials.username, "connecting");
        self.inner.apply(attempt, effect, transport);
        Ok(())
    }

    /// Ends the current attempt or session. A no-op when idle.
    pub fn disconnect(&self) {
        let (attempt, effect, transport) = {
            let mut machine = self.inner.machine.lock();
            let (effect, transport) = self.inner.advance(&mut machine, Event::DisconnectRequested);
            (machine.attempt, effect, transport)
        };
        self.inner.apply(attempt, effect, transport);
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.machine.lock().phase.state()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.slot.is_ready()
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.inner.profile
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The non-blocking call router, for operations without a named method.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Issues `O` without waiting. See [`Dispatcher::call`].
    pub fn call_async<O, F>(&self, args: Vec<Value>, handler: F) -> Result<(), RpcError>
    where
        O: Operation,
        F: FnOnce(Result<O::Output, RpcError>) + Send + 'static,
    {
        self.dispatcher.call::<O, F>(args, handler)
    }

    /// Issues `O` and blocks until its result, a fault, a disconnect, or
    /// the request timeout.
    pub fn call<O: Operation>(&self, args: Vec<Value>) -> Result<O::Output, RpcError> {
        self.bridge
            .execute::<O::Output, _>(|respond| self.dispatcher.call::<O, _>(args, respond))
    }
}

impl<C: Connector, A: TokenAcquirer> Drop for RpcClient<C, A> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

struct Machine {
    phase: Phase,
    /// Generation of the current attempt. Events tagged with an older
    /// generation are dropped.
    attempt: u64,
    transport: Option<Arc<dyn Transport>>,
}

struct Inner<C, A> {
    profile: ConnectionProfile,
    config: ClientConfig,
    connector: C,
    acquirer: A,
    callbacks: Callbacks,
    machine: Mutex<Machine>,
    slot: Arc<TransportSlot>,
    pending: Arc<PendingRegistry>,
}

impl<C: Connector, A: TokenAcquirer> Inner<C, A> {
    fn handle(self: &Arc<Self>, attempt: u64, event: Event) {
        let (effect, transport) = {
            let mut machine = self.machine.lock();
            if machine.attempt != attempt {
                warn!(attempt, current = machine.attempt, "ignoring event from a superseded attempt");
                return;
            }
            self.advance(&mut machine, event)
        };
        self.apply(attempt, effect, transport);
    }

    /// Runs one transition. Must be called with the machine locked.
    ///
    /// The dispatcher's view of the transport changes here, under the same
    /// lock as the phase, so calls can never reach a transport the machine
    /// has already given up.
    fn advance(&self, machine: &mut Machine, event: Event) -> (Effect, Option<Arc<dyn Transport>>) {
        let from = machine.phase.state();
        let phase = mem::replace(&mut machine.phase, Phase::Idle);
        let (next, effect) = transition(phase, event);
        let to = next.state();
        machine.phase = next;
        if from != to {
            debug!(attempt = machine.attempt, ?from, ?to, "connection state changed");
        }

        let transport = match &effect {
            Effect::Finish(ConnectResult::Success) => {
                if let Some(transport) = &machine.transport {
                    self.slot.publish(Arc::clone(transport));
                }
                machine.transport.clone()
            }
            Effect::Finish(_) => machine.transport.take(),
            Effect::Teardown => {
                self.slot.clear();
                machine.transport.take()
            }
            _ => machine.transport.clone(),
        };
        (effect, transport)
    }

    fn apply(self: &Arc<Self>, attempt: u64, effect: Effect, transport: Option<Arc<dyn Transport>>) {
        match effect {
            Effect::None => {}
            Effect::AcquireToken => self.spawn_token_worker(attempt),
            Effect::OpenTransport => self.open_transport(attempt),
            Effect::IssueLogin(token) => match transport {
                Some(transport) => self.issue_login(attempt, &transport, token),
                None => self.handle(attempt, Event::TransportFailed("no transport".into())),
            },
            Effect::IssueFlexAuth(session) => match transport {
                Some(transport) => self.issue_flex_auth(attempt, &transport, session),
                None => self.handle(attempt, Event::TransportFailed("no transport".into())),
            },
            Effect::Finish(result) => self.finish(attempt, result, transport),
            Effect::Teardown => self.teardown(attempt, transport),
        }
    }

    fn spawn_token_worker(self: &Arc<Self>, attempt: u64) {
        let inner = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(TOKEN_WORKER_NAME.into())
            .spawn(move || {
                let url = &inner.profile.region.login_queue_url;
                debug!(attempt, %url, "requesting login token");
                let event = match inner.acquirer.acquire(url, &inner.profile.credentials) {
                    Ok(token) => Event::TokenAcquired(token),
                    Err(err) => Event::TokenFailed(err),
                };
                inner.handle(attempt, event);
            });

        if let Err(err) = spawned {
            self.handle(attempt, Event::TokenFailed(NetworkError::Worker(err.to_string())));
        }
    }

    fn open_transport(self: &Arc<Self>, attempt: u64) {
        let options = TransportOptions {
            proxy: self.profile.proxy.rpc.clone(),
            object_encoding: ObjectEncoding::Amf3,
            app: self.config.app.clone(),
        };
        let transport = match self.connector.open(options) {
            Ok(transport) => transport,
            Err(err) => {
                self.handle(attempt, Event::TransportFailed(err.to_string()));
                return;
            }
        };

        let weak = Arc::downgrade(self);
        transport.set_event_sink(Arc::new(move |event: TransportEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.on_transport_event(attempt, event);
            }
        }));

        let wanted = {
            let mut machine = self.machine.lock();
            let wanted = machine.attempt == attempt
                && matches!(machine.phase, Phase::ConnectingTransport { .. });
            if wanted {
                machine.transport = Some(Arc::clone(&transport));
            }
            wanted
        };
        if !wanted {
            debug!(attempt, "attempt ended while the transport was opening");
            transport.close();
            return;
        }

        let url = &self.profile.region.rpc_url;
        info!(attempt, %url, "connecting to gateway");
        if let Err(err) = transport.connect(url) {
            self.handle(attempt, Event::TransportFailed(err.to_string()));
        }
    }

    fn on_transport_event(self: &Arc<Self>, attempt: u64, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.handle(attempt, Event::TransportConnected),
            TransportEvent::Disconnected => self.handle(attempt, Event::TransportDisconnected),
            TransportEvent::Status(info) => {
                if self.machine.lock().attempt != attempt {
                    return;
                }
                if let Some(on_status) = &self.callbacks.on_status {
                    on_status(&info);
                }
                debug!(attempt, status = %info, "gateway status");
                self.handle(attempt, Event::Status(info));
            }
        }
    }

    fn issue_login(self: &Arc<Self>, attempt: u64, transport: &Arc<dyn Transport>, token: AuthToken) {
        transport.add_header(Header::new(
            REQUEST_TIMEOUT_HEADER,
            false,
            self.config.request_timeout_secs(),
        ));
        transport.add_header(Header::new(FLEX_CLIENT_ID_HEADER, false, Uuid::new_v4().to_string()));
        transport.add_header(Header::new(ENDPOINT_HEADER, false, self.config.endpoint.clone()));

        let profile = &self.profile;
        let credentials = AuthenticationCredentials {
            username: profile.credentials.username.clone(),
            password: profile.credentials.password.clone(),
            auth_token: token.token,
            client_version: profile.client.client_version.clone(),
            ip_address: profile.client.ip_address.clone(),
            locale: profile.client.locale.clone(),
            domain: profile.client.domain.clone(),
            old_password: None,
            partner_credentials: None,
            security_answer: None,
        };
        let body = match encode(&credentials) {
            Ok(body) => body,
            Err(fault) => return self.handle(attempt, Event::LoginFaulted(fault)),
        };
        let request =
            CallRequest::remote(&self.config.endpoint, LOGIN_SERVICE, LOGIN_OPERATION, vec![body]);

        info!(attempt, "logging in");
        let weak = Arc::downgrade(self);
        let issued = transport.call(
            request,
            Box::new(move |outcome: CallOutcome| {
                let event = match outcome {
                    Ok(body) => match serde_json::from_value::<Session>(body) {
                        Ok(session) => Event::LoginSucceeded(session),
                        Err(err) => Event::LoginFaulted(Fault::new(
                            "Client.Decode",
                            ProtocolError::Decode(err).to_string(),
                        )),
                    },
                    Err(CallFailure::Fault(fault)) => Event::LoginFaulted(fault),
                    Err(CallFailure::Closed(reason)) => Event::TransportFailed(reason),
                };
                if let Some(inner) = weak.upgrade() {
                    inner.handle(attempt, event);
                }
            }),
        );
        if let Err(err) = issued {
            self.handle(attempt, Event::TransportFailed(err.to_string()));
        }
    }

    fn issue_flex_auth(
        self: &Arc<Self>,
        attempt: u64,
        transport: &Arc<dyn Transport>,
        session: Session,
    ) {
        transport.add_header(Header::new(FLEX_CLIENT_ID_HEADER, false, session.token.clone()));

        let message = CommandMessage::login(
            &self.profile.credentials.username,
            &session.token,
            transport.client_id(),
        );
        let body = match encode(&message) {
            Ok(body) => body,
            Err(fault) => return self.handle(attempt, Event::FlexAuthFaulted(fault)),
        };

        info!(attempt, "authenticating messaging session");
        let weak = Arc::downgrade(self);
        let issued = transport.call(
            CallRequest::command(FLEX_AUTH_COMMAND, vec![body]),
            Box::new(move |outcome: CallOutcome| {
                let event = match outcome {
                    Ok(_) => Event::FlexAuthSucceeded,
                    Err(CallFailure::Fault(fault)) => Event::FlexAuthFaulted(fault),
                    Err(CallFailure::Closed(reason)) => Event::TransportFailed(reason),
                };
                if let Some(inner) = weak.upgrade() {
                    inner.handle(attempt, event);
                }
            }),
        );
        if let Err(err) = issued {
            self.handle(attempt, Event::TransportFailed(err.to_string()));
        }
    }

    fn finish(&self, attempt: u64, result: ConnectResult, transport: Option<Arc<dyn Transport>>) {
        if result.is_success() {
            info!(attempt, "connected");
        } else {
            warn!(attempt, %result, "connection attempt failed");
            if let Some(transport) = transport {
                transport.close();
            }
        }
        if let Some(on_connect) = &self.callbacks.on_connect {
            on_connect(result);
        }
    }

    fn teardown(&self, attempt: u64, transport: Option<Arc<dyn Transport>>) {
        self.pending.fail_all("disconnected");
        if let Some(transport) = transport {
            transport.close();
        }
        info!(attempt, "disconnected");
        if let Some(on_disconnect) = &self.callbacks.on_disconnect {
            on_disconnect();
        }
    }
}

/// Serializes a handshake payload, reporting failure as a client-side
/// fault on the stage that needed it.
fn encode<T: Serialize>(payload: &T) -> Result<Value, Fault> {
    serde_json::to_value(payload)
        .map_err(|err| Fault::new("Client.Encode", ProtocolError::Encode(err).to_string()))
}
