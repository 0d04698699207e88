//! The connection handshake as a pure state machine.
//!
//! ```text
//! Idle ─Start─▶ AcquiringToken ─TokenAcquired─▶ ConnectingTransport
//!   ─TransportConnected─▶ AuthenticatingRemote ─LoginSucceeded─▶
//!   AuthenticatingSession ─FlexAuthSucceeded─▶ Ready
//! ```
//!
//! Any failure before `Ready` lands in `Failed`; an explicit disconnect
//! lands in `Closed`. [`transition`] never performs I/O. It returns the
//! next phase and an [`Effect`] for the client to carry out once its lock
//! is released.

use riftlink_auth::{AuthToken, NetworkError, Session};
use riftlink_protocol::{Fault, StatusInfo};

use crate::result::{AuthStage, ConnectResult};

/// Observable connection state, as reported by
/// [`RpcClient::state`](crate::RpcClient::state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    AcquiringToken,
    ConnectingTransport,
    AuthenticatingRemote,
    AuthenticatingSession,
    Ready,
    Failed,
    Closed,
}

/// Internal phase. Carries the data one stage hands to the next.
#[derive(Debug)]
pub(crate) enum Phase {
    Idle,
    AcquiringToken,
    ConnectingTransport { token: AuthToken },
    AuthenticatingRemote,
    AuthenticatingSession,
    Ready,
    Failed,
    Closed,
}

impl Phase {
    pub(crate) fn state(&self) -> ConnectionState {
        match self {
            Self::Idle => ConnectionState::Idle,
            Self::AcquiringToken => ConnectionState::AcquiringToken,
            Self::ConnectingTransport { .. } => ConnectionState::ConnectingTransport,
            Self::AuthenticatingRemote => ConnectionState::AuthenticatingRemote,
            Self::AuthenticatingSession => ConnectionState::AuthenticatingSession,
            Self::Ready => ConnectionState::Ready,
            Self::Failed => ConnectionState::Failed,
            Self::Closed => ConnectionState::Closed,
        }
    }

    /// `true` while an attempt is in flight or a session is live.
    pub(crate) fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Failed | Self::Closed)
    }

    fn is_handshaking(&self) -> bool {
        self.is_active() && !matches!(self, Self::Ready)
    }
}

/// Inputs to the state machine.
#[derive(Debug)]
pub(crate) enum Event {
    Start,
    TokenAcquired(AuthToken),
    TokenFailed(NetworkError),
    TransportConnected,
    /// The transport could not be used: refused, closed a call, or failed
    /// to accept a request.
    TransportFailed(String),
    TransportDisconnected,
    /// A status notification from the gateway.
    Status(StatusInfo),
    LoginSucceeded(Session),
    LoginFaulted(Fault),
    FlexAuthSucceeded,
    FlexAuthFaulted(Fault),
    DisconnectRequested,
}

/// Work the client performs after a transition.
#[derive(Debug)]
pub(crate) enum Effect {
    None,
    AcquireToken,
    OpenTransport,
    IssueLogin(AuthToken),
    IssueFlexAuth(Session),
    /// The attempt is over. On failure the client also drops the transport.
    Finish(ConnectResult),
    /// A ready session ended: unpublish the transport, fail pending calls,
    /// close, and tell the disconnect callback.
    Teardown,
}

pub(crate) fn transition(phase: Phase, event: Event) -> (Phase, Effect) {
    use Event as E;
    use Phase as P;

    match (phase, event) {
        (P::Idle | P::Failed | P::Closed, E::Start) => (P::AcquiringToken, Effect::AcquireToken),

        (P::AcquiringToken, E::TokenAcquired(token)) => {
            (P::ConnectingTransport { token }, Effect::OpenTransport)
        }
        (P::AcquiringToken, E::TokenFailed(err)) => fail(ConnectResult::TokenFailure(err)),

        (P::ConnectingTransport { token }, E::TransportConnected) => {
            (P::AuthenticatingRemote, Effect::IssueLogin(token))
        }

        (P::AuthenticatingRemote, E::LoginSucceeded(session)) => {
            (P::AuthenticatingSession, Effect::IssueFlexAuth(session))
        }
        (P::AuthenticatingRemote, E::LoginFaulted(fault)) => fail(ConnectResult::RemoteAuthFailure {
            stage: AuthStage::Login,
            fault,
        }),

        (P::AuthenticatingSession, E::FlexAuthSucceeded) => {
            (P::Ready, Effect::Finish(ConnectResult::Success))
        }
        (P::AuthenticatingSession, E::FlexAuthFaulted(fault)) => {
            fail(ConnectResult::RemoteAuthFailure {
                stage: AuthStage::FlexAuth,
                fault,
            })
        }

        // The transport going away before Ready ends the attempt at the
        // token stage, whichever stage was running.
        (phase, E::TransportFailed(reason)) if phase.is_handshaking() => {
            fail(ConnectResult::TokenFailure(NetworkError::Transport(reason)))
        }
        // Until the session is authenticated, only a known success code
        // leaves the attempt running.
        (phase, E::Status(info)) if phase.is_handshaking() && !info.is_success() => {
            fail(ConnectResult::TokenFailure(NetworkError::Transport(info.to_string())))
        }
        (phase, E::TransportDisconnected) if phase.is_handshaking() => fail(
            ConnectResult::TokenFailure(NetworkError::Transport("connection closed".into())),
        ),
        (phase, E::DisconnectRequested) if phase.is_handshaking() => (
            P::Closed,
            Effect::Finish(ConnectResult::TokenFailure(NetworkError::Aborted)),
        ),

        (P::Ready, E::TransportDisconnected | E::DisconnectRequested) => {
            (P::Closed, Effect::Teardown)
        }

        // Anything else is out of order for the current phase.
        (phase, _) => (phase, Effect::None),
    }
}

fn fail(result: ConnectResult) -> (Phase, Effect) {
    (Phase::Failed, Effect::Finish(result))
}
