//! # Riftlink
//!
//! Authenticated RPC client for the game platform's messaging gateway.
//!
//! Connecting is a four-stage handshake: a login-queue token exchange, a
//! transport connection, a remote `login` call, and a Flex `auth` command.
//! [`RpcClient`] drives it, reports the outcome once through a callback,
//! and then routes typed calls to the platform's services, either with a
//! completion handler or blocking until the result arrives.
//!
//! ## Architecture
//!
//! ```text
//! riftlink-auth       login-queue token (blocking HTTP, worker thread)
//! riftlink-transport  gateway connection (WebSocket on a Tokio runtime)
//! riftlink-protocol   frames, headers, handshake payloads, codec
//! riftlink            handshake state machine, dispatcher, blocking bridge
//! ```
//!
//! The handshake is a pure state machine: each event (a token, a transport
//! notification, a call completing) produces the next state and at most
//! one piece of work. The client runs that work after releasing its lock,
//! so a callback may safely call back into the client.
//!
//! ## Where things run
//!
//! - `connect()` returns at once. The token request runs on a dedicated
//!   `riftlink-token` thread; everything after it runs on the transport's
//!   context.
//! - Callbacks (`on_connect`, `on_disconnect`, `on_status`) and async
//!   completion handlers run on those same contexts. Keep them short, and
//!   never make a blocking call from inside one: the thread it would wait
//!   on is the one running it.
//! - Blocking calls wait on the caller's thread for at most
//!   [`ClientConfig::request_timeout`], and return early with
//!   [`RpcError::ConnectionClosed`] if the session ends.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::mpsc;
//!
//! use riftlink::prelude::*;
//!
//! # fn demo(profile: ConnectionProfile, connector: WebSocketConnector) -> Result<(), RpcError> {
//! let (tx, rx) = mpsc::channel();
//! let acquirer = profile.token_acquirer();
//! let client = RpcClientBuilder::new(profile)
//!     .on_connect(move |result| {
//!         let _ = tx.send(result.is_success());
//!     })
//!     .build(connector, acquirer);
//!
//! client.connect()?;
//! if rx.recv().unwrap_or(false) {
//!     let summoner = client.get_summoner_by_name("Some Summoner")?;
//!     println!("{summoner:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod bridge;
mod client;
mod config;
mod dispatch;
mod error;
mod handshake;
pub mod operations;
mod result;

pub use client::{
    ConnectCallback, DisconnectCallback, RpcClient, RpcClientBuilder, StatusCallback,
};
pub use config::{ClientConfig, ClientInfo, ConnectionProfile, ProxySettings, RegionEndpoints};
pub use dispatch::{Dispatcher, Operation};
pub use error::RpcError;
pub use handshake::ConnectionState;
pub use operations::{PublicSummoner, RecentGames};
pub use result::{AuthStage, ConnectResult};

pub use riftlink_auth as auth;
pub use riftlink_protocol as protocol;
pub use riftlink_transport as transport;

/// Everything needed to build a client and make calls.
pub mod prelude {
    pub use crate::{
        AuthStage, ClientConfig, ClientInfo, ConnectResult, ConnectionProfile, ConnectionState,
        Operation, ProxySettings, PublicSummoner, RecentGames, RegionEndpoints, RpcClient,
        RpcClientBuilder, RpcError,
    };
    pub use riftlink_auth::{Credentials, HttpTokenAcquirer, NetworkError, TokenAcquirer};
    pub use riftlink_protocol::{Fault, StatusInfo, Value};
    pub use riftlink_transport::{Connector, Transport, WebSocketConnector};
}
