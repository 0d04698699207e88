//! Token acquisition for Riftlink.
//!
//! Before a client may open its gateway connection it needs a short-lived
//! token from the login queue. This crate provides:
//!
//! 1. **The contract** — the [`TokenAcquirer`] trait, a blocking
//!    credentials → [`AuthToken`] exchange.
//! 2. **The real thing** — [`HttpTokenAcquirer`], which talks to the
//!    login queue over HTTPS with `reqwest`.
//! 3. **The data** — [`Credentials`], [`AuthToken`], and the [`Session`]
//!    the gateway hands back after the first remote login.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client core (above)  ← drives the handshake, owns the token briefly
//!     ↕
//! Auth layer (this crate)  ← login queue HTTP exchange
//! ```

mod acquirer;
mod error;
mod http;
mod session;

pub use acquirer::TokenAcquirer;
pub use error::NetworkError;
pub use http::{HttpAcquirerConfig, HttpTokenAcquirer};
pub use session::{AuthToken, Credentials, Session};
