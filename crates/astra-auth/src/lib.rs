//! Astra control-plane authentication
//!
//! Exchanges a database username/password for a bearer token and returns an
//! `AuthenticatedHandle` bundling that token with a pooled, deadline-bounded
//! HTTP transport. Callers use the handle to issue their own REST calls.
//!
//! Flow:
//! 1. `Transport::build(&TransportConfig)` (or `Transport::new()` for the default policy)
//! 2. `Authenticator::new(transport)`
//! 3. `authenticator.authenticate(&Credentials)` → `AuthenticatedHandle`
//! 4. `handle.send(handle.request(Method::GET, url))` attaches
//!    `Authorization: Bearer <token>` and runs within the per-host cap
//!
//! `authenticate(region, database, username, password)` runs steps 1–3 with
//! defaults. Token refresh, retries and credential persistence are left to
//! the caller.

pub mod authenticator;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod handle;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use authenticator::{Authenticator, authenticate};
pub use config::TransportConfig;
pub use constants::*;
pub use credentials::Credentials;
pub use error::{Error, NetworkError, Result, TimeoutPhase};
pub use handle::AuthenticatedHandle;
pub use transport::{PooledResponse, Transport};
