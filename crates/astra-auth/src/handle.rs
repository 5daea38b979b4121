//! Authenticated handle returned by a successful exchange
//!
//! The handle bundles the transport with the bearer token. It is read-only;
//! a new token means a new handle from `Authenticator`. Cloning shares the
//! connection pool and the per-host permits.

use std::fmt;

use common::Secret;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{IntoUrl, Method, RequestBuilder};

use crate::error::{Error, Result};
use crate::transport::{PooledResponse, Transport};

/// Transport plus bearer token. Only constructed with a usable token.
#[derive(Clone)]
pub struct AuthenticatedHandle {
    transport: Transport,
    token: Secret<String>,
    bearer: HeaderValue,
}

impl AuthenticatedHandle {
    /// Returns `None` when the token is empty or cannot be sent as a header.
    pub(crate) fn new(transport: Transport, token: Secret<String>) -> Option<Self> {
        if token.is_empty() {
            return None;
        }
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose())).ok()?;
        bearer.set_sensitive(true);
        Some(Self {
            transport,
            token,
            bearer,
        })
    }

    pub fn token(&self) -> &str {
        self.token.expose()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Attach `Authorization: Bearer <token>` to a request.
    pub fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(AUTHORIZATION, self.bearer.clone())
    }

    /// Start an authorized request on the handle's transport.
    ///
    /// Pass the builder to `send` to stay within the per-host connection cap;
    /// `RequestBuilder::send` goes straight to the client and skips it.
    pub fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        self.authorize(self.transport.client().request(method, url))
    }

    /// Send an authorized request through the transport's per-host permits.
    ///
    /// The bearer header is set here as well (replacing any existing one),
    /// so builders from other clients work too.
    pub async fn send(&self, builder: RequestBuilder) -> Result<PooledResponse> {
        let mut request = builder
            .build()
            .map_err(|e| Error::RequestConstruction(e.to_string()))?;
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.bearer.clone());
        self.transport.send(request).await
    }
}

impl fmt::Debug for AuthenticatedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedHandle")
            .field("transport", &self.transport)
            .field("token", &self.token)
            .finish()
    }
}
