//! Pooled HTTP transport with per-phase deadlines
//!
//! `Transport` wraps a `reqwest::Client` tuned from `TransportConfig` and a
//! table of per-host connection semaphores. reqwest has no cap on open
//! connections per host, so every exchange holds a permit for its target
//! `host:port` until its response is dropped. Clones share the pool and the
//! permit table.
//!
//! Deadline mapping:
//! - dial and TLS handshake: `connect_timeout`, set to the smaller of the two
//!   limits since reqwest bounds both with one timer
//! - response headers: `tokio::time::timeout` around `Client::execute`
//! - whole request: `Client` timeout (the authenticator also bounds permit wait
//!   and body read with the same limit)

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use reqwest::{Client, Request, StatusCode, Url};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::error::{Error, NetworkError, Result, TimeoutPhase};

/// Pooled network client for the Astra control plane.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    permits: Arc<HostPermits>,
    config: Arc<TransportConfig>,
}

impl Transport {
    /// Build a transport with the default policy.
    pub fn new() -> Result<Self> {
        Self::build(&TransportConfig::default())
    }

    /// Build a transport from an explicit policy.
    ///
    /// Fails only on an invalid policy or when the TLS backend cannot start.
    pub fn build(config: &TransportConfig) -> Result<Self> {
        config.validate()?;

        // reqwest only keeps an idle cap per host; the total cap bounds it.
        let idle_per_host = config
            .max_idle_connections_per_host
            .min(config.max_idle_connections);

        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(connect_limit(config))
            .tcp_keepalive(config.keep_alive())
            .pool_max_idle_per_host(idle_per_host)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let per_host = config.max_connections_per_host.min(Semaphore::MAX_PERMITS);
        debug!(
            max_connections_per_host = per_host,
            idle_per_host,
            request_timeout_secs = config.request_timeout_secs,
            "transport built"
        );

        Ok(Self {
            client,
            permits: Arc::new(HostPermits::new(per_host)),
            config: Arc::new(config.clone()),
        })
    }

    /// Underlying client, for collaborators issuing their own requests.
    ///
    /// Requests executed directly on the client skip the per-host cap; use
    /// `send` to stay within it.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Connection permits for the host of `url` not held by an in-flight
    /// exchange.
    pub fn available_permits(&self, url: &Url) -> usize {
        self.permits.available(&host_key(url))
    }

    /// Execute a request, returning once the response headers arrive.
    ///
    /// The returned guard holds the connection permit for the request's host
    /// until it is dropped.
    pub async fn send(&self, request: Request) -> Result<PooledResponse> {
        let host = host_key(request.url());
        let semaphore = self.permits.semaphore(&host);

        let permit_limit = self.config.request_timeout();
        let permit = tokio::time::timeout(permit_limit, semaphore.acquire_owned())
            .await
            .map_err(|_| Error::timeout(TimeoutPhase::ConnectionPermit, permit_limit))?
            .map_err(|_| Error::Transport("connection permits closed".into()))?;

        let header_limit = self.config.response_header_timeout();
        let started = Instant::now();
        let response = tokio::time::timeout(header_limit, self.client.execute(request))
            .await
            .map_err(|_| Error::timeout(TimeoutPhase::ResponseHeaders, header_limit))?
            .map_err(|e| Error::Network(NetworkError::Request(e)))?;

        let status = response.status();
        debug!(
            %host,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "response headers received"
        );

        Ok(PooledResponse {
            status,
            response: Some(response),
            _permit: permit,
        })
    }
}

/// reqwest's connect timeout covers the dial and the TLS handshake together,
/// so the tighter of the two limits applies to both.
fn connect_limit(config: &TransportConfig) -> Duration {
    config.connect_timeout().min(config.tls_handshake_timeout())
}

/// Permit table key: `host:port`, with the scheme's default port filled in.
fn host_key(url: &Url) -> String {
    format!(
        "{}:{}",
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or_default()
    )
}

/// One semaphore per remote host, created on first use.
#[derive(Debug)]
struct HostPermits {
    per_host: usize,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostPermits {
    fn new(per_host: usize) -> Self {
        Self {
            per_host,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        hosts
            .entry(host.to_owned())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host)))
            .clone()
    }

    fn available(&self, host: &str) -> usize {
        let hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        hosts
            .get(host)
            .map_or(self.per_host, |s| s.available_permits())
    }
}

/// A response whose body is read at most once, with the connection permit
/// released when the guard drops on any path.
///
/// A body that was never fully read cannot go back to the idle pool; the
/// drop only logs a warning for it and never fails the caller.
pub struct PooledResponse {
    status: StatusCode,
    response: Option<reqwest::Response>,
    _permit: OwnedSemaphorePermit,
}

impl PooledResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Read the whole body, failing if it exceeds `limit` bytes.
    pub async fn read_body(&mut self, limit: usize) -> Result<Vec<u8>> {
        let status = self.status.as_u16();
        let Some(response) = self.response.as_mut() else {
            return Ok(Vec::new());
        };

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Network(NetworkError::Request(e)))?
        {
            if body.len() + chunk.len() > limit {
                return Err(Error::Decode {
                    status,
                    reason: format!("response body exceeds {limit} bytes"),
                });
            }
            body.extend_from_slice(&chunk);
        }

        self.response = None;
        Ok(body)
    }
}

impl std::fmt::Debug for PooledResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledResponse")
            .field("status", &self.status)
            .field("body_pending", &self.response.is_some())
            .finish()
    }
}

impl Drop for PooledResponse {
    fn drop(&mut self) {
        if self.response.is_some() {
            warn!(
                status = self.status.as_u16(),
                "unable to drain response body, connection will not be reused"
            );
        }
    }
}
