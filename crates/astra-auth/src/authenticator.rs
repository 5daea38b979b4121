//! Credential exchange against the Astra auth endpoint
//!
//! One POST per call, no retries:
//! 1. Build `https://{database}-{region}.apps.astra.datastax.com/api/rest/v1/auth`
//! 2. Serialize `{"username", "password"}` as the JSON body
//! 3. POST with JSON `Accept` and `Content-Type` headers through the transport
//! 4. Read the body through a `PooledResponse` (permit released on every path)
//! 5. Decode a JSON object and extract the `authToken` string
//!
//! HTTP status does not short-circuit the exchange: a rejected login usually
//! comes back as a JSON object without `authToken`, reported as `MissingToken`
//! together with the status and the decoded payload.

use std::future::Future;

use common::Secret;
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::constants::{AUTH_PATH, AUTH_TOKEN_KEY, JSON_MEDIA_TYPE, MAX_RESPONSE_BYTES, PROVIDER_HOST};
use crate::credentials::Credentials;
use crate::error::{Error, Result, TimeoutPhase};
use crate::handle::AuthenticatedHandle;
use crate::transport::Transport;

#[derive(Debug, Clone)]
enum Endpoint {
    /// Per-database Astra host derived from the credentials.
    Astra,
    /// Fixed scheme and authority; the auth path is appended.
    BaseUrl(String),
}

/// Exchanges credentials for an `AuthenticatedHandle`.
#[derive(Debug, Clone)]
pub struct Authenticator {
    transport: Transport,
    endpoint: Endpoint,
}

impl Authenticator {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            endpoint: Endpoint::Astra,
        }
    }

    /// Send the exchange to `base_url` instead of the Astra host, e.g. a
    /// local gateway. `AUTH_PATH` is appended to it.
    pub fn with_base_url(transport: Transport, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: Endpoint::BaseUrl(base_url.into()),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Exchange credentials for a bearer token.
    ///
    /// Bounded by the transport's request timeout. On success the handle
    /// shares this authenticator's transport.
    #[instrument(skip_all, fields(database = %credentials.database, region = %credentials.region))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AuthenticatedHandle> {
        let limit = self.transport.config().request_timeout();
        let started = Instant::now();

        let handle = tokio::time::timeout(limit, self.exchange(credentials))
            .await
            .map_err(|_| Error::timeout(TimeoutPhase::Request, limit))??;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "authenticated with Astra"
        );
        Ok(handle)
    }

    /// Like `authenticate`, but also gives up at `deadline`.
    pub async fn authenticate_with_deadline(
        &self,
        credentials: &Credentials,
        deadline: Instant,
    ) -> Result<AuthenticatedHandle> {
        let limit = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout_at(deadline, self.authenticate(credentials)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(limit_ms = limit.as_millis() as u64, "caller deadline reached");
                Err(Error::timeout(TimeoutPhase::CallerDeadline, limit))
            }
        }
    }

    /// Like `authenticate`, but abandons the exchange as soon as `cancel`
    /// completes. The in-flight request is dropped and its permit released.
    pub async fn authenticate_with_cancel<F>(
        &self,
        credentials: &Credentials,
        cancel: F,
    ) -> Result<AuthenticatedHandle>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            () = cancel => {
                debug!("authentication cancelled by caller");
                Err(Error::Cancelled)
            }
            result = self.authenticate(credentials) => result,
        }
    }

    async fn exchange(&self, credentials: &Credentials) -> Result<AuthenticatedHandle> {
        let url = self.auth_url(credentials)?;
        let body = credentials.request_body()?;

        let request = self
            .transport
            .client()
            .post(url)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
            .body(body)
            .build()
            .map_err(|e| Error::RequestConstruction(e.to_string()))?;

        debug!(url = %request.url(), "sending auth request");
        let mut response = self.transport.send(request).await?;
        let status = response.status().as_u16();
        let body = response.read_body(MAX_RESPONSE_BYTES).await?;
        drop(response);

        let token = extract_token(status, &body)?;
        AuthenticatedHandle::new(self.transport.clone(), token).ok_or_else(|| Error::Decode {
            status,
            reason: format!("{AUTH_TOKEN_KEY} is not a valid header value"),
        })
    }

    fn auth_url(&self, credentials: &Credentials) -> Result<Url> {
        check_host_fragment("database", &credentials.database)?;
        check_host_fragment("region", &credentials.region)?;

        let raw = match &self.endpoint {
            Endpoint::Astra => format!(
                "https://{}-{}.{PROVIDER_HOST}{AUTH_PATH}",
                credentials.database, credentials.region
            ),
            Endpoint::BaseUrl(base) => format!("{}{AUTH_PATH}", base.trim_end_matches('/')),
        };

        Url::parse(&raw)
            .map_err(|e| Error::RequestConstruction(format!("invalid auth URL {raw}: {e}")))
    }
}

/// Exchange credentials using a default transport and the Astra endpoint.
pub async fn authenticate(
    region: &str,
    database: &str,
    username: &str,
    password: &str,
) -> Result<AuthenticatedHandle> {
    let authenticator = Authenticator::new(Transport::new()?);
    let credentials = Credentials::new(region, database, username, password);
    authenticator.authenticate(&credentials).await
}

/// Database ids and regions become part of a DNS label.
fn check_host_fragment(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::RequestConstruction(format!("{name} must not be empty")));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(Error::RequestConstruction(format!(
            "{name} {value:?} may only contain ASCII letters, digits and '-'"
        )));
    }
    Ok(())
}

/// Decode the response body and pull out the bearer token.
fn extract_token(status: u16, body: &[u8]) -> Result<Secret<String>> {
    let mut payload = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(Error::Decode {
                status,
                reason: format!("expected a JSON object, got {}", json_type(&other)),
            });
        }
        Err(e) => {
            return Err(Error::Decode {
                status,
                reason: e.to_string(),
            });
        }
    };

    match payload.remove(AUTH_TOKEN_KEY) {
        None => Err(Error::MissingToken {
            status,
            payload: Value::Object(payload),
        }),
        Some(Value::String(token)) if token.is_empty() => Err(Error::Decode {
            status,
            reason: format!("{AUTH_TOKEN_KEY} is empty"),
        }),
        Some(Value::String(token)) => Ok(Secret::new(token)),
        Some(other) => Err(Error::Decode {
            status,
            reason: format!(
                "{AUTH_TOKEN_KEY} must be a string, got {}",
                json_type(&other)
            ),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
