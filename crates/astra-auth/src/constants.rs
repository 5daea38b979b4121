//! Astra control-plane endpoint constants
//!
//! The auth endpoint lives on a per-database host:
//! `https://{database}-{region}.apps.astra.datastax.com/api/rest/v1/auth`.
//! The provider host is fixed; only the database and region vary.

/// Provider host shared by every Astra database endpoint.
pub const PROVIDER_HOST: &str = "apps.astra.datastax.com";

/// Path of the credential exchange endpoint.
pub const AUTH_PATH: &str = "/api/rest/v1/auth";

/// JSON key holding the bearer token in the auth response.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Media type sent in both `Accept` and `Content-Type`.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Upper bound on the auth response body. A token response is a few hundred bytes.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
