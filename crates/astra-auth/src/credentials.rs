//! Login credentials for one exchange
//!
//! Credentials live only for the duration of an `authenticate` call. The
//! password stays wrapped in `Secret` and is exposed solely while the JSON
//! request body is written.

use common::Secret;
use serde::Serialize;

use crate::error::{Error, Result};

/// Database coordinates plus the username/password pair to exchange.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub region: String,
    pub database: String,
    pub username: String,
    pub password: Secret<String>,
}

/// Wire shape of the auth request body.
#[derive(Serialize)]
struct AuthRequest<'a> {
    username: &'a str,
    password: &'a str,
}

impl Credentials {
    pub fn new(
        region: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<Secret<String>>,
    ) -> Self {
        Self {
            region: region.into(),
            database: database.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Serialize `{"username": .., "password": ..}` for the request body.
    pub(crate) fn request_body(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&AuthRequest {
            username: &self.username,
            password: self.password.expose(),
        })
        .map_err(Error::Serialization)
    }
}
