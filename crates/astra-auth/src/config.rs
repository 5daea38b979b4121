//! Transport policy configuration
//!
//! Defaults reproduce the fixed policy of the auth client. A TOML file may
//! override individual values under a `[transport]` table; anything omitted
//! keeps its default. Values are validated after parsing.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Pooling and timeout policy for the auth transport.
///
/// Every phase of a request gets its own deadline so a call against the
/// remote control plane can never hang indefinitely.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransportConfig {
    /// Overall bound on one exchange, from connection permit to last body byte.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_pool_size")]
    pub max_idle_connections: usize,
    #[serde(default = "default_pool_size")]
    pub max_connections_per_host: usize,
    #[serde(default = "default_pool_size")]
    pub max_idle_connections_per_host: usize,
    /// TCP dial timeout. The transport applies the smaller of this and
    /// `tls_handshake_timeout_secs` to the whole connect.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_tls_handshake_timeout")]
    pub tls_handshake_timeout_secs: u64,
    #[serde(default = "default_response_header_timeout")]
    pub response_header_timeout_secs: u64,
    /// The client never sends `Expect: 100-continue`, so only the default
    /// is accepted.
    #[serde(default = "default_expect_continue_timeout")]
    pub expect_continue_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    5
}

fn default_pool_size() -> usize {
    10
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_keep_alive() -> u64 {
    10
}

fn default_tls_handshake_timeout() -> u64 {
    5
}

fn default_response_header_timeout() -> u64 {
    5
}

fn default_expect_continue_timeout() -> u64 {
    1
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            max_idle_connections: default_pool_size(),
            max_connections_per_host: default_pool_size(),
            max_idle_connections_per_host: default_pool_size(),
            connect_timeout_secs: default_connect_timeout(),
            keep_alive_secs: default_keep_alive(),
            tls_handshake_timeout_secs: default_tls_handshake_timeout(),
            response_header_timeout_secs: default_response_header_timeout(),
            expect_continue_timeout_secs: default_expect_continue_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    transport: Option<TransportConfig>,
}

impl TransportConfig {
    /// Load transport policy from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| common::Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse transport policy from TOML text. A missing `[transport]` table
    /// yields the defaults.
    pub fn from_toml_str(contents: &str) -> common::Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        let config = file.transport.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Reject zero timeouts and pool limits that could never be honored.
    pub fn validate(&self) -> common::Result<()> {
        let timeouts = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("keep_alive_secs", self.keep_alive_secs),
            ("tls_handshake_timeout_secs", self.tls_handshake_timeout_secs),
            (
                "response_header_timeout_secs",
                self.response_header_timeout_secs,
            ),
            (
                "expect_continue_timeout_secs",
                self.expect_continue_timeout_secs,
            ),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(common::Error::Config(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        if self.expect_continue_timeout_secs != default_expect_continue_timeout() {
            return Err(common::Error::Config(format!(
                "expect_continue_timeout_secs cannot be changed from {}: requests never send Expect: 100-continue",
                default_expect_continue_timeout()
            )));
        }

        if self.max_connections_per_host == 0 {
            return Err(common::Error::Config(
                "max_connections_per_host must be greater than 0".into(),
            ));
        }

        if self.max_idle_connections_per_host > self.max_connections_per_host {
            return Err(common::Error::Config(format!(
                "max_idle_connections_per_host ({}) exceeds max_connections_per_host ({})",
                self.max_idle_connections_per_host, self.max_connections_per_host
            )));
        }

        if self.max_idle_connections_per_host > self.max_idle_connections {
            return Err(common::Error::Config(format!(
                "max_idle_connections_per_host ({}) exceeds max_idle_connections ({})",
                self.max_idle_connections_per_host, self.max_idle_connections
            )));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn tls_handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_handshake_timeout_secs)
    }

    pub fn response_header_timeout(&self) -> Duration {
        Duration::from_secs(self.response_header_timeout_secs)
    }

    pub fn expect_continue_timeout(&self) -> Duration {
        Duration::from_secs(self.expect_continue_timeout_secs)
    }
}
