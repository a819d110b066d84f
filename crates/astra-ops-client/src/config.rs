//! Client configuration.
//!
//! All settings are fixed at construction time. The transport timeouts apply
//! to every request made by the client, including the fetches issued by the
//! convergence poller.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for [`AstraClient`](crate::AstraClient).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// API root, without the `/v2` prefix.
    #[serde(default = "ClientConfig::default_base_url")]
    pub base_url: String,

    /// Whole-request timeout in seconds.
    #[serde(default = "ClientConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// TCP connect timeout in seconds.
    #[serde(default = "ClientConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// TCP keepalive interval in seconds.
    #[serde(default = "ClientConfig::default_keepalive")]
    pub tcp_keepalive_seconds: u64,

    /// Maximum idle pooled connections per host.
    #[serde(default = "ClientConfig::default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    /// Log every poll iteration in detail instead of a bare "waiting".
    #[serde(default)]
    pub verbose: bool,

    /// Status codes from the fetch endpoint that mean a database is gone.
    ///
    /// Only consulted while waiting for a terminate to converge.
    #[serde(default = "ClientConfig::default_gone_status_codes")]
    pub gone_status_codes: Vec<u16>,
}

impl ClientConfig {
    fn default_base_url() -> String {
        "https://api.astra.datastax.com".to_string()
    }

    const fn default_request_timeout() -> u64 {
        5
    }

    const fn default_connect_timeout() -> u64 {
        10
    }

    const fn default_keepalive() -> u64 {
        10
    }

    const fn default_pool_max_idle() -> usize {
        10
    }

    fn default_gone_status_codes() -> Vec<u16> {
        // the fetch endpoint answers 401 once a terminated database is purged
        vec![401]
    }

    /// Create a configuration pointing at `base_url` with every other setting
    /// at its default.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Enable or disable verbose poll logging.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Get the databases collection URL.
    #[must_use]
    pub fn databases_url(&self) -> String {
        format!("{}/v2/databases", self.base_url.trim_end_matches('/'))
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the connect timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get the TCP keepalive interval as a `Duration`.
    #[must_use]
    pub const fn tcp_keepalive(&self) -> Duration {
        Duration::from_secs(self.tcp_keepalive_seconds)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            request_timeout_seconds: Self::default_request_timeout(),
            connect_timeout_seconds: Self::default_connect_timeout(),
            tcp_keepalive_seconds: Self::default_keepalive(),
            pool_max_idle_per_host: Self::default_pool_max_idle(),
            verbose: false,
            gone_status_codes: Self::default_gone_status_codes(),
        }
    }
}
