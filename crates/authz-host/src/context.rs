//! Per-request context consumed by the matcher.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// What the surrounding pipeline knows about one request.
///
/// Built per request and discarded once the decision is produced; the engine
/// only borrows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Client address in textual form.
    pub client_ip: String,

    /// Client hostname, if the pipeline resolved one. Empty when unknown.
    #[serde(default)]
    pub hostname: String,

    /// Request environment variables.
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl RequestContext {
    /// Creates a context for a client address with no hostname or environment.
    pub fn new(client_ip: impl Into<String>) -> Self {
        Self {
            client_ip: client_ip.into(),
            hostname: String::new(),
            environment: HashMap::new(),
        }
    }

    /// Sets the client hostname.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Sets an environment variable.
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    /// Replaces the whole environment.
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// Returns true if `name` is set in the environment, whatever its value.
    pub fn has_env(&self, name: &str) -> bool {
        self.environment.contains_key(name)
    }

    /// Parses the client address. IPv4-mapped IPv6 addresses are returned
    /// as IPv4 so they match IPv4 rules.
    pub fn client_addr(&self) -> Option<IpAddr> {
        let addr: IpAddr = self.client_ip.trim().parse().ok()?;
        match addr {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Some(IpAddr::V4(v4)),
                None => Some(IpAddr::V6(v6)),
            },
            v4 => Some(v4),
        }
    }
}
