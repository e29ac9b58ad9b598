//! Core types for the access control engine.

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One parsed access rule.
///
/// Each `allow from` / `deny from` token becomes exactly one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
    /// Matches every request.
    All,

    /// Matches on presence (or absence, when `negated`) of an environment variable.
    Env { name: String, negated: bool },

    /// An IP literal, a dotted prefix such as `10.1`, or a network such as
    /// `10.0.0.0/8` or `10.0.0.0/255.0.0.0`.
    Ip { pattern: String },

    /// A full hostname or a domain suffix.
    Host { pattern: String },
}

impl Entry {
    /// Creates an environment gate that matches when `name` is set.
    pub fn env(name: impl Into<String>) -> Self {
        Entry::Env {
            name: name.into(),
            negated: false,
        }
    }

    /// Creates an environment gate that matches when `name` is not set.
    pub fn not_env(name: impl Into<String>) -> Self {
        Entry::Env {
            name: name.into(),
            negated: true,
        }
    }

    /// Creates an IP rule.
    pub fn ip(pattern: impl Into<String>) -> Self {
        Entry::Ip {
            pattern: pattern.into(),
        }
    }

    /// Creates a host rule.
    pub fn host(pattern: impl Into<String>) -> Self {
        Entry::Host {
            pattern: pattern.into(),
        }
    }

    /// Short tag naming the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::All => "all",
            Entry::Env { negated: false, .. } => "env",
            Entry::Env { negated: true, .. } => "nenv",
            Entry::Ip { .. } => "ip",
            Entry::Host { .. } => "host",
        }
    }
}

/// Renders the entry back to the directive token it was parsed from.
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::All => f.write_str("all"),
            Entry::Env {
                name,
                negated: false,
            } => write!(f, "env={}", name),
            Entry::Env {
                name,
                negated: true,
            } => write!(f, "env=!{}", name),
            Entry::Ip { pattern } | Entry::Host { pattern } => f.write_str(pattern),
        }
    }
}

/// How allow and deny matches combine into a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    /// Allowed only if an allow entry matches; any deny match wins.
    #[serde(rename = "allow,deny")]
    AllowThenDeny,

    /// Allowed unless a deny entry matches; any allow match wins.
    #[serde(rename = "deny,allow")]
    DenyThenAllow,

    /// Allowed only if an allow entry matches and no deny entry does.
    #[serde(rename = "mutual-failure")]
    MutualFailure,
}

impl Order {
    /// The literal accepted by the `order` directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::AllowThenDeny => "allow,deny",
            Order::DenyThenAllow => "deny,allow",
            Order::MutualFailure => "mutual-failure",
        }
    }

    /// Numeric code used by older configuration stores.
    pub fn code(&self) -> u8 {
        match self {
            Order::AllowThenDeny => 1,
            Order::DenyThenAllow => 2,
            Order::MutualFailure => 3,
        }
    }
}

impl Default for Order {
    fn default() -> Self {
        Order::DenyThenAllow
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for Order {
    type Error = AuthzError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Order::AllowThenDeny),
            2 => Ok(Order::DenyThenAllow),
            3 => Ok(Order::MutualFailure),
            other => Err(AuthzError::logic(format!("unknown order: {}", other))),
        }
    }
}

/// The directives this engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Allow,
    Deny,
    Order,
}

impl DirectiveKind {
    /// Looks up a directive keyword, ignoring case.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("allow") {
            Some(DirectiveKind::Allow)
        } else if keyword.eq_ignore_ascii_case("deny") {
            Some(DirectiveKind::Deny)
        } else if keyword.eq_ignore_ascii_case("order") {
            Some(DirectiveKind::Order)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Allow => "allow",
            DirectiveKind::Deny => "deny",
            DirectiveKind::Order => "order",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
