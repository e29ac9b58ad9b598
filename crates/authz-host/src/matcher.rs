//! Matching of single entries against a request.

use crate::context::RequestContext;
use crate::error::{AuthzError, Result};
use crate::types::Entry;
use ipnet::IpNet;
use std::net::{IpAddr, Ipv6Addr};

/// A parsed IP rule pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpPattern {
    /// `addr/prefix` or `addr/netmask`.
    Network(IpNet),

    /// A complete address.
    Exact(IpAddr),

    /// Leading octets of an IPv4 address, e.g. `10.1`. Stored without a
    /// trailing dot.
    Prefix(String),
}

impl IpPattern {
    /// Parses an IP rule pattern. The error is a plain message so callers can
    /// decide whether it is a configuration or a logic failure.
    pub fn parse(pattern: &str) -> std::result::Result<Self, String> {
        if let Some((addr, mask)) = pattern.split_once('/') {
            return parse_network(addr, mask)
                .map(IpPattern::Network)
                .ok_or_else(|| format!("invalid network '{}'", pattern));
        }

        if is_dotted(pattern) {
            let trimmed = pattern.strip_suffix('.').unwrap_or(pattern);
            let octets: Vec<&str> = trimmed.split('.').collect();
            let valid = !trimmed.is_empty()
                && octets.len() <= 4
                && octets.iter().all(|o| !o.is_empty() && o.parse::<u8>().is_ok());
            if !valid {
                return Err(format!("invalid IP address or prefix '{}'", pattern));
            }

            if octets.len() == 4 {
                return trimmed
                    .parse()
                    .map(IpPattern::Exact)
                    .map_err(|_| format!("invalid IP address '{}'", pattern));
            }
            return Ok(IpPattern::Prefix(trimmed.to_string()));
        }

        pattern
            .parse::<Ipv6Addr>()
            .map(|v6| IpPattern::Exact(IpAddr::V6(v6)))
            .map_err(|_| format!("invalid IP address '{}'", pattern))
    }

    /// Returns true if the client in `ctx` falls under this pattern.
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        let raw = ctx.client_ip.trim();
        let addr = ctx.client_addr();

        match self {
            IpPattern::Network(net) => addr.map_or(false, |a| net.contains(&a)),
            IpPattern::Exact(expected) => match addr {
                Some(a) => a == *expected,
                None => raw == expected.to_string(),
            },
            IpPattern::Prefix(prefix) => {
                let normalized = match addr {
                    Some(IpAddr::V4(v4)) => Some(v4.to_string()),
                    _ => None,
                };
                std::iter::once(raw)
                    .chain(normalized.as_deref())
                    .any(|candidate| has_octet_prefix(candidate, prefix))
            }
        }
    }
}

/// True if the pattern consists solely of digits and dots.
pub(crate) fn is_dotted(pattern: &str) -> bool {
    !pattern.is_empty() && pattern.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn parse_network(addr: &str, mask: &str) -> Option<IpNet> {
    let addr: IpAddr = addr.parse().ok()?;

    let prefix_len = if let Ok(len) = mask.parse::<u8>() {
        len
    } else {
        match (addr, mask.parse::<IpAddr>().ok()?) {
            (IpAddr::V4(_), IpAddr::V4(m)) => ipnet::ipv4_mask_to_prefix(m).ok()?,
            (IpAddr::V6(_), IpAddr::V6(m)) => ipnet::ipv6_mask_to_prefix(m).ok()?,
            _ => return None,
        }
    };

    IpNet::new(addr, prefix_len).ok()
}

/// `10.1` matches `10.1` and `10.1.x.y`, never `10.12.x.y`.
fn has_octet_prefix(candidate: &str, prefix: &str) -> bool {
    match candidate.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

fn host_matches(pattern: &str, hostname: &str) -> bool {
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();

    if hostname.is_empty() || pattern.is_empty() {
        return false;
    }

    if pattern.starts_with('.') {
        return hostname.ends_with(&pattern);
    }

    hostname == pattern
        || (hostname.len() > pattern.len()
            && hostname.ends_with(&pattern)
            && hostname.as_bytes()[hostname.len() - pattern.len() - 1] == b'.')
}

/// Decides whether one entry matches the request.
///
/// Fails with a logic error only for entries the directive parser would have
/// rejected, such as an empty variable name or an unparseable IP pattern.
pub fn matches(entry: &Entry, ctx: &RequestContext) -> Result<bool> {
    match entry {
        Entry::All => Ok(true),

        Entry::Env { name, negated } => {
            if name.is_empty() {
                return Err(AuthzError::logic("env entry with empty variable name"));
            }
            Ok(ctx.has_env(name) != *negated)
        }

        Entry::Ip { pattern } => {
            let parsed = IpPattern::parse(pattern)
                .map_err(|e| AuthzError::logic(format!("malformed ip entry: {}", e)))?;
            Ok(parsed.matches(ctx))
        }

        Entry::Host { pattern } => {
            if pattern.is_empty() || pattern.contains(char::is_whitespace) {
                return Err(AuthzError::logic(format!(
                    "malformed host entry '{}'",
                    pattern
                )));
            }
            Ok(host_matches(pattern, &ctx.hostname))
        }
    }
}

/// Returns true if any entry in the list matches.
pub fn any_match(entries: &[Entry], ctx: &RequestContext) -> Result<bool> {
    for entry in entries {
        if matches(entry, ctx)? {
            return Ok(true);
        }
    }
    Ok(false)
}
