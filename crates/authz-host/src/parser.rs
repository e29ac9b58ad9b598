//! Directive parser.
//!
//! Turns `allow from ...`, `deny from ...` and `order ...` lines into entries
//! and an [`Order`]. Keywords are case-insensitive.

use crate::error::{AuthzError, Result};
use crate::matcher::{is_dotted, IpPattern};
use crate::types::{DirectiveKind, Entry, Order};
use regex::Regex;
use std::net::Ipv6Addr;
use tracing::debug;

/// One parsed directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Allow(Vec<Entry>),
    Deny(Vec<Entry>),
    Order(Order),
}

impl Directive {
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Directive::Allow(_) => DirectiveKind::Allow,
            Directive::Deny(_) => DirectiveKind::Deny,
            Directive::Order(_) => DirectiveKind::Order,
        }
    }
}

/// Parses the argument of an `allow` or `deny` directive, e.g. `from all`.
pub fn parse_allow_or_deny(line: &str) -> Result<Vec<Entry>> {
    parse_from_clause(line, "must be followed by 'from'")
}

fn parse_from_clause(line: &str, missing_from: &str) -> Result<Vec<Entry>> {
    let from = Regex::new(r"(?i)^from\s+(.+)$")?;

    let captures = from
        .captures(line.trim())
        .ok_or_else(|| AuthzError::config(missing_from))?;

    captures[1].split_whitespace().map(parse_entry).collect()
}

/// Converts a single `from` token into an entry. First match wins:
/// `all`, `env=!name`, `env=name`, network, dotted address or prefix,
/// IPv6 literal, hostname.
pub fn parse_entry(token: &str) -> Result<Entry> {
    if token.eq_ignore_ascii_case("all") {
        return Ok(Entry::All);
    }

    // env=! has to be checked before env=
    if let Some(name) = token.strip_prefix("env=!") {
        return env_entry(name, true);
    }

    if let Some(name) = token.strip_prefix("env=") {
        return env_entry(name, false);
    }

    if token.contains('/') || is_dotted(token) {
        IpPattern::parse(token).map_err(AuthzError::ConfigSyntax)?;
        return Ok(Entry::ip(token));
    }

    if token.parse::<Ipv6Addr>().is_ok() {
        return Ok(Entry::ip(token));
    }

    Ok(Entry::host(token))
}

fn env_entry(name: &str, negated: bool) -> Result<Entry> {
    if name.is_empty() {
        return Err(AuthzError::config("env= requires a variable name"));
    }
    Ok(Entry::Env {
        name: name.to_string(),
        negated,
    })
}

/// Parses the argument of an `order` directive.
///
/// Only the exact literals are accepted; `allow, deny` with a space is
/// rejected just like Apache does.
pub fn parse_order(line: &str) -> Result<Order> {
    let value = line.trim();

    [Order::AllowThenDeny, Order::DenyThenAllow, Order::MutualFailure]
        .into_iter()
        .find(|order| order.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| AuthzError::config(format!("unknown order '{}'", value)))
}

/// Parses the argument of a directive whose keyword is already known.
pub fn parse_with_kind(kind: DirectiveKind, args: &str) -> Result<Directive> {
    let missing_from = format!("{} must be followed by 'from'", kind);
    let entries = || parse_from_clause(args, &missing_from);

    let directive = match kind {
        DirectiveKind::Allow => Directive::Allow(entries()?),
        DirectiveKind::Deny => Directive::Deny(entries()?),
        DirectiveKind::Order => Directive::Order(parse_order(args)?),
    };

    debug!(directive = %kind, args = args.trim(), "parsed access directive");
    Ok(directive)
}

/// Parses a full directive line such as `deny from 10.0.0.0/8`.
pub fn parse_directive(line: &str) -> Result<Directive> {
    let line = line.trim();
    let (keyword, args) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));

    let kind = DirectiveKind::from_keyword(keyword)
        .ok_or_else(|| AuthzError::config(format!("unknown directive '{}'", keyword)))?;

    parse_with_kind(kind, args)
}

/// Parses a block of directive lines. Blank lines and `#` comments are
/// skipped; errors carry the 1-based line number.
pub fn parse_directives(text: &str) -> Result<Vec<Directive>> {
    let mut directives = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let directive = parse_directive(trimmed).map_err(|e| match e {
            AuthzError::ConfigSyntax(msg) => {
                AuthzError::ConfigSyntax(format!("line {}: {}", index + 1, msg))
            }
            other => other,
        })?;
        directives.push(directive);
    }

    Ok(directives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_all() {
        assert_eq!(parse_allow_or_deny("from all").unwrap(), vec![Entry::All]);
        assert_eq!(parse_allow_or_deny("FROM all").unwrap(), vec![Entry::All]);
    }

    #[test]
    fn test_missing_from() {
        let err = parse_allow_or_deny("foo").unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("must be followed by 'from'"));

        assert!(parse_allow_or_deny("from").is_err());
        assert!(parse_allow_or_deny("").is_err());
    }

    #[test]
    fn test_token_classification() {
        let entries =
            parse_allow_or_deny("from all env=!BOT env=GOOD 10.0.0.0/8 10.1 ::1 example.com")
                .unwrap();

        assert_eq!(
            entries,
            vec![
                Entry::All,
                Entry::not_env("BOT"),
                Entry::env("GOOD"),
                Entry::ip("10.0.0.0/8"),
                Entry::ip("10.1"),
                Entry::ip("::1"),
                Entry::host("example.com"),
            ]
        );
    }

    #[test]
    fn test_each_token_keeps_its_own_text() {
        let entries = parse_allow_or_deny("from 10.1 192.168.0.0/16 foo.org").unwrap();
        assert_eq!(entries[0], Entry::ip("10.1"));
        assert_eq!(entries[1], Entry::ip("192.168.0.0/16"));
        assert_eq!(entries[2], Entry::host("foo.org"));
    }

    #[test]
    fn test_invalid_ip_tokens() {
        assert!(parse_entry("10.0.0.0/33").unwrap_err().is_config_error());
        assert!(parse_entry("999.1").unwrap_err().is_config_error());
        assert!(parse_entry("env=").unwrap_err().is_config_error());
        assert!(parse_entry("env=!").unwrap_err().is_config_error());
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order("allow,deny").unwrap(), Order::AllowThenDeny);
        assert_eq!(parse_order("deny,allow").unwrap(), Order::DenyThenAllow);
        assert_eq!(parse_order(" mutual-failure ").unwrap(), Order::MutualFailure);
        assert_eq!(parse_order("Deny,Allow").unwrap(), Order::DenyThenAllow);
    }

    #[test]
    fn test_parse_order_rejects_unknown() {
        for bad in ["mutual,failure", "allow, deny", "allow", ""] {
            let err = parse_order(bad).unwrap_err();
            assert!(err.is_config_error(), "{bad}");
            assert!(err.to_string().contains("unknown order"));
        }
    }

    #[test]
    fn test_parse_directive() {
        assert_eq!(
            parse_directive("Deny from env=!TRUSTED").unwrap(),
            Directive::Deny(vec![Entry::not_env("TRUSTED")])
        );
        assert_eq!(
            parse_directive("order allow,deny").unwrap(),
            Directive::Order(Order::AllowThenDeny)
        );

        let err = parse_directive("allow foo").unwrap_err();
        assert_eq!(
            err,
            AuthzError::ConfigSyntax("allow must be followed by 'from'".to_string())
        );

        assert!(parse_directive("satisfy any").unwrap_err().is_config_error());
    }

    #[test]
    fn test_parse_directives_block() {
        let text = "
# local network only
order deny,allow
deny from all

allow from 10.0.0.0/8
";
        let directives = parse_directives(text).unwrap();
        assert_eq!(directives.len(), 3);
        assert_eq!(directives[0].kind(), DirectiveKind::Order);
        assert_eq!(directives[2], Directive::Allow(vec![Entry::ip("10.0.0.0/8")]));
    }

    #[test]
    fn test_parse_directives_reports_line() {
        let err = parse_directives("allow from all\norder sideways\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_token_errors_are_not_prefixed() {
        let err = parse_directive("allow from 10.0.0.0/33").unwrap_err();
        assert_eq!(
            err,
            AuthzError::ConfigSyntax("invalid network '10.0.0.0/33'".to_string())
        );
    }
}
