//! Immutable rule sets and the builder that produces them.

use crate::error::{AuthzError, Result};
use crate::hash;
use crate::parser::{self, Directive};
use crate::types::{DirectiveKind, Entry, Order};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// The allow/deny lists and order for one configuration scope.
///
/// Built once, then shared read-only. There is no mutation API; a reload
/// builds a new rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    order: Order,

    #[serde(default)]
    allow: Vec<Entry>,

    #[serde(default)]
    deny: Vec<Entry>,
}

impl RuleSet {
    /// Creates a rule set from already-built parts without validating them.
    pub fn new(order: Order, allow: Vec<Entry>, deny: Vec<Entry>) -> Self {
        Self { order, allow, deny }
    }

    /// Starts a builder.
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    /// Parses directive text such as an `.htaccess` block.
    pub fn from_directives(text: &str) -> Result<Self> {
        let mut builder = RuleSetBuilder::new();
        for directive in parser::parse_directives(text)? {
            builder.apply(directive);
        }
        Ok(builder.build())
    }

    /// Parses a rule set from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rule_set: RuleSet = serde_yaml::from_str(yaml)?;
        rule_set.validate()?;
        Ok(rule_set)
    }

    /// Parses a rule set from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let rule_set: RuleSet = serde_json::from_str(json)?;
        rule_set.validate()?;
        Ok(rule_set)
    }

    /// Serializes the rule set to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serializes the rule set to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// Allow entries in insertion order.
    pub fn allow_entries(&self) -> &[Entry] {
        &self.allow
    }

    /// Deny entries in insertion order.
    pub fn deny_entries(&self) -> &[Entry] {
        &self.deny
    }

    /// Returns true if neither list has entries.
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }

    /// Checks every entry the way the directive parser would, so hand-built
    /// or deserialized rule sets fail at load time instead of per request.
    pub fn validate(&self) -> Result<()> {
        for entry in self.allow.iter().chain(self.deny.iter()) {
            validate_entry(entry)?;
        }
        Ok(())
    }

    /// Renders the rule set as canonical directive text.
    pub fn to_directives(&self) -> String {
        let mut out = format!("order {}\n", self.order);

        for (kind, entries) in [(DirectiveKind::Allow, &self.allow), (DirectiveKind::Deny, &self.deny)] {
            if entries.is_empty() {
                continue;
            }
            let tokens: Vec<String> = entries.iter().map(Entry::to_string).collect();
            let _ = writeln!(out, "{} from {}", kind, tokens.join(" "));
        }

        out
    }

    /// SHA-256 over a variant-tagged rendering, so entries that print the
    /// same token (a host named `10.1` and the prefix `10.1`) still differ.
    pub fn fingerprint(&self) -> String {
        let mut tagged = format!("order {}\n", self.order);
        for (kind, entries) in [(DirectiveKind::Allow, &self.allow), (DirectiveKind::Deny, &self.deny)] {
            for entry in entries {
                let _ = writeln!(tagged, "{} {} {}", kind, entry.kind(), entry);
            }
        }
        hash::compute_fingerprint(&tagged)
    }
}

/// An entry is valid only if its directive token parses back to the same
/// entry; anything else would change meaning on a round trip.
fn validate_entry(entry: &Entry) -> Result<()> {
    let token = entry.to_string();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthzError::config(format!(
            "invalid {} entry '{}'",
            entry.kind(),
            token
        )));
    }

    let reparsed = parser::parse_entry(&token)?;
    if reparsed != *entry {
        return Err(AuthzError::config(format!(
            "{} entry '{}' would be read back as {}",
            entry.kind(),
            token,
            reparsed.kind()
        )));
    }
    Ok(())
}

/// Accumulates directives during configuration loading.
///
/// Allow and deny directives append; a later `order` replaces an earlier one.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    order: Option<Order>,
    allow: Vec<Entry>,
    deny: Vec<Entry>,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a parsed directive.
    pub fn apply(&mut self, directive: Directive) -> &mut Self {
        match directive {
            Directive::Allow(entries) => self.allow.extend(entries),
            Directive::Deny(entries) => self.deny.extend(entries),
            Directive::Order(order) => self.order = Some(order),
        }
        self
    }

    /// Parses and applies one directive given as keyword plus raw argument.
    pub fn apply_line(&mut self, keyword: &str, raw_line: &str) -> Result<&mut Self> {
        let kind = DirectiveKind::from_keyword(keyword)
            .ok_or_else(|| AuthzError::config(format!("unknown directive '{}'", keyword)))?;
        let directive = parser::parse_with_kind(kind, raw_line)?;
        Ok(self.apply(directive))
    }

    /// Adds allow entries.
    pub fn allow(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.allow.extend(entries);
        self
    }

    /// Adds deny entries.
    pub fn deny(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.deny.extend(entries);
        self
    }

    /// Sets the order.
    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// Builds the rule set. Without an `order` directive the order is
    /// deny,allow.
    pub fn build(self) -> RuleSet {
        RuleSet {
            order: self.order.unwrap_or_default(),
            allow: self.allow,
            deny: self.deny,
        }
    }
}

/// Builds a rule set from `(keyword, argument)` pairs as delivered by a
/// configuration loader. The first bad line aborts the whole scope.
pub fn build_rule_set<I, K, L>(lines: I) -> Result<RuleSet>
where
    I: IntoIterator<Item = (K, L)>,
    K: AsRef<str>,
    L: AsRef<str>,
{
    let mut builder = RuleSetBuilder::new();
    for (keyword, raw_line) in lines {
        builder.apply_line(keyword.as_ref(), raw_line.as_ref())?;
    }
    Ok(builder.build())
}
