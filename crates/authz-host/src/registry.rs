//! Per-scope rule set registry.
//!
//! A scope is whatever the surrounding router configures independently, for
//! example a directory carrying its own `.htaccess`. Each scope publishes one
//! immutable [`RuleSet`]; reloading builds a complete replacement before it
//! becomes visible.

use crate::context::RequestContext;
use crate::decision::AccessDecision;
use crate::error::Result;
use crate::evaluator;
use crate::rule_set::RuleSet;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct ScopeEntry {
    rule_set: Arc<RuleSet>,
    fingerprint: String,
    loaded_at: DateTime<Utc>,
}

/// Summary of a published scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeInfo {
    pub scope: String,
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    pub allow_entries: usize,
    pub deny_entries: usize,
}

/// Maps configuration scopes to their published rule sets.
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    scopes: RwLock<HashMap<String, ScopeEntry>>,
}

impl ScopeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses directive text and publishes it under `scope`.
    ///
    /// Returns `Ok(false)` if the scope already holds an identical rule set.
    /// A parse error leaves the scope as it was.
    pub fn load_scope(&self, scope: &str, text: &str) -> Result<bool> {
        let rule_set = RuleSet::from_directives(text)?;
        Ok(self.publish(scope, rule_set))
    }

    /// Publishes a rule set under `scope`. Returns false if nothing changed.
    pub fn publish(&self, scope: &str, rule_set: RuleSet) -> bool {
        let fingerprint = rule_set.fingerprint();
        let mut scopes = self.scopes.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = scopes.get(scope) {
            if existing.fingerprint == fingerprint {
                debug!(scope, "access rules unchanged, skipping reload");
                return false;
            }
        }

        info!(scope, fingerprint = %fingerprint, "publishing access rules");
        scopes.insert(
            scope.to_string(),
            ScopeEntry {
                rule_set: Arc::new(rule_set),
                fingerprint,
                loaded_at: Utc::now(),
            },
        );
        true
    }

    /// The rule set currently published for `scope`.
    pub fn get(&self, scope: &str) -> Option<Arc<RuleSet>> {
        self.scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .map(|entry| Arc::clone(&entry.rule_set))
    }

    /// Metadata about a published scope.
    pub fn info(&self, scope: &str) -> Option<ScopeInfo> {
        self.scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .map(|entry| ScopeInfo {
                scope: scope.to_string(),
                fingerprint: entry.fingerprint.clone(),
                loaded_at: entry.loaded_at,
                allow_entries: entry.rule_set.allow_entries().len(),
                deny_entries: entry.rule_set.deny_entries().len(),
            })
    }

    /// Removes a scope, returning its last rule set.
    pub fn remove(&self, scope: &str) -> Option<Arc<RuleSet>> {
        self.scopes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(scope)
            .map(|entry| entry.rule_set)
    }

    /// Names of all published scopes, sorted.
    pub fn scopes(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Fail-closed check of a request against `scope`.
    ///
    /// A scope with no access directives behaves like an empty rule set,
    /// which allows under the default deny,allow order.
    pub fn check(&self, scope: &str, ctx: &RequestContext) -> AccessDecision {
        match self.get(scope) {
            Some(rule_set) => evaluator::check_access(&rule_set, ctx),
            None => {
                debug!(scope, "no access rules for scope");
                evaluator::check_access(&RuleSet::default(), ctx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Entry, Order};

    #[test]
    fn test_load_and_check() {
        let registry = ScopeRegistry::new();
        assert!(registry.load_scope("/admin", "order deny,allow\ndeny from all\nallow from 10.0").unwrap());

        assert!(registry.check("/admin", &RequestContext::new("10.0.3.4")).is_allowed());
        assert!(registry.check("/admin", &RequestContext::new("10.1.3.4")).is_forbidden());
        assert!(registry.check("/public", &RequestContext::new("10.1.3.4")).is_allowed());
    }

    #[test]
    fn test_identical_reload_is_noop() {
        let registry = ScopeRegistry::new();
        assert!(registry.load_scope("/", "deny from all").unwrap());
        let first = registry.info("/").unwrap();

        assert!(!registry.load_scope("/", "# same rules\ndeny   from all").unwrap());
        assert_eq!(registry.info("/").unwrap().loaded_at, first.loaded_at);

        assert!(registry.load_scope("/", "allow from all").unwrap());
        assert_ne!(registry.info("/").unwrap().fingerprint, first.fingerprint);
    }

    #[test]
    fn test_failed_load_keeps_previous() {
        let registry = ScopeRegistry::new();
        registry.load_scope("/", "deny from all").unwrap();

        let err = registry.load_scope("/", "deny everyone").unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(registry.get("/").unwrap().deny_entries().len(), 1);
    }

    #[test]
    fn test_remove_and_list() {
        let registry = ScopeRegistry::new();
        registry.load_scope("/b", "allow from all").unwrap();
        registry.load_scope("/a", "allow from all").unwrap();
        assert_eq!(registry.scopes(), vec!["/a".to_string(), "/b".to_string()]);

        assert!(registry.remove("/a").is_some());
        assert!(registry.get("/a").is_none());
        assert_eq!(registry.info("/b").unwrap().allow_entries, 1);
    }

    #[test]
    fn test_reload_with_same_token_different_kind() {
        let registry = ScopeRegistry::new();
        let client = RequestContext::new("10.1.2.3");

        let host_rule = RuleSet::new(Order::DenyThenAllow, vec![], vec![Entry::host("10.1")]);
        assert!(registry.publish("/", host_rule));
        assert!(registry.check("/", &client).is_allowed());

        let ip_rule = RuleSet::new(Order::DenyThenAllow, vec![], vec![Entry::ip("10.1")]);
        assert!(registry.publish("/", ip_rule));
        assert!(registry.check("/", &client).is_forbidden());
    }
}
