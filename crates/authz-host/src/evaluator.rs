//! Access evaluation.

use crate::context::RequestContext;
use crate::decision::{AccessDecision, Decision};
use crate::error::Result;
use crate::matcher;
use crate::rule_set::RuleSet;
use crate::types::Order;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Combines the allow and deny match results under an order.
pub fn decide(order: Order, allow_matched: bool, deny_matched: bool) -> Decision {
    match order {
        Order::AllowThenDeny => {
            let mut result = if allow_matched {
                Decision::Allowed
            } else {
                Decision::Forbidden
            };
            if deny_matched {
                result = Decision::Forbidden;
            }
            result
        }

        Order::DenyThenAllow => {
            let mut result = if deny_matched {
                Decision::Forbidden
            } else {
                Decision::Allowed
            };
            if allow_matched {
                result = Decision::Allowed;
            }
            result
        }

        Order::MutualFailure => {
            if allow_matched && !deny_matched {
                Decision::Allowed
            } else {
                Decision::Forbidden
            }
        }
    }
}

/// Evaluates a rule set against a request.
///
/// Errors only when an entry is malformed, which cannot happen for rule sets
/// built by the directive parser or validated after deserialization.
pub fn evaluate(rule_set: &RuleSet, ctx: &RequestContext) -> Result<AccessDecision> {
    let start = Instant::now();

    let allow_matched = matcher::any_match(rule_set.allow_entries(), ctx)?;
    let deny_matched = matcher::any_match(rule_set.deny_entries(), ctx)?;
    let decision = decide(rule_set.order(), allow_matched, deny_matched);

    Ok(
        AccessDecision::new(decision, rule_set.order(), allow_matched, deny_matched)
            .with_evaluation_time(start.elapsed().as_micros() as u64),
    )
}

/// Evaluates and never errors: an internal error is logged and the request
/// is forbidden.
pub fn check_access(rule_set: &RuleSet, ctx: &RequestContext) -> AccessDecision {
    match evaluate(rule_set, ctx) {
        Ok(decision) => {
            if decision.is_forbidden() {
                warn!(
                    client_ip = %ctx.client_ip,
                    hostname = %ctx.hostname,
                    order = %decision.order,
                    "access denied"
                );
            } else {
                debug!(client_ip = %ctx.client_ip, "access allowed");
            }
            decision
        }
        Err(err) => {
            error!(client_ip = %ctx.client_ip, error = %err, "access check failed, denying");
            AccessDecision::fail_closed(rule_set.order(), err.to_string())
        }
    }
}

/// Holds the published rule set for one scope and swaps it on reload.
///
/// Evaluations clone the `Arc` they start with, so a reload never exposes a
/// half-updated rule set.
#[derive(Debug, Default)]
pub struct AccessEvaluator {
    rule_set: RwLock<Arc<RuleSet>>,
}

impl AccessEvaluator {
    /// Creates an evaluator publishing `rule_set`.
    pub fn new(rule_set: RuleSet) -> Self {
        Self {
            rule_set: RwLock::new(Arc::new(rule_set)),
        }
    }

    /// Creates an evaluator from directive text.
    pub fn from_directives(text: &str) -> Result<Self> {
        Ok(Self::new(RuleSet::from_directives(text)?))
    }

    /// The currently published rule set.
    pub fn current(&self) -> Arc<RuleSet> {
        self.rule_set
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publishes a new rule set and returns the previous one.
    pub fn reload(&self, rule_set: RuleSet) -> Arc<RuleSet> {
        info!(order = %rule_set.order(), fingerprint = %rule_set.fingerprint(), "access rules reloaded");
        let next = Arc::new(rule_set);
        let mut guard = self.rule_set.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    /// Parses directive text and publishes it. On error the current rule set
    /// stays in place.
    pub fn reload_from_directives(&self, text: &str) -> Result<()> {
        let rule_set = RuleSet::from_directives(text)?;
        self.reload(rule_set);
        Ok(())
    }

    /// Evaluates against the current rule set.
    pub fn evaluate(&self, ctx: &RequestContext) -> Result<AccessDecision> {
        evaluate(&self.current(), ctx)
    }

    /// Fail-closed evaluation against the current rule set.
    pub fn check(&self, ctx: &RequestContext) -> AccessDecision {
        check_access(&self.current(), ctx)
    }

    /// Returns true if the request is allowed.
    pub fn is_allowed(&self, ctx: &RequestContext) -> bool {
        self.check(ctx).is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entry;

    fn ctx(ip: &str) -> RequestContext {
        RequestContext::new(ip)
    }

    #[test]
    fn test_truth_table() {
        use Decision::{Allowed, Forbidden};

        let cases = [
            (Order::AllowThenDeny, false, false, Forbidden),
            (Order::AllowThenDeny, true, false, Allowed),
            (Order::AllowThenDeny, false, true, Forbidden),
            (Order::AllowThenDeny, true, true, Forbidden),
            (Order::DenyThenAllow, false, false, Allowed),
            (Order::DenyThenAllow, true, false, Allowed),
            (Order::DenyThenAllow, false, true, Forbidden),
            (Order::DenyThenAllow, true, true, Allowed),
            (Order::MutualFailure, false, false, Forbidden),
            (Order::MutualFailure, true, false, Allowed),
            (Order::MutualFailure, false, true, Forbidden),
            (Order::MutualFailure, true, true, Forbidden),
        ];

        for (order, allow, deny, expected) in cases {
            assert_eq!(decide(order, allow, deny), expected, "{order} allow={allow} deny={deny}");
        }
    }

    #[test]
    fn test_local_network_only() {
        let rule_set = RuleSet::from_directives(
            "order deny,allow\ndeny from all\nallow from 192.168.0.0/16 127.0.0.1",
        )
        .unwrap();

        assert!(evaluate(&rule_set, &ctx("192.168.1.20")).unwrap().is_allowed());
        assert!(evaluate(&rule_set, &ctx("127.0.0.1")).unwrap().is_allowed());
        assert!(evaluate(&rule_set, &ctx("8.8.8.8")).unwrap().is_forbidden());
    }

    #[test]
    fn test_allow_deny_blocks_bad_host() {
        let rule_set = RuleSet::from_directives(
            "order allow,deny\nallow from example.com\ndeny from bad.example.com",
        )
        .unwrap();

        let good = ctx("10.0.0.1").with_hostname("www.example.com");
        let bad = ctx("10.0.0.2").with_hostname("bad.example.com");
        let other = ctx("10.0.0.3").with_hostname("example.org");

        assert!(evaluate(&rule_set, &good).unwrap().is_allowed());
        assert!(evaluate(&rule_set, &bad).unwrap().is_forbidden());
        assert!(evaluate(&rule_set, &other).unwrap().is_forbidden());
    }

    #[test]
    fn test_decision_flags() {
        let rule_set = RuleSet::from_directives("order mutual-failure\nallow from all\ndeny from 10")
            .unwrap();
        let decision = evaluate(&rule_set, &ctx("10.9.9.9")).unwrap();

        assert!(decision.allow_matched);
        assert!(decision.deny_matched);
        assert_eq!(decision.decision, Decision::Forbidden);
        assert!(decision.evaluation_time_us.is_some());
    }

    #[test]
    fn test_malformed_rule_set_fails_closed() {
        let rule_set = RuleSet::new(Order::DenyThenAllow, vec![Entry::ip("not/an/ip")], vec![]);

        assert!(evaluate(&rule_set, &ctx("10.0.0.1")).unwrap_err().is_logic_error());

        let decision = check_access(&rule_set, &ctx("10.0.0.1"));
        assert!(decision.is_forbidden());
        assert!(decision.failed_closed);
    }

    #[test]
    fn test_reload_swaps_rule_set() {
        let evaluator = AccessEvaluator::from_directives("deny from all").unwrap();
        let before = evaluator.current();
        assert!(!evaluator.is_allowed(&ctx("10.0.0.1")));

        evaluator.reload_from_directives("allow from all").unwrap();
        assert!(evaluator.is_allowed(&ctx("10.0.0.1")));

        // the old snapshot is untouched
        assert!(evaluate(&before, &ctx("10.0.0.1")).unwrap().is_forbidden());
    }

    #[test]
    fn test_failed_reload_keeps_rules() {
        let evaluator = AccessEvaluator::from_directives("deny from all").unwrap();
        assert!(evaluator.reload_from_directives("order upside-down").is_err());
        assert!(!evaluator.is_allowed(&ctx("10.0.0.1")));
    }
}
