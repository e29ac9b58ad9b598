//! Access decision types.

use crate::types::Order;
use serde::{Deserialize, Serialize};

/// The final outcome of host-based access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allowed,
    Forbidden,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allowed => "allowed",
            Decision::Forbidden => "forbidden",
        }
    }
}

/// A decision together with how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// The final decision.
    pub decision: Decision,

    /// Order the rule set was evaluated under.
    pub order: Order,

    /// Whether any allow entry matched.
    pub allow_matched: bool,

    /// Whether any deny entry matched.
    pub deny_matched: bool,

    /// Reason for the decision.
    pub reason: String,

    /// Set when the decision was forced by an internal error.
    #[serde(default)]
    pub failed_closed: bool,

    /// Time taken to evaluate (in microseconds).
    pub evaluation_time_us: Option<u64>,
}

impl AccessDecision {
    /// Creates a decision from the match flags.
    pub fn new(decision: Decision, order: Order, allow_matched: bool, deny_matched: bool) -> Self {
        let reason = match (allow_matched, deny_matched) {
            (true, true) => format!("allow and deny both matched under order {}", order),
            (true, false) => format!("allow matched under order {}", order),
            (false, true) => format!("deny matched under order {}", order),
            (false, false) => format!("nothing matched, order {} default", order),
        };

        Self {
            decision,
            order,
            allow_matched,
            deny_matched,
            reason,
            failed_closed: false,
            evaluation_time_us: None,
        }
    }

    /// Creates a forbidden decision for an evaluation that hit an internal error.
    pub fn fail_closed(order: Order, reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Forbidden,
            order,
            allow_matched: false,
            deny_matched: false,
            reason: reason.into(),
            failed_closed: true,
            evaluation_time_us: None,
        }
    }

    /// Sets the evaluation time.
    pub fn with_evaluation_time(mut self, time_us: u64) -> Self {
        self.evaluation_time_us = Some(time_us);
        self
    }

    /// Returns true if the decision is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self.decision, Decision::Allowed)
    }

    /// Returns true if the decision is forbidden.
    pub fn is_forbidden(&self) -> bool {
        matches!(self.decision, Decision::Forbidden)
    }
}
