//! Host-based access control
//!
//! Decides per request whether a client is allowed or forbidden from
//! `allow from`, `deny from` and `order` directives, in the manner of
//! Apache's `mod_authz_host`. Entries match on client IP (literal, dotted
//! prefix or network), hostname suffix, or presence of an environment
//! variable.
//!
//! ```
//! use authz_host::{evaluate, RequestContext, RuleSet};
//!
//! let rules = RuleSet::from_directives(
//!     "order deny,allow\ndeny from all\nallow from 192.168.0.0/16",
//! )
//! .unwrap();
//!
//! let decision = evaluate(&rules, &RequestContext::new("192.168.4.2")).unwrap();
//! assert!(decision.is_allowed());
//! ```

pub mod context;
pub mod decision;
pub mod error;
pub mod evaluator;
pub mod hash;
pub mod matcher;
pub mod parser;
pub mod registry;
pub mod rule_set;
pub mod types;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use context::RequestContext;
pub use decision::{AccessDecision, Decision};
pub use error::{AuthzError, Result};
pub use evaluator::{check_access, evaluate, AccessEvaluator};
pub use registry::ScopeRegistry;
pub use rule_set::{build_rule_set, RuleSet, RuleSetBuilder};
pub use types::{DirectiveKind, Entry, Order};

/// Version of the access engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::context::RequestContext;
    pub use crate::decision::{AccessDecision, Decision};
    pub use crate::error::{AuthzError, Result};
    pub use crate::evaluator::{check_access, evaluate, AccessEvaluator};
    pub use crate::parser::{parse_allow_or_deny, parse_directive, parse_order, Directive};
    pub use crate::registry::ScopeRegistry;
    pub use crate::rule_set::{build_rule_set, RuleSet, RuleSetBuilder};
    pub use crate::types::*;
}
