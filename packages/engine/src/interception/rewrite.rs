// packages/engine/src/interception/rewrite.rs
//! Rewrite engine
//!
//! Decides whether a candidate string is rewritten and produces the result.
//! Every recognized `scheme://host` span is replaced by the override endpoint
//! verbatim; whatever follows the host (port, path, query) is kept. An
//! endpoint that wants a scheme must carry one itself.

use crate::interception::matcher::MatchRule;
use crate::interception::override_state::OverrideSnapshot;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// Applies the override to candidate strings
#[derive(Debug, Clone)]
pub struct RewriteEngine {
    rule: Arc<MatchRule>,
}

impl RewriteEngine {
    /// Engine using the built-in recognized suffixes
    pub fn new() -> Self {
        Self::with_rule(MatchRule::recognized())
    }

    pub fn with_rule(rule: Arc<MatchRule>) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &MatchRule {
        &self.rule
    }

    /// Rewrite `candidate` under the given override snapshot
    ///
    /// Returns the input borrowed when the override is inactive or nothing
    /// matches. Stable under repetition as long as the endpoint itself does
    /// not match the recognized suffixes; that choice is up to the operator.
    pub fn rewrite<'a>(&self, candidate: &'a str, state: &OverrideSnapshot) -> Cow<'a, str> {
        if !state.is_active() {
            return Cow::Borrowed(candidate);
        }

        let rewritten = self.rule.replace_all(candidate, state.current_endpoint());

        if cfg!(debug_assertions) {
            debug!(old = %candidate, new = %rewritten, "Rewrite decision");
        }

        rewritten
    }
}

impl Default for RewriteEngine {
    fn default() -> Self {
        Self::new()
    }
}
