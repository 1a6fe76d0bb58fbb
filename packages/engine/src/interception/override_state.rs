// packages/engine/src/interception/override_state.rs
//! Runtime override state
//!
//! Holds the enable flag and the target endpoint as one immutable snapshot.
//! Interception call sites read a snapshot once per decision; operator
//! actions swap in a whole new snapshot, so a reader never sees the flag
//! from one update paired with the endpoint from another.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// One consistent view of the override settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideSnapshot {
    /// Operator forced the custom endpoint on
    pub enabled: bool,

    /// Replacement for every recognized `scheme://host`
    pub endpoint: String,
}

impl OverrideSnapshot {
    pub fn new(enabled: bool, endpoint: impl Into<String>) -> Self {
        Self {
            enabled,
            endpoint: endpoint.into(),
        }
    }

    /// Rewriting happens only with the flag set and a non-empty endpoint
    pub fn is_active(&self) -> bool {
        self.enabled && !self.endpoint.is_empty()
    }

    pub fn current_endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Shared, thread-safe override state
///
/// Written rarely (operator actions), read on every intercepted call.
#[derive(Debug, Default)]
pub struct OverrideState {
    current: RwLock<Arc<OverrideSnapshot>>,
}

impl OverrideState {
    /// Inactive state: `{ enabled: false, endpoint: "" }`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: OverrideSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Current snapshot; cheap to take and safe to hold across a decision
    pub fn snapshot(&self) -> Arc<OverrideSnapshot> {
        Arc::clone(&*self.current.read())
    }

    pub fn is_active(&self) -> bool {
        self.current.read().is_active()
    }

    pub fn current_endpoint(&self) -> String {
        self.current.read().endpoint.clone()
    }

    pub fn set_enabled(&self, enabled: bool) -> Arc<OverrideSnapshot> {
        self.update(|s| s.enabled = enabled)
    }

    pub fn set_endpoint(&self, endpoint: impl Into<String>) -> Arc<OverrideSnapshot> {
        let endpoint = endpoint.into();
        self.update(move |s| s.endpoint = endpoint)
    }

    /// Replace flag and endpoint together
    pub fn replace(&self, snapshot: OverrideSnapshot) -> Arc<OverrideSnapshot> {
        self.update(move |s| *s = snapshot)
    }

    /// Force rewriting to `endpoint`
    pub fn activate(&self, endpoint: impl Into<String>) -> Arc<OverrideSnapshot> {
        self.replace(OverrideSnapshot::new(true, endpoint))
    }

    /// Back to the original endpoints
    pub fn deactivate(&self) -> Arc<OverrideSnapshot> {
        self.replace(OverrideSnapshot::default())
    }

    fn update<F>(&self, f: F) -> Arc<OverrideSnapshot>
    where
        F: FnOnce(&mut OverrideSnapshot),
    {
        let mut guard = self.current.write();
        let mut next = (**guard).clone();
        f(&mut next);

        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        drop(guard);

        info!(
            enabled = next.enabled,
            endpoint = %next.endpoint,
            active = next.is_active(),
            "Override state updated"
        );
        next
    }
}
