// packages/engine/src/interception/hook_host.rs
//! Boundary to the host instrumentation mechanism
//!
//! The host is whatever attaches "before this call executes" callbacks to
//! the target process. The engine only asks it whether a target member
//! exists; delivering arguments and resuming the call stay on the host side.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Parameter kinds that appear in intercepted signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// A string value
    String,
    /// A runtime type descriptor
    Type,
    /// A list of values
    List,
}

impl ParamKind {
    fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "String",
            ParamKind::Type => "Type",
            ParamKind::List => "List",
        }
    }
}

/// Fully qualified member the host is asked to locate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetSignature {
    /// Declaring class
    pub owner: &'static str,
    /// Member name, `<init>` for constructors
    pub member: &'static str,
    /// Leading parameter kinds the member must accept; an empty list
    /// accepts any overload of the member
    pub params: &'static [ParamKind],
}

impl TargetSignature {
    /// Stable `owner#member(P1, P2)` form used on the wire
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TargetSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(ParamKind::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}#{}({})", self.owner, self.member, params)
    }
}

/// Host instrumentation mechanism
pub trait HookHost {
    /// Whether the target member exists in the attached process and a
    /// before-call hook can be placed on it
    fn locate(&self, target: &TargetSignature) -> bool;
}

/// Host that reports a fixed set of available target ids
#[derive(Debug, Clone, Default)]
pub struct AvailableTargets {
    ids: HashSet<String>,
}

impl AvailableTargets {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl HookHost for AvailableTargets {
    fn locate(&self, target: &TargetSignature) -> bool {
        self.ids.contains(&target.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARSE: TargetSignature = TargetSignature {
        owner: "okhttp3.HttpUrl",
        member: "parse",
        params: &[ParamKind::String],
    };

    #[test]
    fn test_signature_id() {
        assert_eq!(PARSE.id(), "okhttp3.HttpUrl#parse(String)");

        let any = TargetSignature {
            owner: "a.B",
            member: "verify",
            params: &[],
        };
        assert_eq!(any.id(), "a.B#verify()");
    }

    #[test]
    fn test_available_targets() {
        let host = AvailableTargets::new(["okhttp3.HttpUrl#parse(String)"]);
        assert_eq!(host.len(), 1);
        assert!(host.locate(&PARSE));

        let empty = AvailableTargets::default();
        assert!(empty.is_empty());
        assert!(!empty.locate(&PARSE));
    }
}
