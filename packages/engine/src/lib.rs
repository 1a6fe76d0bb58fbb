// packages/engine/src/lib.rs
//! srProxy interception engine
//!
//! Redirects requests bound for the recognized game domains to an
//! operator-chosen server, and bypasses certificate checks so that server
//! does not need a trusted certificate.
//!
//! # Architecture
//!
//! The engine is structured into several key modules:
//!
//! - **interception**: URL matcher, override state, rewrite engine, call-site adapters, trust override
//! - **settings**: Persisted operator settings and operator actions
//! - **module**: Attach lifecycle tying the pieces together
//! - **bridge**: Line-delimited JSON protocol for the host agent
//! - **observability**: Logging setup
//! - **utils**: Configuration and errors

// Public module exports
pub mod bridge;
pub mod interception;
pub mod module;
pub mod observability;
pub mod settings;
pub mod utils;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeRequest, BridgeResponse};
pub use interception::{OverrideState, RewriteEngine};
pub use module::ProxyModule;
pub use utils::config::EngineConfig;
pub use utils::errors::{EngineError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Engine build information
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_hash: GIT_HASH,
            build_timestamp: env!("BUILD_TIMESTAMP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = BuildInfo::current();
        assert!(!info.version.is_empty());
        assert!(!info.git_hash.is_empty());
        assert!(!info.build_timestamp.is_empty());
    }
}
