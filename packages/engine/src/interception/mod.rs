// packages/engine/src/interception/mod.rs
//! Request interception layer
//!
//! Rewrites the destination of outbound requests before the application's
//! network stack consumes them:
//!
//! - **Matcher**: Recognizes `scheme://host` spans of the rewritable domains
//! - **Override State**: Enable flag + target endpoint, swapped atomically
//! - **Rewrite Engine**: Replaces recognized spans with the endpoint
//! - **Call Sites**: One adapter per intercepted API shape
//! - **Hook Host**: Boundary to the host instrumentation mechanism
//! - **TLS Handler**: Certificate-check bypass for rewritten endpoints
//!
//! # Architecture
//!
//! ```text
//! Application code (unmodified)
//!     │
//!     ├─ URL / HTTP parser / builder / loader / JSON call
//!     │       │
//!     │       ▼
//!     │  Call-site adapter ── snapshot ──▶ Override State
//!     │       │
//!     │       ▼
//!     │  Rewrite Engine ──▶ Matcher
//!     │       │
//!     │       ▼
//!     └─ original call proceeds with rewritten argument
//! ```

pub mod call_sites;
pub mod hook_host;
pub mod matcher;
pub mod override_state;
pub mod rewrite;
pub mod tls_handler;

// Re-export commonly used types
pub use call_sites::{CallArg, CallShape, CallSiteAdapter, Intercepted, InterceptionPoint, InterceptionRegistry};
pub use hook_host::{AvailableTargets, HookHost, ParamKind, TargetSignature};
pub use matcher::{MatchRule, MatchSpan};
pub use override_state::{OverrideSnapshot, OverrideState};
pub use rewrite::RewriteEngine;
pub use tls_handler::{TlsCheck, TrustAllCertificates, TrustOverride};
