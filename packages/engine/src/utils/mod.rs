// packages/engine/src/utils/mod.rs
//! Common utilities shared across the engine
//!
//! - **config**: Layered engine configuration (file + environment)
//! - **errors**: Engine error taxonomy

pub mod config;
pub mod errors;

pub use config::EngineConfig;
pub use errors::{EngineError, Result};
