//! Ambient plumbing shared by every command
//!
//! - **config**: patternkit.toml parsing and validation
//! - **context**: session selections and the per-invocation command context
//! - **error**: error types with contextual help messages and exit codes
//! - **logging**: tracing subscriber installation for the binary
//! - **store**: JSON persistence of patterns, toolkits, drafts, and the session

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod store;
