//! Pattern authoring, toolkit versioning, and draft-driven code generation
//!
//! - **schema**: patterns, elements, attributes, automation, and toolkit snapshots
//! - **version**: change severity tracking and next-version rules
//! - **draft**: lazily materialised instance trees bound to a toolkit
//! - **migration**: upgrading a draft to a newer toolkit release
//! - **automation**: launch points, CLI commands, and idempotent file generation
//! - **core**: errors, config, logging, session, and the on-disk store
//! - **commands**: CLI command handlers

pub mod automation;
pub mod commands;
pub mod core;
pub mod draft;
pub mod migration;
pub mod schema;
pub mod version;
