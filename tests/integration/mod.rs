//! Integration tests for patternkit
//!
//! CLI flows run the built binary in a temporary working directory. Library flows
//! drive the public API with in-memory collaborators.

mod helpers;
mod test_draft;
mod test_generation;
mod test_pattern;
mod test_upgrade;
