// ABOUTME: Library root for registry-gc - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exporter;
pub mod gc;
pub mod output;
pub mod policy;
pub mod readiness;
pub mod registry;
pub mod types;
