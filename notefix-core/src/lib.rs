//! Core audit and fix pipelines, decoupled from the CLI.
//!
//! These entry points are argument-parser-free: the caller hands in plain
//! settings structs and gets outcome structs back. The engine is a pure
//! function of (schema, filesystem snapshot, config); no ambient process
//! state is read here.

mod error;
mod pipeline;
mod settings;

pub use error::CoreError;
pub use pipeline::{
    AuditOutcome, FixRunOutcome, ScopeFilter, load_and_resolve, run_audit, run_auto_fix,
    run_interactive_fix,
};
pub use settings::{AuditSettings, FixSettings, RunConfig};

/// Process exit conventions for a wrapping CLI.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const RUNTIME_ERROR: u8 = 1;
    /// Error-severity issues remain (audit) or remaining/errored fixes.
    pub const VALIDATION_FAILED: u8 = 2;
    /// Fatal schema-resolution failure, reported before any per-file work.
    pub const SCHEMA_ERROR: u8 = 3;
}
