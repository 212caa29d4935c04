//! Safety-scoped command execution against a scene world.
//!
//! A command file (an envelope or a bare list) is parsed into a batch, every
//! command is checked against its safety scope, and the survivors are
//! dispatched to op handlers that validate content or ensure scene structure.
//! All feedback lands in an append-only [`core::types::ExecutionResult`].
//!
//! - **[`core`]**: Pure logic (protocol types, parsing, scope, schema, lint).
//! - **[`world`]**: The world adapter trait, content views, and the in-memory
//!   world loaded from snapshots.
//! - **[`ops`]**: Op handlers and recipe expansion.
//! - **[`io`]**: Side-effecting operations (config, snapshots, routing,
//!   reports, QA sessions).
//!
//! [`engine`] drives a batch; [`file_runner`] handles one pending command
//! file end to end.

pub mod core;
pub mod engine;
pub mod exit_codes;
pub mod file_runner;
pub mod io;
pub mod logging;
pub mod ops;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod world;
