//! Pure command-protocol logic.
//!
//! Core modules perform no I/O and never touch the world. They operate on
//! parsed commands and return deterministic outputs suitable for tests.

pub mod drop_table;
pub mod lint;
pub mod ops;
pub mod parser;
pub mod recipes;
pub mod schema;
pub mod scope;
pub mod types;
