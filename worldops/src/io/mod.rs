//! Filesystem side of worldops: config, world snapshots, command routing,
//! reports and QA sessions.

pub mod config;
pub mod init;
pub mod report;
pub mod routing;
pub mod session;
pub mod world_store;
