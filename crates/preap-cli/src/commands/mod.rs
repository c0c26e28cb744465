//! Subcommand implementations.

pub mod batch;
pub mod build;
pub mod config;
pub mod fields;
pub mod process;
pub mod serve;
