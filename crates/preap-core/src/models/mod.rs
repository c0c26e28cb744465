//! Data models: raw analysis results, PREAP envelopes and configuration.

pub mod analysis;
pub mod config;
pub mod envelope;
