//! Data models: configuration and manifest rows.

pub mod config;
pub mod manifest;
