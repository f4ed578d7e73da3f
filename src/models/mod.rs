//! Data models for the diagnosis service

pub mod config;

// Re-export main model types
pub use config::Config;
