//! Carver Core Library
//!
//! This crate provides the foundational utilities for the carver toolkit:
//! - Error handling (`CarverError`, `CarverResult`)
//! - Logging infrastructure
//! - Configuration management (chunking knobs, provider selection)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, ChunkingConfig};
pub use error::{CarverError, CarverResult};
