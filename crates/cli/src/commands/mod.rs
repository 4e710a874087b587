//! Command handlers for the Carver CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod chunk;
pub mod inspect;

// Re-export command types for convenience
pub use chunk::ChunkCommand;
pub use inspect::InspectCommand;
