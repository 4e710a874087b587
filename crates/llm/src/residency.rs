//! Model residency policy.
//!
//! Local providers can either keep the model loaded between calls or
//! release it after each request. This matters when the oracle shares a
//! GPU with other models: a resident model is faster, a load-per-call
//! model frees memory between documents. The policy is owned by the
//! provider adapter, never by the chunking engine.

use serde::{Deserialize, Serialize};

/// How long the provider keeps the model in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelResidency {
    /// Model stays loaded between calls (faster, holds memory).
    #[default]
    Resident,

    /// Model is released after each call (slower, frees memory).
    LoadPerCall,
}

impl ModelResidency {
    /// Parse a residency mode from its config string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "resident" | "persistent" => Some(Self::Resident),
            "load-per-call" | "unload" => Some(Self::LoadPerCall),
            _ => None,
        }
    }

    /// The Ollama `keep_alive` value implementing this policy.
    ///
    /// "5m" keeps the model warm between requests; "0" unloads it as soon
    /// as the response is produced.
    pub fn ollama_keep_alive(&self) -> &'static str {
        match self {
            Self::Resident => "5m",
            Self::LoadPerCall => "0",
        }
    }
}
