//! LLM provider factory.
//!
//! This module provides a factory for creating LLM clients based on
//! application configuration. It handles provider resolution and
//! residency/timeout wiring.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use crate::residency::ModelResidency;
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai", "claude")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
/// * `residency` - Model residency policy for local providers
/// * `timeout` - Per-request timeout
///
/// # Returns
/// A shared trait object implementing `LlmClient`
///
/// # Errors
/// Returns error if the provider is unknown, required secrets are missing,
/// or the provider is not implemented yet.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    residency: ModelResidency,
    timeout: Duration,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            let client = OllamaClient::with_options(base_url, residency, timeout);
            Ok(Arc::new(client))
        }
        ProviderType::OpenAI => {
            if api_key.is_none() {
                return Err("OpenAI provider requires API key".to_string());
            }
            // TODO: Implement OpenAI client
            Err("OpenAI provider not yet implemented".to_string())
        }
        ProviderType::Claude => {
            if api_key.is_none() {
                return Err("Claude provider requires API key".to_string());
            }
            // TODO: Implement Claude client
            Err("Claude provider not yet implemented".to_string())
        }
    }
}
