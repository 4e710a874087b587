//! The split oracle: the engine's view of the language model.
//!
//! The engine consumes the oracle through two operations: summarize a span
//! of text (seed and finalize phases) and choose a split line inside a
//! line-indexed window (resplit phase). Failures are either transient
//! (transport, timeout, empty reply — the engine retries with unchanged
//! input) or parse failures (the reply lacked the required structured
//! fields — the LLM adapter re-asks once with a clarifying re-prompt
//! before escalating).

use crate::window::LineWindow;
use carver_llm::{LlmClient, LlmRequest};
use std::sync::Arc;
use thiserror::Error;

/// Oracle failure modes.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Timeout or transport failure; retryable with unchanged input.
    #[error("transient oracle failure: {0}")]
    Transient(String),

    /// The reply did not contain the required structured fields.
    #[error("oracle reply could not be parsed: {0}")]
    Parse(String),
}

/// The oracle's resplit decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDecision {
    /// Inclusive end line of the first sub-chunk within the shown window
    pub end_line: usize,

    /// Summary of the first sub-chunk
    pub first_summary: String,

    /// Summary of the rest of the shown window; becomes the next carry
    /// summary after a commit
    pub second_summary: String,
}

/// External oracle interface consumed by the chunking engine.
///
/// Any concrete LLM backend implements this; transport, auth, and model
/// residency are the implementation's concern, never the engine's.
#[async_trait::async_trait]
pub trait SplitOracle: Send + Sync {
    /// Summarize `text`. `context` carries the summary of everything
    /// already finalized; `None` marks the seed call at document start.
    async fn summarize(
        &self,
        source: &str,
        context: Option<&str>,
        text: &str,
    ) -> Result<String, OracleError>;

    /// Choose the end line of the next chunk inside `window`.
    async fn choose_split(
        &self,
        context: &str,
        window: &LineWindow<'_>,
    ) -> Result<SplitDecision, OracleError>;
}

/// LLM-backed oracle over any `LlmClient` provider.
pub struct LlmSplitOracle {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
}

impl LlmSplitOracle {
    /// Create an oracle using the given provider and model.
    ///
    /// Split decisions want determinism, so the temperature is pinned low.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.1,
        }
    }

    async fn complete(&self, prompt: String) -> Result<String, OracleError> {
        let request = LlmRequest::new(prompt, &self.model).with_temperature(self.temperature);

        match self.client.complete(&request).await {
            Ok(response) => Ok(response.content),
            Err(e) => Err(OracleError::Transient(e.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl SplitOracle for LlmSplitOracle {
    async fn summarize(
        &self,
        source: &str,
        context: Option<&str>,
        text: &str,
    ) -> Result<String, OracleError> {
        let prompt = match context {
            None => carver_prompt::render_first_summary(source, text),
            Some(ctx) => carver_prompt::render_last_summary(ctx, text),
        }
        .map_err(|e| OracleError::Parse(e.to_string()))?;

        let reply = self.complete(prompt).await?;

        // An empty summary is retried like a transport failure: same
        // input, bounded attempts.
        carver_prompt::parse_summary(&reply).map_err(|e| OracleError::Transient(e.to_string()))
    }

    async fn choose_split(
        &self,
        context: &str,
        window: &LineWindow<'_>,
    ) -> Result<SplitDecision, OracleError> {
        let numbered = window.numbered();
        let prompt = carver_prompt::render_resplit(context, &numbered, window.max_line())
            .map_err(|e| OracleError::Parse(e.to_string()))?;

        let reply = self.complete(prompt.clone()).await?;

        match carver_prompt::parse_resplit(&reply) {
            Ok(parsed) => Ok(decision_from(parsed)),
            Err(first_err) => {
                tracing::warn!(
                    "Resplit reply failed to parse, re-asking with clarification: {}",
                    first_err
                );

                let clarified = format!("{}{}", prompt, carver_prompt::clarify_resplit_suffix());
                let reply = self.complete(clarified).await?;

                carver_prompt::parse_resplit(&reply)
                    .map(decision_from)
                    .map_err(|e| OracleError::Parse(e.to_string()))
            }
        }
    }
}

fn decision_from(parsed: carver_prompt::ResplitReply) -> SplitDecision {
    SplitDecision {
        end_line: parsed.end_line,
        first_summary: parsed.first_summary,
        second_summary: parsed.second_summary,
    }
}
