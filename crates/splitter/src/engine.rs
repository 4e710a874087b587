//! The recursive chunking engine.
//!
//! A run over one document is a three-phase state machine:
//!
//! - SEED: summarize the opening window to prime the carry summary.
//! - RESPLIT: while the remaining text exceeds the small-enough threshold,
//!   show the oracle a line-indexed window, cut at its chosen line, commit
//!   the first part as a chunk, and thread its second summary forward as
//!   the next carry.
//! - FINALIZE: summarize the remaining tail and emit it as exactly one
//!   chunk.
//!
//! Two guards keep the run honest against pathological oracle decisions.
//! A cut shorter than the minimum viable chunk length is never committed;
//! the window is grown and the oracle asked again, and once the window
//! covers the whole remainder the run breaks to FINALIZE. A cut that would
//! leave a trailing fragment shorter than the minimum is also never
//! committed; the run breaks so FINALIZE absorbs the fragment into the
//! final chunk. Both guards guarantee forward progress: every committed
//! chunk is at least the minimum length, so the loop is bounded by
//! `len(document) / min_chunk_len` iterations.

use crate::baseline::BaselinePresplitter;
use crate::cancel::CancelFlag;
use crate::document::{Chunk, SourceDocument};
use crate::oracle::{OracleError, SplitOracle};
use crate::window::LineWindow;
use carver_core::ChunkingConfig;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Phase of the chunking state machine, reported on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Seed,
    Resplit,
    Finalize,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Seed => "seed",
            Phase::Resplit => "resplit",
            Phase::Finalize => "finalize",
        };
        write!(f, "{}", name)
    }
}

/// What ultimately stopped a document run.
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("cancelled")]
    Cancelled,

    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Fatal failure for one document.
///
/// Carries the phase and byte offset at which the run stopped plus every
/// chunk committed before the failure, so a caller can resume from the
/// offset instead of redoing the whole document's oracle calls.
#[derive(Debug, Error)]
#[error("chunking of '{source_id}' failed in {phase} phase at offset {offset}: {cause}")]
pub struct ChunkingFailed {
    pub source_id: String,
    pub phase: Phase,
    pub offset: usize,
    pub committed: Vec<Chunk>,
    pub cause: FailureCause,
}

/// LLM-guided recursive document splitter.
pub struct RecursiveSplitter {
    oracle: Arc<dyn SplitOracle>,
    config: ChunkingConfig,
    baseline: BaselinePresplitter,
}

impl RecursiveSplitter {
    pub fn new(oracle: Arc<dyn SplitOracle>, config: ChunkingConfig) -> Self {
        let baseline = BaselinePresplitter::new(config.target_chunk_size);
        Self {
            oracle,
            config,
            baseline,
        }
    }

    /// Split one document into chunks.
    ///
    /// An empty document yields an empty chunk list. Every other document
    /// yields at least one chunk, and concatenating the chunk texts in
    /// order reproduces the document exactly.
    pub async fn split_document(
        &self,
        doc: &SourceDocument,
        cancel: &CancelFlag,
    ) -> Result<Vec<Chunk>, ChunkingFailed> {
        let text = doc.text();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut committed: Vec<Chunk> = Vec::new();
        let threshold = self.config.small_enough_threshold();
        let min_len = self.config.min_chunk_len;

        // SEED: prime the carry summary from the opening window.
        self.check_cancel(doc, Phase::Seed, 0, &committed, cancel)?;

        let seed_end = self
            .baseline
            .candidates(text)
            .first()
            .copied()
            .unwrap_or(text.len());
        let mut carry = self
            .with_transient_retries(|| self.oracle.summarize(doc.source_id(), None, &text[..seed_end]))
            .await
            .map_err(|e| self.failure(doc, Phase::Seed, 0, &committed, FailureCause::Oracle(e)))?;

        tracing::debug!(source = doc.source_id(), seed_end, "Seeded carry summary");

        // RESPLIT: commit chunks until the remainder is small enough.
        let mut consumed = 0usize;
        let mut boost = 1usize;

        while text.len() - consumed > threshold {
            self.check_cancel(doc, Phase::Resplit, consumed, &committed, cancel)?;

            let remaining = &text[consumed..];
            // The window reaches at least the configured budget, extended
            // to the baseline's second natural break when that lies further
            let natural = self
                .baseline
                .candidates(remaining)
                .get(1)
                .copied()
                .unwrap_or(0);
            let base_budget = natural.max(self.config.window_budget());
            let window = LineWindow::over(remaining, base_budget.saturating_mul(boost));

            let decision = self
                .with_transient_retries(|| self.oracle.choose_split(&carry, &window))
                .await
                .map_err(|e| {
                    self.failure(doc, Phase::Resplit, consumed, &committed, FailureCause::Oracle(e))
                })?;

            let cut = window.cut_offset(decision.end_line);

            if cut < min_len {
                // Degenerate cut. Once the window already shows the whole
                // remainder there is nothing more to reveal; the final
                // chunk absorbs it.
                if window.covers_all() {
                    break;
                }
                boost = boost.saturating_mul(2);
                tracing::debug!(
                    source = doc.source_id(),
                    offset = consumed,
                    cut,
                    boost,
                    "Cut below minimum, growing window"
                );
                continue;
            }

            if remaining.len() - cut < min_len {
                // Committing here would strand a degenerate tail fragment;
                // fold it forward into the final chunk instead.
                break;
            }

            let position = committed.len() as u32;
            committed.push(Chunk::new(
                doc.source_id(),
                position,
                &remaining[..cut],
                decision.first_summary,
                (consumed, consumed + cut),
            ));
            carry = decision.second_summary;
            consumed += cut;
            boost = 1;

            tracing::debug!(
                source = doc.source_id(),
                position,
                offset = consumed,
                chunk_len = cut,
                "Committed chunk"
            );
        }

        // FINALIZE: exactly one chunk for the remaining tail.
        self.check_cancel(doc, Phase::Finalize, consumed, &committed, cancel)?;

        let tail = &text[consumed..];
        if tail.is_empty() {
            return Err(self.failure(
                doc,
                Phase::Finalize,
                consumed,
                &committed,
                FailureCause::Invariant("no text left for the final chunk".to_string()),
            ));
        }

        let summary = self
            .with_transient_retries(|| self.oracle.summarize(doc.source_id(), Some(&carry), tail))
            .await
            .map_err(|e| {
                self.failure(doc, Phase::Finalize, consumed, &committed, FailureCause::Oracle(e))
            })?;

        let position = committed.len() as u32;
        committed.push(Chunk::new(
            doc.source_id(),
            position,
            tail,
            summary,
            (consumed, text.len()),
        ));

        tracing::info!(
            source = doc.source_id(),
            chunks = committed.len(),
            bytes = text.len(),
            "Document chunked"
        );

        Ok(committed)
    }

    /// Retry transient oracle failures with unchanged input, bounded by
    /// the configured attempt count. Parse failures are not retried here;
    /// the oracle adapter already re-asked once with a clarification.
    async fn with_transient_retries<T, Fut>(
        &self,
        mut call: impl FnMut() -> Fut,
    ) -> Result<T, OracleError>
    where
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let max_attempts = self.config.max_oracle_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match call().await {
                Ok(value) => return Ok(value),
                Err(OracleError::Transient(msg)) => {
                    tracing::warn!(attempt, max_attempts, "Transient oracle failure: {}", msg);
                    last_error = Some(OracleError::Transient(msg));
                }
                Err(other) => return Err(other),
            }
        }

        Err(last_error
            .unwrap_or_else(|| OracleError::Transient("no oracle attempts made".to_string())))
    }

    fn check_cancel(
        &self,
        doc: &SourceDocument,
        phase: Phase,
        offset: usize,
        committed: &[Chunk],
        cancel: &CancelFlag,
    ) -> Result<(), ChunkingFailed> {
        if cancel.is_cancelled() {
            Err(self.failure(doc, phase, offset, committed, FailureCause::Cancelled))
        } else {
            Ok(())
        }
    }

    fn failure(
        &self,
        doc: &SourceDocument,
        phase: Phase,
        offset: usize,
        committed: &[Chunk],
        cause: FailureCause,
    ) -> ChunkingFailed {
        ChunkingFailed {
            source_id: doc.source_id().to_string(),
            phase,
            offset,
            committed: committed.to_vec(),
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::SplitDecision;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type SplitFn = Box<dyn Fn(usize, &LineWindow<'_>) -> Result<SplitDecision, OracleError> + Send + Sync>;
    type SummarizeFn = Box<dyn Fn(usize) -> Result<String, OracleError> + Send + Sync>;

    /// Oracle driven by plain functions of the call index.
    struct MockOracle {
        split_fn: SplitFn,
        summarize_fn: SummarizeFn,
        split_calls: AtomicUsize,
        summarize_calls: AtomicUsize,
    }

    impl MockOracle {
        fn new(split_fn: SplitFn, summarize_fn: SummarizeFn) -> Self {
            Self {
                split_fn,
                summarize_fn,
                split_calls: AtomicUsize::new(0),
                summarize_calls: AtomicUsize::new(0),
            }
        }

        /// Always cut at the given window line.
        fn splitting_at(line: usize) -> Self {
            Self::new(
                Box::new(move |n, _| Ok(decision(line, n))),
                Box::new(|n| Ok(format!("summary {}", n))),
            )
        }

        /// Always cut at the last line of the shown window.
        fn greedy() -> Self {
            Self::new(
                Box::new(|n, window| Ok(decision(window.max_line(), n))),
                Box::new(|n| Ok(format!("summary {}", n))),
            )
        }
    }

    fn decision(end_line: usize, n: usize) -> SplitDecision {
        SplitDecision {
            end_line,
            first_summary: format!("first {}", n),
            second_summary: format!("second {}", n),
        }
    }

    #[async_trait::async_trait]
    impl SplitOracle for MockOracle {
        async fn summarize(
            &self,
            _source: &str,
            _context: Option<&str>,
            _text: &str,
        ) -> Result<String, OracleError> {
            let n = self.summarize_calls.fetch_add(1, Ordering::SeqCst);
            (self.summarize_fn)(n)
        }

        async fn choose_split(
            &self,
            _context: &str,
            window: &LineWindow<'_>,
        ) -> Result<SplitDecision, OracleError> {
            let n = self.split_calls.fetch_add(1, Ordering::SeqCst);
            (self.split_fn)(n, window)
        }
    }

    fn test_config() -> ChunkingConfig {
        ChunkingConfig {
            target_chunk_size: 500,
            window_multiplier: 2.0,
            small_enough_multiplier: 1.5,
            min_chunk_len: 64,
            max_oracle_attempts: 3,
            oracle_timeout_secs: 120,
            max_parallel_documents: 2,
        }
    }

    fn splitter(oracle: MockOracle, config: ChunkingConfig) -> RecursiveSplitter {
        RecursiveSplitter::new(Arc::new(oracle), config)
    }

    fn concat(chunks: &[Chunk]) -> String {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    /// One line of `len` bytes including its trailing newline.
    fn line(len: usize) -> String {
        let mut s = "x".repeat(len - 1);
        s.push('\n');
        s
    }

    #[tokio::test]
    async fn test_empty_document_yields_no_chunks() {
        let s = splitter(MockOracle::splitting_at(0), test_config());
        let doc = SourceDocument::new("empty.txt", "");
        let chunks = s.split_document(&doc, &CancelFlag::new()).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_short_document_single_chunk() {
        // Below the small-enough threshold: the resplit loop never runs
        let oracle = MockOracle::new(
            Box::new(|_, _| Err(OracleError::Parse("must not be called".to_string()))),
            Box::new(|n| Ok(format!("summary {}", n))),
        );
        let s = splitter(oracle, test_config());

        let text = "Title\n\nOne short paragraph of fifty characters here.";
        let doc = SourceDocument::new("short.txt", text);
        let chunks = s.split_document(&doc, &CancelFlag::new()).await.unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[0].metadata.byte_range, (0, text.len()));
    }

    #[tokio::test]
    async fn test_greedy_oracle_folds_trailing_fragment() {
        // 1396-byte first line plus a 4-byte tail. A greedy cut at the
        // last shown line would strand the tail, so the run folds it into
        // a single final chunk instead of committing a 1396/4 split.
        let mut text = line(1396);
        text.push_str("end.");
        assert_eq!(text.len(), 1400);

        let s = splitter(MockOracle::greedy(), test_config());
        let doc = SourceDocument::new("greedy.txt", &text);
        let chunks = s.split_document(&doc, &CancelFlag::new()).await.unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[tokio::test]
    async fn test_five_paragraphs_three_chunks_lossless() {
        // Five 300-byte lines; cutting at window line 1 commits two
        // 600-byte chunks and finalizes the last 300 bytes.
        let mut text = String::new();
        for _ in 0..4 {
            text.push_str(&line(300));
        }
        text.push_str(&"y".repeat(300));
        assert_eq!(text.len(), 1500);

        let s = splitter(MockOracle::splitting_at(1), test_config());
        let doc = SourceDocument::new("paras.txt", &text);
        let chunks = s.split_document(&doc, &CancelFlag::new()).await.unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.len(), 600);
        assert_eq!(chunks[1].text.len(), 600);
        assert_eq!(chunks[2].text.len(), 300);
        assert_eq!(concat(&chunks), text);

        // Committed chunks carry the minimum length guarantee
        for chunk in &chunks {
            assert!(chunk.text.len() >= 64);
        }
        // Positions and byte ranges tile the document
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position, i as u32);
        }
        assert_eq!(chunks[0].metadata.byte_range, (0, 600));
        assert_eq!(chunks[1].metadata.byte_range, (600, 1200));
        assert_eq!(chunks[2].metadata.byte_range, (1200, 1500));
    }

    #[tokio::test]
    async fn test_multibyte_document_lossless() {
        // Accented text: line spans keep cuts on character boundaries and
        // the byte-range bookkeeping still tiles the document exactly.
        let mut text = String::new();
        for _ in 0..4 {
            text.push_str(&"é".repeat(150));
            text.push('\n');
        }
        text.push_str(&"ü".repeat(150));
        assert_eq!(text.len(), 1504);

        let s = splitter(MockOracle::splitting_at(1), test_config());
        let doc = SourceDocument::new("accents.txt", &text);
        let chunks = s.split_document(&doc, &CancelFlag::new()).await.unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(concat(&chunks), text);
        for chunk in &chunks {
            let (start, end) = chunk.metadata.byte_range;
            assert_eq!(&text[start..end], chunk.text);
            assert_eq!(chunk.metadata.char_count, chunk.text.chars().count());
        }
    }

    #[tokio::test]
    async fn test_carry_summary_threads_forward() {
        let mut text = String::new();
        for _ in 0..4 {
            text.push_str(&line(300));
        }
        text.push_str(&"y".repeat(300));

        let oracle = MockOracle::new(
            Box::new(|n, _| Ok(decision(1, n))),
            Box::new(|n| Ok(format!("summary {}", n))),
        );
        let s = splitter(oracle, test_config());
        let doc = SourceDocument::new("carry.txt", &text);
        let chunks = s.split_document(&doc, &CancelFlag::new()).await.unwrap();

        // Committed chunks keep the oracle's first-part summaries; the
        // final chunk gets the finalize summary.
        assert_eq!(chunks[0].summary, "first 0");
        assert_eq!(chunks[1].summary, "first 1");
        assert_eq!(chunks[2].summary, "summary 1");
    }

    #[tokio::test]
    async fn test_terminates_on_always_zero_oracle() {
        // 400 tiny lines; an oracle stuck on end-line 0 proposes a 3-byte
        // cut forever. Window growth must reach the full remainder and
        // break to a single final chunk.
        let text = line(3).repeat(400);
        let s = splitter(MockOracle::splitting_at(0), test_config());
        let doc = SourceDocument::new("tiny-lines.txt", &text);
        let chunks = s.split_document(&doc, &CancelFlag::new()).await.unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(concat(&chunks), text);
    }

    #[tokio::test]
    async fn test_transient_summarize_failures_are_retried() {
        let oracle = MockOracle::new(
            Box::new(|n, _| Ok(decision(1, n))),
            Box::new(|n| {
                if n < 2 {
                    Err(OracleError::Transient("timeout".to_string()))
                } else {
                    Ok(format!("summary {}", n))
                }
            }),
        );
        let s = splitter(oracle, test_config());

        let doc = SourceDocument::new("retry.txt", "A short document.");
        let chunks = s.split_document(&doc, &CancelFlag::new()).await.unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_resplit_retries_fail_with_context() {
        // First split succeeds; every later one times out. The failure
        // must carry the resplit phase, the reached offset, and the
        // already committed prefix.
        let mut text = String::new();
        for _ in 0..4 {
            text.push_str(&line(300));
        }
        text.push_str(&"y".repeat(300));

        let oracle = MockOracle::new(
            Box::new(|n, _| {
                if n == 0 {
                    Ok(decision(1, n))
                } else {
                    Err(OracleError::Transient("timeout".to_string()))
                }
            }),
            Box::new(|n| Ok(format!("summary {}", n))),
        );
        let s = splitter(oracle, test_config());

        let doc = SourceDocument::new("fail.txt", &text);
        let err = s
            .split_document(&doc, &CancelFlag::new())
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::Resplit);
        assert_eq!(err.offset, 600);
        assert_eq!(err.committed.len(), 1);
        assert_eq!(err.committed[0].text.len(), 600);
        assert!(matches!(
            err.cause,
            FailureCause::Oracle(OracleError::Transient(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_failure_is_not_retried_by_engine() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_seen = calls.clone();
        let oracle = MockOracle::new(
            Box::new(move |_, _| {
                calls_seen.fetch_add(1, Ordering::SeqCst);
                Err(OracleError::Parse("no fields".to_string()))
            }),
            Box::new(|n| Ok(format!("summary {}", n))),
        );
        let s = splitter(oracle, test_config());

        let text = line(300).repeat(4);
        let doc = SourceDocument::new("parse.txt", &text);
        let err = s
            .split_document(&doc, &CancelFlag::new())
            .await
            .unwrap_err();

        assert!(matches!(err.cause, FailureCause::Oracle(OracleError::Parse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_commits_nothing() {
        let cancel = CancelFlag::new();
        cancel.cancel();

        let s = splitter(MockOracle::splitting_at(1), test_config());
        let doc = SourceDocument::new("cancel.txt", "Some document text.");
        let err = s.split_document(&doc, &cancel).await.unwrap_err();

        assert_eq!(err.phase, Phase::Seed);
        assert_eq!(err.offset, 0);
        assert!(err.committed.is_empty());
        assert!(matches!(err.cause, FailureCause::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_between_iterations_keeps_committed_prefix() {
        let mut text = String::new();
        for _ in 0..4 {
            text.push_str(&line(300));
        }
        text.push_str(&"y".repeat(300));

        // The first split decision also flips the flag; the run must stop
        // at the next checkpoint without committing a partial chunk.
        let cancel = CancelFlag::new();
        let trip = cancel.clone();
        let oracle = MockOracle::new(
            Box::new(move |n, _| {
                trip.cancel();
                Ok(decision(1, n))
            }),
            Box::new(|n| Ok(format!("summary {}", n))),
        );
        let s = splitter(oracle, test_config());

        let doc = SourceDocument::new("cancel-mid.txt", &text);
        let err = s.split_document(&doc, &cancel).await.unwrap_err();

        assert_eq!(err.phase, Phase::Resplit);
        assert_eq!(err.offset, 600);
        assert_eq!(err.committed.len(), 1);
        assert!(matches!(err.cause, FailureCause::Cancelled));
    }
}
