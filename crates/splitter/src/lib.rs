//! Recursive, LLM-guided document chunking engine.
//!
//! This crate turns a long document into an ordered sequence of chunks,
//! each carrying an oracle-produced summary. Split points are chosen
//! adaptively: a deterministic baseline pre-splitter sizes a line-indexed
//! window, and the oracle picks the end line of the next chunk inside it.
//!
//! Guarantees:
//! - Lossless: concatenating chunk texts in position order reproduces the
//!   normalized document exactly.
//! - No degenerate chunks: every committed chunk is at least
//!   `min_chunk_len` long, except when the whole document is shorter.
//! - Termination: every committed cut makes strictly positive progress,
//!   and degenerate oracle decisions grow the window until it covers the
//!   remainder, which ends the loop.

pub mod baseline;
pub mod cancel;
pub mod document;
pub mod engine;
pub mod oracle;
pub mod runner;
pub mod window;

pub use baseline::BaselinePresplitter;
pub use cancel::CancelFlag;
pub use document::{normalize_newlines, Chunk, ChunkMetadata, SourceDocument};
pub use engine::{ChunkingFailed, FailureCause, Phase, RecursiveSplitter};
pub use oracle::{LlmSplitOracle, OracleError, SplitDecision, SplitOracle};
pub use runner::{chunk_documents, DocumentReport, FailureInfo};
pub use window::{LineSpan, LineWindow};
