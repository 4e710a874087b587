//! Bounded parallel chunking across documents.
//!
//! Documents are independent, so they run concurrently up to a configured
//! limit; within one document the oracle calls stay strictly sequential
//! because each depends on the carry summary of the previous one. One
//! document failing never aborts the others; its report carries the
//! committed prefix and the failure context instead.

use crate::cancel::CancelFlag;
use crate::document::{Chunk, SourceDocument};
use crate::engine::{Phase, RecursiveSplitter};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Failure context of one document run.
#[derive(Debug, Clone, Serialize)]
pub struct FailureInfo {
    pub phase: Phase,
    pub offset: usize,
    pub message: String,
}

/// Outcome of chunking one document.
///
/// On failure, `chunks` holds the prefix committed before the failure.
#[derive(Debug, Serialize)]
pub struct DocumentReport {
    pub source_id: String,
    pub chunks: Vec<Chunk>,
    pub failure: Option<FailureInfo>,
}

impl DocumentReport {
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// Chunk a batch of documents with at most `max_parallel` running at once.
///
/// Reports come back in input order regardless of completion order.
pub async fn chunk_documents(
    splitter: Arc<RecursiveSplitter>,
    documents: Vec<SourceDocument>,
    max_parallel: usize,
    cancel: CancelFlag,
) -> Vec<DocumentReport> {
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut handles = Vec::with_capacity(documents.len());

    for doc in documents {
        let splitter = splitter.clone();
        let semaphore = semaphore.clone();
        let cancel = cancel.clone();

        handles.push((
            doc.source_id().to_string(),
            tokio::spawn(async move {
                // acquire_owned only fails if the semaphore is closed,
                // which never happens here
                let _permit = semaphore.acquire_owned().await.ok();

                match splitter.split_document(&doc, &cancel).await {
                    Ok(chunks) => DocumentReport {
                        source_id: doc.source_id().to_string(),
                        chunks,
                        failure: None,
                    },
                    Err(failed) => {
                        tracing::error!(
                            source = failed.source_id.as_str(),
                            phase = %failed.phase,
                            offset = failed.offset,
                            "Chunking failed: {}",
                            failed.cause
                        );
                        DocumentReport {
                            source_id: failed.source_id,
                            chunks: failed.committed,
                            failure: Some(FailureInfo {
                                phase: failed.phase,
                                offset: failed.offset,
                                message: failed.cause.to_string(),
                            }),
                        }
                    }
                }
            }),
        ));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for (source_id, handle) in handles {
        match handle.await {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::error!(source = source_id.as_str(), "Chunking task panicked: {}", e);
                reports.push(DocumentReport {
                    source_id,
                    chunks: Vec::new(),
                    failure: Some(FailureInfo {
                        phase: Phase::Seed,
                        offset: 0,
                        message: format!("task aborted: {}", e),
                    }),
                });
            }
        }
    }

    reports
}
