//! Chunk command handler.
//!
//! Reads input documents, runs the LLM-guided recursive splitter over them
//! with bounded parallelism, and writes one JSONL chunk file per document.
//! A document that fails mid-run still gets its committed prefix written,
//! plus a failure marker recording the phase and offset for resuming.

use carver_core::{config::AppConfig, config::ProviderSettings, CarverError, CarverResult};
use carver_llm::{create_client, ModelResidency};
use carver_splitter::{
    chunk_documents, CancelFlag, DocumentReport, LlmSplitOracle, RecursiveSplitter, SourceDocument,
};
use clap::Args;
use std::collections::HashSet;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

/// Chunk documents with the LLM-guided recursive splitter
#[derive(Args, Debug)]
pub struct ChunkCommand {
    /// Files or directories to chunk
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory (default: <workspace>/.carver/chunks)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// File extensions included when walking directories
    #[arg(long, default_value = "txt,md")]
    pub extensions: String,

    /// Maximum documents chunked concurrently (overrides config)
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Output summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChunkCommand {
    pub async fn execute(&self, config: &AppConfig) -> CarverResult<()> {
        config.validate()?;

        let files = collect_input_files(&self.inputs, &self.extensions)?;
        if files.is_empty() {
            return Err(CarverError::Config(
                "No input files matched the given paths and extensions".to_string(),
            ));
        }
        tracing::info!("Chunking {} documents", files.len());

        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            let contents = std::fs::read_to_string(path)?;
            documents.push(SourceDocument::new(source_id_for(path, config), &contents));
        }

        let splitter = self.build_splitter(config)?;

        // Ctrl-C requests cooperative cancellation; in-flight oracle calls
        // finish or time out, and nothing partial is committed after that.
        let cancel = CancelFlag::new();
        let cancel_on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling");
                cancel_on_signal.cancel();
            }
        });

        let max_parallel = self
            .parallel
            .unwrap_or(config.chunking.max_parallel_documents);
        let reports = chunk_documents(splitter, documents, max_parallel, cancel).await;

        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| config.carver_dir().join("chunks"));
        std::fs::create_dir_all(&output_dir)?;
        let written = write_reports(&reports, &output_dir)?;

        self.print_summary(&reports, &written);

        let failed = reports.iter().filter(|r| !r.is_ok()).count();
        if failed > 0 {
            return Err(CarverError::Split(format!(
                "{} of {} documents failed",
                failed,
                reports.len()
            )));
        }
        Ok(())
    }

    fn build_splitter(&self, config: &AppConfig) -> CarverResult<Arc<RecursiveSplitter>> {
        let mut endpoint = None;
        let mut residency = ModelResidency::default();
        let mut timeout_secs = config.chunking.oracle_timeout_secs;

        if let Some(ProviderSettings::Ollama {
            endpoint: ep,
            residency: res,
            timeout,
            ..
        }) = config.get_provider_settings(&config.provider)
        {
            endpoint = Some(ep);
            if let Some(res) = res {
                match ModelResidency::parse(&res) {
                    Some(parsed) => residency = parsed,
                    None => tracing::warn!("Unknown residency mode '{}', using default", res),
                }
            }
            if let Some(timeout) = timeout {
                timeout_secs = timeout;
            }
        }

        let api_key = config.resolve_api_key(&config.provider);
        let client = create_client(
            &config.provider,
            endpoint.as_deref(),
            api_key.as_deref(),
            residency,
            Duration::from_secs(timeout_secs),
        )
        .map_err(CarverError::Llm)?;

        let oracle = Arc::new(LlmSplitOracle::new(client, config.model.clone()));
        Ok(Arc::new(RecursiveSplitter::new(
            oracle,
            config.chunking.clone(),
        )))
    }

    fn print_summary(&self, reports: &[DocumentReport], written: &[PathBuf]) {
        let total_chunks: usize = reports.iter().map(|r| r.chunks.len()).sum();
        let failed: Vec<_> = reports.iter().filter(|r| !r.is_ok()).collect();

        if self.json {
            let output = serde_json::json!({
                "documents": reports.len(),
                "succeeded": reports.len() - failed.len(),
                "failed": failed.len(),
                "chunks": total_chunks,
                "files": written,
                "failures": failed.iter().map(|r| {
                    let info = r.failure.as_ref().unwrap();
                    serde_json::json!({
                        "sourceId": r.source_id,
                        "phase": info.phase,
                        "offset": info.offset,
                        "message": info.message,
                        "committedChunks": r.chunks.len(),
                    })
                }).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        } else {
            for report in reports {
                match &report.failure {
                    None => println!("  {} -> {} chunks", report.source_id, report.chunks.len()),
                    Some(info) => println!(
                        "  {} FAILED in {} at offset {} ({} chunks committed): {}",
                        report.source_id,
                        info.phase,
                        info.offset,
                        report.chunks.len(),
                        info.message
                    ),
                }
            }
            println!(
                "Chunked {} of {} documents ({} chunks)",
                reports.len() - failed.len(),
                reports.len(),
                total_chunks
            );
        }
    }
}

/// Expand files and directories into a flat, sorted list of input files.
fn collect_input_files(inputs: &[PathBuf], extensions: &str) -> CarverResult<Vec<PathBuf>> {
    let allowed: Vec<&str> = extensions
        .split(',')
        .map(|e| e.trim().trim_start_matches('.'))
        .filter(|e| !e.is_empty())
        .collect();

    let mut files = Vec::new();
    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let matches = entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| allowed.contains(&e))
                    .unwrap_or(false);
                if matches {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            return Err(CarverError::Config(format!(
                "Input path does not exist: {:?}",
                input
            )));
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Source identifier for a document: workspace-relative where possible.
fn source_id_for(path: &Path, config: &AppConfig) -> String {
    path.strip_prefix(&config.workspace)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

/// Write one `.chunks.jsonl` per report, plus a `.failure.json` marker for
/// failed documents. Returns the chunk files written.
fn write_reports(reports: &[DocumentReport], output_dir: &Path) -> CarverResult<Vec<PathBuf>> {
    let mut used_stems = HashSet::new();
    let mut written = Vec::with_capacity(reports.len());

    for report in reports {
        let stem = unique_stem(&report.source_id, &mut used_stems);

        let chunk_path = output_dir.join(format!("{}.chunks.jsonl", stem));
        let mut file = std::fs::File::create(&chunk_path)?;
        for chunk in &report.chunks {
            let line = serde_json::to_string(chunk)?;
            writeln!(file, "{}", line)?;
        }
        written.push(chunk_path);

        if let Some(info) = &report.failure {
            let marker = serde_json::json!({
                "sourceId": report.source_id,
                "phase": info.phase,
                "offset": info.offset,
                "message": info.message,
                "committedChunks": report.chunks.len(),
            });
            let marker_path = output_dir.join(format!("{}.failure.json", stem));
            std::fs::write(&marker_path, serde_json::to_string_pretty(&marker)?)?;
        }
    }

    Ok(written)
}

/// File stem for a source id, suffixed on collision.
fn unique_stem(source_id: &str, used: &mut HashSet<String>) -> String {
    let base = Path::new(source_id)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string();

    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}-{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
