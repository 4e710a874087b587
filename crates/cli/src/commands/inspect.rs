//! Inspect command handler.
//!
//! Reads a `.chunks.jsonl` file back and reports length statistics plus a
//! tiling check over the byte ranges, which is the quickest way to spot a
//! lossy or degenerate chunking run after the fact.

use carver_core::{CarverError, CarverResult};
use carver_splitter::Chunk;
use clap::Args;
use std::path::{Path, PathBuf};

/// Inspect a chunk file produced by `chunk`
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Chunk file (.chunks.jsonl) to inspect
    pub file: PathBuf,

    /// Print each chunk's summary
    #[arg(long)]
    pub summaries: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Aggregate statistics over one chunk file.
#[derive(Debug)]
struct ChunkStats {
    count: usize,
    total_bytes: usize,
    min_bytes: usize,
    max_bytes: usize,
    contiguous: bool,
}

impl InspectCommand {
    pub fn execute(&self) -> CarverResult<()> {
        let chunks = load_chunks(&self.file)?;
        if chunks.is_empty() {
            println!("{}: no chunks", self.file.display());
            return Ok(());
        }

        let stats = compute_stats(&chunks);

        if self.json {
            let output = serde_json::json!({
                "file": self.file,
                "sourceId": chunks[0].source_id,
                "count": stats.count,
                "totalBytes": stats.total_bytes,
                "minBytes": stats.min_bytes,
                "maxBytes": stats.max_bytes,
                "avgBytes": stats.total_bytes / stats.count,
                "contiguous": stats.contiguous,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        } else {
            println!("File: {}", self.file.display());
            println!("Source: {}", chunks[0].source_id);
            println!("Chunks: {}", stats.count);
            println!(
                "Sizes: min {} / avg {} / max {} bytes ({} total)",
                stats.min_bytes,
                stats.total_bytes / stats.count,
                stats.max_bytes,
                stats.total_bytes
            );
            println!(
                "Byte ranges: {}",
                if stats.contiguous {
                    "contiguous"
                } else {
                    "NOT contiguous (gaps or overlaps)"
                }
            );

            if self.summaries {
                println!();
                for chunk in &chunks {
                    println!(
                        "[{}] {}..{} ({} bytes)",
                        chunk.position,
                        chunk.metadata.byte_range.0,
                        chunk.metadata.byte_range.1,
                        chunk.text.len()
                    );
                    println!("  {}", chunk.summary);
                }
            }
        }

        Ok(())
    }
}

/// Parse a JSONL chunk file, skipping blank lines.
fn load_chunks(path: &Path) -> CarverResult<Vec<Chunk>> {
    let contents = std::fs::read_to_string(path)?;

    let mut chunks = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let chunk: Chunk = serde_json::from_str(line).map_err(|e| {
            CarverError::Serialization(format!("{}:{}: {}", path.display(), i + 1, e))
        })?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

fn compute_stats(chunks: &[Chunk]) -> ChunkStats {
    let sizes: Vec<usize> = chunks.iter().map(|c| c.text.len()).collect();

    let contiguous = chunks
        .windows(2)
        .all(|pair| pair[0].metadata.byte_range.1 == pair[1].metadata.byte_range.0);

    ChunkStats {
        count: chunks.len(),
        total_bytes: sizes.iter().sum(),
        min_bytes: sizes.iter().copied().min().unwrap_or(0),
        max_bytes: sizes.iter().copied().max().unwrap_or(0),
        contiguous,
    }
}
