//! Input documents and output chunk records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Normalize line breaks to LF.
///
/// Line-indexed split decisions must not depend on the source encoding, so
/// CRLF and lone CR are rewritten exactly once at ingestion.
pub fn normalize_newlines(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// An immutable input document: normalized text plus a source identifier.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    source_id: String,
    text: String,
}

impl SourceDocument {
    /// Create a document, normalizing line breaks once.
    pub fn new(source_id: impl Into<String>, raw_text: &str) -> Self {
        Self {
            source_id: source_id.into(),
            text: normalize_newlines(raw_text),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// The normalized text. All chunk byte ranges refer to this string.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// An output chunk: a span of the document plus its oracle summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Source document identifier
    pub source_id: String,

    /// Chunk position in the document (0-indexed)
    pub position: u32,

    /// Chunk text content
    pub text: String,

    /// Oracle-produced summary of the content
    pub summary: String,

    /// Metadata about the chunk
    pub metadata: ChunkMetadata,
}

/// Metadata about a chunk's origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Byte range in the normalized document
    pub byte_range: (usize, usize),

    /// Character count
    pub char_count: usize,

    /// SHA-256 hash of the chunk text
    pub hash: String,

    /// Timestamp when the chunk was created
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a new chunk with generated ID and timestamp.
    pub fn new(
        source_id: impl Into<String>,
        position: u32,
        text: impl Into<String>,
        summary: impl Into<String>,
        byte_range: (usize, usize),
    ) -> Self {
        let text = text.into();
        let char_count = text.chars().count();
        let hash = calculate_hash(&text);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            position,
            text,
            summary: summary.into(),
            metadata: ChunkMetadata {
                byte_range,
                char_count,
                hash,
                created_at: Utc::now(),
            },
        }
    }
}

/// SHA-256 hash of chunk text, hex encoded.
fn calculate_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{:x}", digest)
}
