//! Chunking protocol prompts for carver.
//!
//! The chunking engine talks to its oracle through three protocols, each a
//! prompt template paired with a response parser:
//! - first-chunk summary (seed phase)
//! - chunk resplit (end-line decision plus two summaries)
//! - last-chunk summary (finalize phase)
//!
//! Templates are rendered with Handlebars; responses are plain text with
//! labeled fields so no model-side JSON mode is required.

mod protocol;
mod templates;

pub use protocol::{
    clarify_resplit_suffix, parse_resplit, parse_summary, render_first_summary, render_last_summary,
    render_resplit, ResplitReply,
};
