//! Render and parse pairs for the chunking protocols.
//!
//! Rendering uses Handlebars with HTML escaping disabled (prompts are
//! plain text). Parsing is a label scan over the reply: models are asked
//! for `END LINE` / `FIRST SUMMARY` / `SECOND SUMMARY` fields, and a reply
//! missing any of them is a parse failure the caller may retry with a
//! clarifying re-prompt.

use crate::templates;
use carver_core::{CarverError, CarverResult};
use handlebars::Handlebars;
use serde_json::json;

/// Parsed reply of the resplit protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResplitReply {
    /// Inclusive end line of the first sub-chunk within the shown window
    pub end_line: usize,

    /// Summary of the first sub-chunk
    pub first_summary: String,

    /// Summary of the rest of the shown window
    pub second_summary: String,
}

/// Render the seed-phase summary prompt.
pub fn render_first_summary(source: &str, content: &str) -> CarverResult<String> {
    render(
        templates::FIRST_SUMMARY_TEMPLATE,
        &json!({ "source": source, "content": content }),
    )
}

/// Render the resplit prompt over a numbered window.
///
/// `window` is the line-numbered rendering produced by the engine;
/// `max_line` is the highest valid line index.
pub fn render_resplit(summary: &str, window: &str, max_line: usize) -> CarverResult<String> {
    render(
        templates::RESPLIT_TEMPLATE,
        &json!({ "summary": summary, "window": window, "max_line": max_line }),
    )
}

/// Render the finalize-phase summary prompt.
pub fn render_last_summary(summary: &str, content: &str) -> CarverResult<String> {
    render(
        templates::LAST_SUMMARY_TEMPLATE,
        &json!({ "summary": summary, "content": content }),
    )
}

/// Suffix appended to a resplit prompt when the previous reply failed to
/// parse.
pub fn clarify_resplit_suffix() -> &'static str {
    templates::RESPLIT_CLARIFY_SUFFIX
}

/// Render a Handlebars template with variables.
fn render(template: &str, variables: &serde_json::Value) -> CarverResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text prompts
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| CarverError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", variables)
        .map_err(|e| CarverError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

/// Parse a plain summary reply.
///
/// Accepts an optional leading `SUMMARY:` label; rejects empty replies.
pub fn parse_summary(reply: &str) -> CarverResult<String> {
    let trimmed = reply.trim();
    let trimmed = strip_label(trimmed, "summary:").unwrap_or(trimmed);
    let trimmed = trimmed.trim();

    if trimmed.is_empty() {
        return Err(CarverError::Prompt(
            "Summary reply was empty".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

/// Parse a resplit reply into its three labeled fields.
///
/// Labels are matched case-insensitively at line starts. Summary fields may
/// span multiple lines; they end at the next label or at end of input.
pub fn parse_resplit(reply: &str) -> CarverResult<ResplitReply> {
    enum Field {
        None,
        First,
        Second,
    }

    let mut end_line_text: Option<String> = None;
    let mut first_summary: Option<String> = None;
    let mut second_summary: Option<String> = None;

    // Which field the current continuation lines belong to
    let mut current = Field::None;

    for line in reply.lines() {
        let trimmed = line.trim();

        if let Some(rest) = strip_label(trimmed, "end line:") {
            end_line_text = Some(rest.trim().to_string());
            current = Field::None;
        } else if let Some(rest) = strip_label(trimmed, "first summary:") {
            first_summary = Some(rest.trim().to_string());
            current = Field::First;
        } else if let Some(rest) = strip_label(trimmed, "second summary:") {
            second_summary = Some(rest.trim().to_string());
            current = Field::Second;
        } else if !trimmed.is_empty() {
            let field = match current {
                Field::First => first_summary.as_mut(),
                Field::Second => second_summary.as_mut(),
                Field::None => None,
            };
            if let Some(field) = field {
                if !field.is_empty() {
                    field.push(' ');
                }
                field.push_str(trimmed);
            }
        }
    }

    let end_line_text = end_line_text
        .ok_or_else(|| CarverError::Prompt("Resplit reply missing END LINE field".to_string()))?;
    let first_summary = first_summary.filter(|s| !s.is_empty()).ok_or_else(|| {
        CarverError::Prompt("Resplit reply missing FIRST SUMMARY field".to_string())
    })?;
    let second_summary = second_summary.filter(|s| !s.is_empty()).ok_or_else(|| {
        CarverError::Prompt("Resplit reply missing SECOND SUMMARY field".to_string())
    })?;

    let end_line = extract_integer(&end_line_text).ok_or_else(|| {
        CarverError::Prompt(format!(
            "Resplit reply END LINE is not a number: {:?}",
            end_line_text
        ))
    })?;

    Ok(ResplitReply {
        end_line,
        first_summary,
        second_summary,
    })
}

/// Case-insensitive label strip at the start of a line.
///
/// Compares bytes, not a `str` slice: replies are arbitrary text, and
/// `label.len()` may land inside a multibyte character. Labels are pure
/// ASCII, so a byte prefix that matches one is ASCII too, which makes the
/// split offset a char boundary.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let prefix = line.as_bytes().get(..label.len())?;
    if prefix.eq_ignore_ascii_case(label.as_bytes()) {
        Some(&line[label.len()..])
    } else {
        None
    }
}

/// Extract the first unsigned integer in a string.
///
/// Models occasionally wrap the number ("line 12", "12."), so we take the
/// first digit run rather than parsing the whole field.
fn extract_integer(text: &str) -> Option<usize> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_first_summary() {
        let prompt = render_first_summary("report.txt", "Hello world.").unwrap();
        assert!(prompt.contains("report.txt"));
        assert!(prompt.contains("Hello world."));
    }

    #[test]
    fn test_render_resplit_includes_max_line() {
        let prompt = render_resplit("A summary.", "0: first\n1: second", 1).unwrap();
        assert!(prompt.contains("0: first"));
        assert!(prompt.contains("between 0 and 1"));
    }

    #[test]
    fn test_render_does_not_escape_html() {
        let prompt = render_last_summary("a < b", "x & y").unwrap();
        assert!(prompt.contains("a < b"));
        assert!(prompt.contains("x & y"));
    }

    #[test]
    fn test_parse_summary_plain() {
        assert_eq!(parse_summary("  A summary.  ").unwrap(), "A summary.");
    }

    #[test]
    fn test_parse_summary_with_label() {
        assert_eq!(parse_summary("Summary: A summary.").unwrap(), "A summary.");
    }

    #[test]
    fn test_parse_summary_empty_is_error() {
        assert!(parse_summary("   ").is_err());
    }

    #[test]
    fn test_parse_summary_multibyte_reply() {
        // Label comparison must not slice mid-character when the reply
        // opens with multibyte text
        assert_eq!(parse_summary("aééééé").unwrap(), "aééééé");
        assert_eq!(
            parse_summary("Resumé: très détaillé.").unwrap(),
            "Resumé: très détaillé."
        );
    }

    #[test]
    fn test_parse_resplit_basic() {
        let reply = "END LINE: 4\nFIRST SUMMARY: Part one.\nSECOND SUMMARY: Part two.";
        let parsed = parse_resplit(reply).unwrap();
        assert_eq!(parsed.end_line, 4);
        assert_eq!(parsed.first_summary, "Part one.");
        assert_eq!(parsed.second_summary, "Part two.");
    }

    #[test]
    fn test_parse_resplit_multiline_summaries() {
        let reply = "END LINE: 2\nFIRST SUMMARY: Covers the intro\nand the setup.\nSECOND SUMMARY: Covers\nthe conclusion.";
        let parsed = parse_resplit(reply).unwrap();
        assert_eq!(parsed.first_summary, "Covers the intro and the setup.");
        assert_eq!(parsed.second_summary, "Covers the conclusion.");
    }

    #[test]
    fn test_parse_resplit_case_insensitive_and_wrapped_number() {
        let reply = "end line: line 12.\nfirst summary: One.\nsecond summary: Two.";
        let parsed = parse_resplit(reply).unwrap();
        assert_eq!(parsed.end_line, 12);
    }

    #[test]
    fn test_parse_resplit_multibyte_lines() {
        // Continuation lines and field values in non-ASCII text must scan
        // cleanly past the label checks
        let reply =
            "éééééé\nEND LINE: 1\nFIRST SUMMARY: Début du document.\nSECOND SUMMARY: Suite\nàéîôü.";
        let parsed = parse_resplit(reply).unwrap();
        assert_eq!(parsed.end_line, 1);
        assert_eq!(parsed.first_summary, "Début du document.");
        assert_eq!(parsed.second_summary, "Suite àéîôü.");
    }

    #[test]
    fn test_parse_resplit_missing_field() {
        let reply = "END LINE: 3\nFIRST SUMMARY: Only one summary.";
        assert!(parse_resplit(reply).is_err());
    }

    #[test]
    fn test_parse_resplit_non_numeric_end_line() {
        let reply = "END LINE: somewhere\nFIRST SUMMARY: One.\nSECOND SUMMARY: Two.";
        assert!(parse_resplit(reply).is_err());
    }
}
