//! Line-indexed windows over unprocessed text.
//!
//! The oracle expresses its split decision as a line index, not a character
//! offset, so it never has to count characters. A `LineWindow` is a bounded
//! prefix of the remaining text, decomposed into line spans with explicit
//! byte ranges; the inclusive end-line decision translates unambiguously to
//! a cut offset. Line spans include their trailing newline, so cutting at a
//! line end loses no characters.

use std::fmt::Write as _;

/// One line of a window, with its byte range in the remaining text.
///
/// `end` is exclusive and includes the trailing `\n` when the line has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

/// A bounded, line-indexed prefix of the remaining text.
#[derive(Debug)]
pub struct LineWindow<'a> {
    text: &'a str,
    spans: Vec<LineSpan>,
}

impl<'a> LineWindow<'a> {
    /// Build a window over the prefix of `text`, bounded by `budget` bytes.
    ///
    /// Whole lines only: a line is included when it ends at or before the
    /// budget. The first line is always included even if it alone exceeds
    /// the budget, so a window is never empty for non-empty text.
    pub fn over(text: &'a str, budget: usize) -> Self {
        let limit = budget.min(text.len());
        let mut spans = Vec::new();
        let mut start = 0;

        while start < text.len() {
            let end = text[start..]
                .find('\n')
                .map(|i| start + i + 1)
                .unwrap_or(text.len());

            if !spans.is_empty() && end > limit {
                break;
            }

            spans.push(LineSpan {
                index: spans.len(),
                start,
                end,
            });
            start = end;
        }

        Self { text, spans }
    }

    /// Number of lines in the window.
    pub fn line_count(&self) -> usize {
        self.spans.len()
    }

    /// Highest valid line index.
    pub fn max_line(&self) -> usize {
        self.spans.len().saturating_sub(1)
    }

    /// Byte offset one past the end of the window.
    pub fn end(&self) -> usize {
        self.spans.last().map(|s| s.end).unwrap_or(0)
    }

    /// Whether the window reaches the end of the remaining text.
    pub fn covers_all(&self) -> bool {
        self.end() == self.text.len()
    }

    /// Translate an inclusive end-line decision into a cut offset.
    ///
    /// Out-of-range indices clamp to the last line; the cut includes the
    /// chosen line's trailing newline.
    pub fn cut_offset(&self, end_line: usize) -> usize {
        match self.spans.get(end_line.min(self.max_line())) {
            Some(span) => span.end,
            None => 0,
        }
    }

    /// The line spans of the window.
    pub fn spans(&self) -> &[LineSpan] {
        &self.spans
    }

    /// Render the window with one numbered line per row for the oracle.
    pub fn numbered(&self) -> String {
        let mut out = String::with_capacity(self.end() + self.spans.len() * 4);
        for span in &self.spans {
            let content = self.text[span.start..span.end].trim_end_matches('\n');
            let _ = writeln!(out, "{}: {}", span.index, content);
        }
        // Drop the final newline added by writeln
        out.pop();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_all_lines() {
        let w = LineWindow::over("aa\nbb\ncc", 100);
        assert_eq!(w.line_count(), 3);
        assert_eq!(w.max_line(), 2);
        assert!(w.covers_all());
        assert_eq!(w.end(), 8);
    }

    #[test]
    fn test_window_budget_cuts_at_line_boundary() {
        // Lines end at offsets 3, 6, 8; budget 7 keeps the first two
        let w = LineWindow::over("aa\nbb\ncc", 7);
        assert_eq!(w.line_count(), 2);
        assert!(!w.covers_all());
        assert_eq!(w.end(), 6);
    }

    #[test]
    fn test_first_line_always_included() {
        let w = LineWindow::over("a long first line\nshort", 4);
        assert_eq!(w.line_count(), 1);
        assert_eq!(w.end(), 18);
    }

    #[test]
    fn test_cut_offset_includes_newline() {
        let w = LineWindow::over("aa\nbb\ncc", 100);
        assert_eq!(w.cut_offset(0), 3);
        assert_eq!(w.cut_offset(1), 6);
        assert_eq!(w.cut_offset(2), 8);
    }

    #[test]
    fn test_cut_offset_clamps_out_of_range() {
        let w = LineWindow::over("aa\nbb", 100);
        assert_eq!(w.cut_offset(99), 5);
    }

    #[test]
    fn test_numbered_rendering() {
        let w = LineWindow::over("first\nsecond\n", 100);
        assert_eq!(w.numbered(), "0: first\n1: second");
    }

    #[test]
    fn test_no_trailing_newline_last_line() {
        let w = LineWindow::over("aa\nbb", 100);
        assert_eq!(w.cut_offset(1), 5);
        assert!(w.covers_all());
    }
}
