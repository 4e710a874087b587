//! Deterministic baseline pre-splitter.
//!
//! The baseline proposes naive candidate boundaries at natural text breaks
//! (via the text-splitter crate). It never decides final chunk boundaries:
//! the engine only uses the candidates to size the seed window and the
//! line-indexed resplit windows shown to the oracle. Pure function of the
//! text; never fails.

use text_splitter::TextSplitter;

pub struct BaselinePresplitter {
    target: usize,
}

impl BaselinePresplitter {
    pub fn new(target: usize) -> Self {
        Self { target }
    }

    /// Byte offsets in `text` where the first two naive chunks end.
    ///
    /// Returns up to two strictly increasing offsets, always on char
    /// boundaries. Short texts yield a single candidate at `text.len()`.
    pub fn candidates(&self, text: &str) -> Vec<usize> {
        let splitter = TextSplitter::new(self.target);

        let mut offsets = Vec::with_capacity(2);
        let mut pos = 0;
        for chunk in splitter.chunks(text).take(2) {
            // text-splitter may trim separators between chunks; locate the
            // chunk to keep offsets anchored to the original text
            if let Some(found) = text[pos..].find(chunk) {
                let end = pos + found + chunk.len();
                offsets.push(end);
                pos = end;
            } else {
                break;
            }
        }

        if offsets.is_empty() && !text.is_empty() {
            offsets.push(text.len());
        }

        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_candidate() {
        let baseline = BaselinePresplitter::new(100);
        let cands = baseline.candidates("A short paragraph.");
        assert_eq!(cands, vec![18]);
    }

    #[test]
    fn test_long_text_two_candidates() {
        let baseline = BaselinePresplitter::new(50);
        let text = "First sentence here. ".repeat(10);
        let cands = baseline.candidates(&text);
        assert_eq!(cands.len(), 2);
        assert!(cands[0] < cands[1]);
        assert!(cands[1] <= text.len());
    }

    #[test]
    fn test_candidates_on_char_boundaries() {
        let baseline = BaselinePresplitter::new(20);
        let text = "Acentuação e emoção são comuns. ".repeat(5);
        for end in baseline.candidates(&text) {
            assert!(text.is_char_boundary(end));
        }
    }

    #[test]
    fn test_deterministic() {
        let baseline = BaselinePresplitter::new(50);
        let text = "Some repeated sentence. ".repeat(8);
        assert_eq!(baseline.candidates(&text), baseline.candidates(&text));
    }

    #[test]
    fn test_empty_text() {
        let baseline = BaselinePresplitter::new(50);
        assert!(baseline.candidates("").is_empty());
    }
}
