//! Token counting and token-bounded text chunking.
//!
//! Summarization budgets are measured in model tokens, not characters, so the
//! chunker counts with the same BPE the generation models meter against.

use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use tiktoken_rs::CoreBPE;

/// Counts and slices text by the cl100k_base token metric.
///
/// Deterministic for a given text; construction loads the embedded encoding
/// once and the counter is reused across the whole run.
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    pub fn new() -> Result<Self, Error> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| Error {
            source: Some(e.into()),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to load cl100k_base encoding".to_string(),
            )),
        })?;
        Ok(Self { bpe })
    }

    /// Returns the token count of `text`.
    pub fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_ordinary(text).len()
    }

    /// Splits `text` into chunks of at most `max_tokens` tokens, respecting
    /// line boundaries.
    ///
    /// Lines accumulate into the current chunk while the running token count
    /// stays within the limit; a line that would overflow closes the chunk
    /// and starts the next one. A single line that alone exceeds `max_tokens`
    /// still forms its own oversized chunk - it is never dropped. Empty input
    /// yields zero chunks.
    pub fn chunk_by_tokens(&self, text: &str, max_tokens: usize) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut current_lines: Vec<&str> = Vec::new();
        let mut current_tokens = 0usize;

        for line in text.split('\n') {
            let line_tokens = self.count_tokens(line);

            if current_tokens + line_tokens > max_tokens {
                if !current_lines.is_empty() {
                    chunks.push(current_lines.join("\n"));
                }
                current_lines = vec![line];
                current_tokens = line_tokens;
            } else {
                current_lines.push(line);
                current_tokens += line_tokens;
            }
        }

        if !current_lines.is_empty() {
            chunks.push(current_lines.join("\n"));
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> TokenCounter {
        TokenCounter::new().unwrap()
    }

    #[test]
    fn test_count_tokens_empty_is_zero() {
        assert_eq!(counter().count_tokens(""), 0);
    }

    #[test]
    fn test_count_tokens_is_deterministic() {
        let counter = counter();
        let text = "Alice: let's review the quarterly numbers";
        assert_eq!(counter.count_tokens(text), counter.count_tokens(text));
        assert!(counter.count_tokens(text) > 0);
    }

    #[test]
    fn test_chunk_empty_input_yields_zero_chunks() {
        assert!(counter().chunk_by_tokens("", 100).is_empty());
    }

    #[test]
    fn test_chunk_under_budget_returns_single_chunk_equal_to_input() {
        let counter = counter();
        let text = "Alice: hi\nBob: hey there\nAlice: bye";
        let chunks = counter.chunk_by_tokens(text, 1000);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn test_chunks_never_exceed_budget_except_oversized_lines() {
        let counter = counter();
        let lines: Vec<String> = (0..40)
            .map(|i| format!("Speaker {}: this is discussion line number {}", i % 3, i))
            .collect();
        let text = lines.join("\n");
        let max_tokens = 50;

        let chunks = counter.chunk_by_tokens(&text, max_tokens);
        assert!(chunks.len() > 1);

        for chunk in &chunks {
            // Each chunk is a run of whole lines whose accumulated count
            // stays within the budget
            let accumulated: usize = chunk.split('\n').map(|l| counter.count_tokens(l)).sum();
            assert!(accumulated <= max_tokens);
        }

        // Content is preserved exactly
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_oversized_single_line_forms_its_own_chunk() {
        let counter = counter();
        let huge_line = "word ".repeat(300);
        let text = format!("short line\n{}\nanother short line", huge_line.trim_end());

        let chunks = counter.chunk_by_tokens(&text, 20);
        // The oversized line is kept intact in a chunk of its own
        let oversized: Vec<&String> = chunks
            .iter()
            .filter(|c| counter.count_tokens(c) > 20)
            .collect();
        assert_eq!(oversized.len(), 1);
        assert!(oversized[0].contains("word word"));
        assert_eq!(chunks.join("\n"), text);
    }
}
