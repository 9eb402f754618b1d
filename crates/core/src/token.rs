//! Token counting.
//!
//! Budgets are enforced against whatever [`TokenCounter`] the caller
//! injects. The default is a character heuristic: ~4 bytes per token,
//! rounded up, which tracks BPE tokenizers closely enough on English text.

/// Counts tokens in a piece of text. Must be pure and deterministic.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Estimate the token count for a string. 1 token ≈ 4 bytes, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// [`TokenCounter`] backed by [`estimate_tokens`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count_tokens(&self, text: &str) -> usize {
        self(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn closures_count_tokens() {
        let by_char = |text: &str| text.chars().count();
        assert_eq!(by_char.count_tokens("abcdef"), 6);
        assert_eq!(HeuristicTokenCounter.count_tokens(&"a".repeat(100)), 25);
    }
}
