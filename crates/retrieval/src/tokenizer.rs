//! Text-to-token-set strategies.
//!
//! Keyword scoring needs two views of text: natural language, where short
//! filler words are noise, and source code, where identifiers like
//! `getUserById` have to match a query for "user by id". Each view is a
//! [`TextTokenizer`]; the [`TokenizerRegistry`] hands out one shared
//! instance per [`TokenizerStrategy`].

use std::collections::HashSet;
use std::sync::OnceLock;

use strata_core::EntityType;

// ── Token sets ──────────────────────────────────────────────────────────

/// Insertion-ordered set of lowercase tokens.
///
/// Order matters: the keyword phrase boost joins query tokens in the order
/// they first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a token; returns false if it was already present.
    pub fn insert(&mut self, token: impl Into<String>) -> bool {
        let token = token.into();
        if self.seen.contains(&token) {
            return false;
        }
        self.seen.insert(token.clone());
        self.order.push(token);
        true
    }

    pub fn contains(&self, token: &str) -> bool {
        self.seen.contains(token)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Tokens joined by single spaces, in insertion order.
    pub fn phrase(&self) -> String {
        self.order.join(" ")
    }
}

impl<S: Into<String>> FromIterator<S> for TokenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TokenSet::new();
        for token in iter {
            set.insert(token);
        }
        set
    }
}

// ── Strategies ──────────────────────────────────────────────────────────

/// Converts text into a set of lowercase tokens.
pub trait TextTokenizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn tokenize(&self, text: &str) -> TokenSet;
}

/// Which tokenizer a document gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenizerStrategy {
    Default,
    Code,
}

impl TokenizerStrategy {
    /// Code-like entities get the code-aware tokenizer; everything else,
    /// including untyped documents, gets the default one.
    pub fn for_entity(entity: Option<EntityType>) -> Self {
        match entity {
            Some(kind) if kind.is_code() => TokenizerStrategy::Code,
            _ => TokenizerStrategy::Default,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Natural-language tokenizer.
///
/// Lowercases, turns every non-word character into whitespace, and drops
/// tokens of `min_length` characters or fewer.
#[derive(Debug, Clone)]
pub struct DefaultTokenizer {
    min_length: usize,
}

impl DefaultTokenizer {
    pub const DEFAULT_MIN_LENGTH: usize = 2;

    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl Default for DefaultTokenizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_LENGTH)
    }
}

impl TextTokenizer for DefaultTokenizer {
    fn name(&self) -> &'static str {
        "default"
    }

    fn tokenize(&self, text: &str) -> TokenSet {
        text.to_lowercase()
            .split(|c: char| !is_word_char(c))
            .filter(|token| token.chars().count() > self.min_length)
            .collect()
    }
}

/// Identifier-aware tokenizer for source code and repository metadata.
///
/// Words may contain `_` and `-`. Each word contributes itself (lowercased)
/// plus every part produced by splitting on `_` runs, `-` runs, and
/// lowercase-to-uppercase boundaries.
#[derive(Debug, Clone)]
pub struct CodeTokenizer {
    min_length: usize,
}

impl CodeTokenizer {
    pub const DEFAULT_MIN_LENGTH: usize = 1;

    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    fn keep(&self, token: &str) -> bool {
        token.chars().count() > self.min_length
    }
}

impl Default for CodeTokenizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_LENGTH)
    }
}

impl TextTokenizer for CodeTokenizer {
    fn name(&self) -> &'static str {
        "code"
    }

    fn tokenize(&self, text: &str) -> TokenSet {
        let mut tokens = TokenSet::new();
        let words = text
            .split(|c: char| !(is_word_char(c) || c == '-'))
            .map(|word| word.trim_matches('-'))
            .filter(|word| !word.is_empty());

        for word in words {
            let whole = word.to_lowercase();
            if self.keep(&whole) {
                tokens.insert(whole);
            }
            for part in split_identifier(word) {
                let part = part.to_lowercase();
                if self.keep(&part) {
                    tokens.insert(part);
                }
            }
        }
        tokens
    }
}

/// Split an identifier on `_`/`-` runs and lowercase→uppercase boundaries.
fn split_identifier(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for segment in word.split(['_', '-']).filter(|s| !s.is_empty()) {
        let mut current = String::new();
        let mut prev_lower = false;
        for ch in segment.chars() {
            if ch.is_uppercase() && prev_lower && !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            prev_lower = ch.is_lowercase();
            current.push(ch);
        }
        if !current.is_empty() {
            parts.push(current);
        }
    }
    parts
}

// ── Registry ────────────────────────────────────────────────────────────

/// Lazily constructed, shared tokenizer instances, one per strategy.
///
/// Safe to share across threads; each instance is built at most once.
#[derive(Default)]
pub struct TokenizerRegistry {
    default: OnceLock<Box<dyn TextTokenizer>>,
    code: OnceLock<Box<dyn TextTokenizer>>,
}

impl TokenizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a custom tokenizer for a strategy. Only takes effect if
    /// that strategy has not been used yet.
    pub fn with_tokenizer(self, strategy: TokenizerStrategy, tokenizer: Box<dyn TextTokenizer>) -> Self {
        let slot = match strategy {
            TokenizerStrategy::Default => &self.default,
            TokenizerStrategy::Code => &self.code,
        };
        if slot.set(tokenizer).is_err() {
            tracing::warn!(?strategy, "Tokenizer already initialized, keeping existing instance");
        }
        self
    }

    pub fn get(&self, strategy: TokenizerStrategy) -> &dyn TextTokenizer {
        match strategy {
            TokenizerStrategy::Default => self
                .default
                .get_or_init(|| Box::new(DefaultTokenizer::default()))
                .as_ref(),
            TokenizerStrategy::Code => self
                .code
                .get_or_init(|| Box::new(CodeTokenizer::default()))
                .as_ref(),
        }
    }

    pub fn for_entity(&self, entity: Option<EntityType>) -> &dyn TextTokenizer {
        self.get(TokenizerStrategy::for_entity(entity))
    }
}

impl std::fmt::Debug for TokenizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenizerRegistry")
            .field("default", &self.default.get().map(|t| t.name()))
            .field("code", &self.code.get().map(|t| t.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(set: &TokenSet) -> Vec<&str> {
        set.iter().collect()
    }

    #[test]
    fn default_drops_short_words_and_punctuation() {
        let set = DefaultTokenizer::default().tokenize("How do I fix the Login-Bug, ok?");
        assert_eq!(tokens(&set), vec!["how", "fix", "the", "login", "bug"]);
    }

    #[test]
    fn default_deduplicates_in_first_seen_order() {
        let set = DefaultTokenizer::default().tokenize("Rust rust RUST async rust");
        assert_eq!(tokens(&set), vec!["rust", "async"]);
        assert_eq!(set.phrase(), "rust async");
    }

    #[test]
    fn default_keeps_underscored_words_whole() {
        let set = DefaultTokenizer::default().tokenize("call get_user_by_id now");
        assert!(set.contains("get_user_by_id"));
        assert!(!set.contains("user"));
    }

    #[test]
    fn code_splits_camel_case() {
        let set = CodeTokenizer::default().tokenize("getUserById");
        for expected in ["getuserbyid", "get", "user", "by", "id"] {
            assert!(set.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn code_splits_snake_case() {
        let set = CodeTokenizer::default().tokenize("get_user_by_id");
        for expected in ["get_user_by_id", "get", "user", "by", "id"] {
            assert!(set.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn code_splits_kebab_case() {
        let set = CodeTokenizer::default().tokenize("get-user-by-id");
        for expected in ["get-user-by-id", "get", "user", "by", "id"] {
            assert!(set.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn code_handles_separator_runs_and_punctuation() {
        let set = CodeTokenizer::default().tokenize("fn parse__Config(x) -- done");
        assert!(set.contains("parse__config"));
        assert!(set.contains("parse"));
        assert!(set.contains("config"));
        assert!(set.contains("fn"));
        assert!(set.contains("done"));
        assert!(!set.contains("x"));
        assert!(!set.contains(""));
    }

    #[test]
    fn strategy_follows_entity_type() {
        assert_eq!(
            TokenizerStrategy::for_entity(Some(EntityType::Commit)),
            TokenizerStrategy::Code
        );
        assert_eq!(
            TokenizerStrategy::for_entity(Some(EntityType::Track)),
            TokenizerStrategy::Default
        );
        assert_eq!(TokenizerStrategy::for_entity(None), TokenizerStrategy::Default);
    }

    #[test]
    fn registry_returns_shared_instances() {
        let registry = TokenizerRegistry::new();
        assert!(std::ptr::addr_eq(
            registry.get(TokenizerStrategy::Code),
            registry.get(TokenizerStrategy::Code)
        ));
        assert_eq!(registry.get(TokenizerStrategy::Default).name(), "default");
    }

    #[test]
    fn registry_accepts_custom_tokenizer() {
        let registry = TokenizerRegistry::new()
            .with_tokenizer(TokenizerStrategy::Default, Box::new(DefaultTokenizer::new(0)));
        let set = registry.get(TokenizerStrategy::Default).tokenize("a bc");
        assert_eq!(set.len(), 2);
    }
}
