//! Text generation clients for Strata.
//!
//! Every client implements [`strata_core::TextGenerator`]. The summarizer
//! only ever sees that trait, so any chat-completions endpoint, or a chain
//! of them, can back it.

pub mod fallback;
pub mod openai_compat;

pub use fallback::FallbackGenerator;
pub use openai_compat::OpenAiCompatGenerator;
