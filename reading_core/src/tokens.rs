//! Token counting for prompt and passage budgets.
//!
//! Uses the `cl100k_base` encoding. If the encoder cannot be built the
//! counter falls back to a four-characters-per-token estimate, which is
//! deterministic but coarser.

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

const CHARS_PER_TOKEN: usize = 4;

fn encoder() -> Option<&'static CoreBPE> {
    static ENCODER: OnceLock<Option<CoreBPE>> = OnceLock::new();
    ENCODER
        .get_or_init(|| match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(err) => {
                tracing::warn!(error = %err, "tokenizer unavailable, estimating token counts");
                None
            }
        })
        .as_ref()
}

/// Counts tokens in text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter {
    estimate_only: bool,
}

impl TokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A counter that always uses the character estimate.
    pub fn estimating() -> Self {
        Self { estimate_only: true }
    }

    /// Count tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match encoder() {
            Some(bpe) if !self.estimate_only => bpe.encode_with_special_tokens(text).len(),
            _ => estimate(text),
        }
    }
}

fn estimate(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}
