//! The proofreading backend boundary.
//!
//! A [`Proofreader`] finds misspelled spans in a piece of text and suggests
//! replacements for single words. The engine never calls it with raw text:
//! both entry points go through [`Proofreader::normalize`] first, and results
//! are interpreted against the un-normalized text, so normalization must keep
//! the char count intact.

mod wordlist;

use async_trait::async_trait;

use crate::error::ProofreadError;

pub use wordlist::WordListProofreader;

/// One misspelled span, relative to the text passed to the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Char offset into the checked text.
    pub offset: usize,
    /// Length in chars.
    pub length: usize,
    pub word: String,
}

impl MatchResult {
    pub fn new(offset: usize, length: usize, word: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            word: word.into(),
        }
    }
}

/// A pluggable spell-check backend.
#[async_trait]
pub trait Proofreader: Send + Sync {
    /// Find misspelled spans in already normalized text.
    async fn proofread(&self, text: &str) -> Result<Vec<MatchResult>, ProofreadError>;

    /// Suggest replacements for an already normalized word.
    async fn suggestions(&self, word: &str) -> Result<Vec<String>, ProofreadError>;

    /// Language-specific folding (case, diacritics). Must map char for char.
    fn normalize(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Normalize `text` and proofread it, dropping matches that fall outside it.
pub async fn check_text(
    proofreader: &dyn Proofreader,
    text: &str,
) -> Result<Vec<MatchResult>, ProofreadError> {
    let before = text.chars().count();
    let normalized = proofreader.normalize(text);
    let after = normalized.chars().count();
    if before != after {
        return Err(ProofreadError::LengthChanged { before, after });
    }

    let matches = proofreader.proofread(&normalized).await?;
    let chars: Vec<char> = text.chars().collect();
    Ok(matches
        .into_iter()
        .filter(|m| {
            let valid = m.length > 0 && m.offset + m.length <= before;
            if !valid {
                tracing::warn!(
                    offset = m.offset,
                    length = m.length,
                    text_len = before,
                    "dropping out-of-range match for {:?}",
                    m.word
                );
            }
            valid
        })
        .map(|m| {
            // Report the word as written, not as normalized.
            let word = chars[m.offset..m.offset + m.length].iter().collect();
            MatchResult { word, ..m }
        })
        .collect())
}

/// Normalize `word` and fetch suggestions for it.
///
/// When normalization lowered a leading capital, the suggestions get it back.
pub async fn suggest(
    proofreader: &dyn Proofreader,
    word: &str,
) -> Result<Vec<String>, ProofreadError> {
    let normalized = proofreader.normalize(word);
    let suggestions = proofreader.suggestions(&normalized).await?;

    let capitalized = word.chars().next().is_some_and(char::is_uppercase)
        && !normalized.chars().next().is_some_and(char::is_uppercase);
    if !capitalized {
        return Ok(suggestions);
    }
    Ok(suggestions.into_iter().map(|s| capitalize(&s)).collect())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
