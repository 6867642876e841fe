//! A proofreader backed by a plain word list.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use regex::Regex;

use crate::error::{DictionaryError, ProofreadError};

use super::{MatchResult, Proofreader};

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Flags every word that is not in its list.
///
/// Lookups ignore case unless turned off with [`ignore_case`](Self::ignore_case).
/// Suggestions are the listed words one edit away: a substituted, inserted
/// or deleted letter.
#[derive(Debug, Clone)]
pub struct WordListProofreader {
    words: HashSet<String>,
    folded: HashSet<String>,
    ignore_case: bool,
    word_pattern: Regex,
}

impl WordListProofreader {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: HashSet<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        let folded = words.iter().map(|w| w.to_lowercase()).collect();
        Self {
            words,
            folded,
            ignore_case: true,
            word_pattern: Regex::new(r"\p{L}+(?:'\p{L}+)*").expect("word pattern is valid"),
        }
    }

    /// Load a newline separated word list. Lines starting with `#` are skipped.
    pub fn from_file(path: &Path) -> Result<Self, DictionaryError> {
        let content = std::fs::read_to_string(path).map_err(|source| DictionaryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let words = content.lines().filter(|line| !line.starts_with('#'));
        Ok(Self::new(words))
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        if self.ignore_case {
            self.folded.contains(&word.to_lowercase())
        } else {
            self.words.contains(word)
        }
    }
}

#[async_trait]
impl Proofreader for WordListProofreader {
    async fn proofread(&self, text: &str) -> Result<Vec<MatchResult>, ProofreadError> {
        let mut matches = Vec::new();
        let mut byte_pos = 0;
        let mut char_pos = 0;

        for found in self.word_pattern.find_iter(text) {
            char_pos += text[byte_pos..found.start()].chars().count();
            byte_pos = found.start();

            let word = found.as_str();
            let length = word.chars().count();
            if !self.contains(word) {
                matches.push(MatchResult::new(char_pos, length, word));
            }
        }

        Ok(matches)
    }

    async fn suggestions(&self, word: &str) -> Result<Vec<String>, ProofreadError> {
        let chars: Vec<char> = word.chars().collect();
        let mut candidates = Vec::new();

        for i in 0..chars.len() {
            for replacement in ALPHABET.chars().filter(|&c| c != chars[i]) {
                let mut candidate = chars.clone();
                candidate[i] = replacement;
                candidates.push(candidate);
            }
        }
        for i in 0..=chars.len() {
            for inserted in ALPHABET.chars() {
                let mut candidate = chars.clone();
                candidate.insert(i, inserted);
                candidates.push(candidate);
            }
        }
        if chars.len() > 1 {
            for i in 0..chars.len() {
                let mut candidate = chars.clone();
                candidate.remove(i);
                candidates.push(candidate);
            }
        }

        let mut seen = HashSet::new();
        Ok(candidates
            .into_iter()
            .map(|candidate| candidate.into_iter().collect::<String>())
            .filter(|candidate| self.contains(candidate) && seen.insert(candidate.clone()))
            .collect())
    }

    fn normalize(&self, text: &str) -> String {
        if !self.ignore_case {
            return text.to_string();
        }
        text.chars()
            .map(|c| {
                let mut lower = c.to_lowercase();
                match (lower.next(), lower.next()) {
                    (Some(l), None) => l,
                    _ => c,
                }
            })
            .collect()
    }
}
