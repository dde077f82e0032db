//! Text normalization and tokenization
//!
//! This module provides tools for:
//! - Text cleaning (lowercasing, digit/URL/punctuation removal)
//! - Tokenization (splitting text into words)
//! - Stop word removal
//! - Lemmatization of the remaining tokens

use super::lemmatizer::Lemmatizer;
use super::vectorizer::english_stop_words;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

static DIGIT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[a-z][a-z0-9+.\-]*://|www\.)\S+|\S+@\S+\.\S+").unwrap());
static PUNCTUATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{Alphabetic}\s]+").unwrap());

/// Deterministic document normalizer
///
/// Given a raw document, produces whitespace-joined base-form tokens.
/// The transform never fails and is idempotent on its own output.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    /// Stop words to filter out
    stop_words: HashSet<String>,
    /// Minimum token length (in characters)
    min_length: usize,
    /// Lemmatizer applied to surviving tokens
    lemmatizer: Lemmatizer,
}

impl Tokenizer {
    /// Create a tokenizer with the default English stop words and a minimum length of 3
    pub fn new() -> Self {
        Self {
            stop_words: default_stop_words(),
            min_length: 3,
            lemmatizer: Lemmatizer::new(),
        }
    }

    /// Add custom stop words
    pub fn add_stop_words(&mut self, words: &[&str]) {
        for word in words {
            self.stop_words.insert(word.to_lowercase());
        }
    }

    /// Set minimum token length
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    /// Lowercase and strip digits, URLs and punctuation
    ///
    /// Punctuation is deleted rather than replaced, so "don't" becomes "dont".
    pub fn clean(&self, text: &str) -> String {
        let cleaned = text.to_lowercase();
        let cleaned = DIGIT_REGEX.replace_all(&cleaned, "");
        let cleaned = URL_REGEX.replace_all(&cleaned, " ");
        let cleaned = PUNCTUATION_REGEX.replace_all(&cleaned, "");
        cleaned.into_owned()
    }

    /// Tokenize text into lemmatized, filtered words
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned = self.clean(text);

        cleaned
            .unicode_words()
            .filter(|word| self.keep(word))
            .map(|word| self.lemmatizer.lemmatize(word))
            // a lemma may shrink or coincide with a stop word
            .filter(|lemma| self.keep(lemma))
            .collect()
    }

    /// Normalize a document into a single space-joined token string
    pub fn normalize(&self, text: &str) -> String {
        self.tokenize(text).join(" ")
    }

    /// Normalize multiple documents, preserving order
    pub fn normalize_all<S: AsRef<str>>(&self, documents: &[S]) -> Vec<String> {
        documents
            .iter()
            .map(|doc| self.normalize(doc.as_ref()))
            .collect()
    }

    fn keep(&self, word: &str) -> bool {
        word.chars().count() >= self.min_length && !self.stop_words.contains(word)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Same list the vectorizers re-apply
fn default_stop_words() -> HashSet<String> {
    english_stop_words().into_iter().map(str::to_string).collect()
}
