//! Text vectorization
//!
//! Provides TF-IDF and count vectorization for converting normalized
//! documents into sparse document-term matrices.

use hashbrown::HashMap;
use sprs::{CsMat, TriMat};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during vectorization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorizerError {
    #[error("Vectorizer must be fitted before transform")]
    NotFitted,

    #[error("max_df ratio must be in (0, 1], got {0}")]
    InvalidMaxDf(f64),
}

/// Frozen, alphabetically ordered set of selected terms
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
    document_frequencies: Vec<usize>,
}

impl Vocabulary {
    /// Select terms from whitespace-tokenized documents
    ///
    /// A term qualifies when `min_df <= df <= max_df_ratio * n_docs` and it is
    /// not a stop word. Of the qualifying terms the `max_features` with the
    /// highest total count are kept, ties broken alphabetically.
    fn build<S: AsRef<str>>(
        documents: &[S],
        min_df: usize,
        max_df_ratio: f64,
        max_features: Option<usize>,
        stop_words: &HashSet<&'static str>,
    ) -> Self {
        let n_docs = documents.len();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let mut total_freq: HashMap<&str, usize> = HashMap::new();

        for doc in documents {
            let mut seen: HashSet<&str> = HashSet::new();
            for term in doc.as_ref().split_whitespace() {
                if stop_words.contains(term) {
                    continue;
                }
                *total_freq.entry(term).or_insert(0) += 1;
                if seen.insert(term) {
                    *doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        let max_df = max_df_ratio * n_docs as f64;
        let mut selected: Vec<(&str, usize, usize)> = doc_freq
            .into_iter()
            .filter(|&(_, df)| df >= min_df && df as f64 <= max_df)
            .map(|(term, df)| (term, df, total_freq.get(term).copied().unwrap_or(0)))
            .collect();

        selected.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));
        if let Some(max) = max_features {
            selected.truncate(max);
        }
        selected.sort_by(|a, b| a.0.cmp(b.0));

        let mut vocabulary = Self::default();
        for (idx, (term, df, _)) in selected.into_iter().enumerate() {
            vocabulary.index.insert(term.to_string(), idx);
            vocabulary.terms.push(term.to_string());
            vocabulary.document_frequencies.push(df);
        }
        vocabulary
    }

    /// Terms in column order
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Column index of a term
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Term to column lookup table
    pub fn term_index(&self) -> &HashMap<String, usize> {
        &self.index
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Per-term document counts observed while fitting
    pub fn document_frequencies(&self) -> &[usize] {
        &self.document_frequencies
    }

    /// Count in-vocabulary terms of one document, sorted by column
    fn count(&self, document: &str) -> Vec<(usize, f64)> {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in document.split_whitespace() {
            if let Some(idx) = self.index_of(term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        let mut counts: Vec<(usize, f64)> = counts.into_iter().collect();
        counts.sort_by_key(|&(idx, _)| idx);
        counts
    }
}

fn check_max_df(ratio: f64) -> Result<(), VectorizerError> {
    if ratio > 0.0 && ratio <= 1.0 {
        Ok(())
    } else {
        Err(VectorizerError::InvalidMaxDf(ratio))
    }
}

/// TF-IDF Vectorizer
///
/// Raw term frequency times smooth idf `ln((1 + n) / (1 + df)) + 1`,
/// each row scaled to unit L2 norm.
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    vocabulary: Option<Vocabulary>,
    idf_values: Vec<f64>,
    min_df: usize,
    max_df_ratio: f64,
    max_features: Option<usize>,
    stop_words: HashSet<&'static str>,
}

impl TfIdfVectorizer {
    /// Create a vectorizer with `min_df = 2`, `max_df = 0.95` and 1000 features
    pub fn new() -> Self {
        Self {
            vocabulary: None,
            idf_values: Vec::new(),
            min_df: 2,
            max_df_ratio: 0.95,
            max_features: Some(1000),
            stop_words: english_stop_words(),
        }
    }

    /// Set minimum document frequency
    pub fn min_df(mut self, min_df: usize) -> Self {
        self.min_df = min_df;
        self
    }

    /// Set maximum document frequency ratio
    pub fn max_df_ratio(mut self, ratio: f64) -> Self {
        self.max_df_ratio = ratio;
        self
    }

    /// Set maximum vocabulary size
    pub fn max_features(mut self, max: usize) -> Self {
        self.max_features = Some(max);
        self
    }

    /// Fit the vocabulary and idf weights on normalized documents
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<(), VectorizerError> {
        check_max_df(self.max_df_ratio)?;

        let vocabulary = Vocabulary::build(
            documents,
            self.min_df,
            self.max_df_ratio,
            self.max_features,
            &self.stop_words,
        );

        let n = documents.len() as f64;
        self.idf_values = vocabulary
            .document_frequencies()
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        log::debug!(
            "TF-IDF vocabulary: {} terms from {} documents",
            vocabulary.len(),
            documents.len()
        );
        self.vocabulary = Some(vocabulary);
        Ok(())
    }

    /// Transform documents into a `(n_documents, n_terms)` CSR matrix
    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<CsMat<f64>, VectorizerError> {
        let vocabulary = self.vocabulary.as_ref().ok_or(VectorizerError::NotFitted)?;
        let mut tri = TriMat::new((documents.len(), vocabulary.len()));

        for (doc_idx, doc) in documents.iter().enumerate() {
            let weights: Vec<(usize, f64)> = vocabulary
                .count(doc.as_ref())
                .into_iter()
                .map(|(idx, tf)| (idx, tf * self.idf_values[idx]))
                .collect();

            let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm == 0.0 {
                continue;
            }
            for (idx, weight) in weights {
                tri.add_triplet(doc_idx, idx, weight / norm);
            }
        }

        Ok(tri.to_csr())
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(
        &mut self,
        documents: &[S],
    ) -> Result<CsMat<f64>, VectorizerError> {
        self.fit(documents)?;
        self.transform(documents)
    }

    /// Fitted vocabulary
    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    /// Idf weight per column
    pub fn idf(&self) -> &[f64] {
        &self.idf_values
    }

    /// Get term by index
    pub fn get_term(&self, index: usize) -> Option<&str> {
        self.vocabulary.as_ref().and_then(|v| v.term(index))
    }

    /// Get vocabulary size (0 before fitting)
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.as_ref().map_or(0, Vocabulary::len)
    }
}

impl Default for TfIdfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Count Vectorizer (Bag of Words)
///
/// Same vocabulary bounds as [`TfIdfVectorizer`], raw term counts.
#[derive(Debug, Clone)]
pub struct CountVectorizer {
    vocabulary: Option<Vocabulary>,
    min_df: usize,
    max_df_ratio: f64,
    max_features: Option<usize>,
    stop_words: HashSet<&'static str>,
}

impl CountVectorizer {
    /// Create a vectorizer with `min_df = 2`, `max_df = 0.95` and 1000 features
    pub fn new() -> Self {
        Self {
            vocabulary: None,
            min_df: 2,
            max_df_ratio: 0.95,
            max_features: Some(1000),
            stop_words: english_stop_words(),
        }
    }

    /// Set minimum document frequency
    pub fn min_df(mut self, min_df: usize) -> Self {
        self.min_df = min_df;
        self
    }

    /// Set maximum document frequency ratio
    pub fn max_df_ratio(mut self, ratio: f64) -> Self {
        self.max_df_ratio = ratio;
        self
    }

    /// Set maximum vocabulary size
    pub fn max_features(mut self, max: usize) -> Self {
        self.max_features = Some(max);
        self
    }

    /// Fit the vocabulary
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<(), VectorizerError> {
        check_max_df(self.max_df_ratio)?;
        let vocabulary = Vocabulary::build(
            documents,
            self.min_df,
            self.max_df_ratio,
            self.max_features,
            &self.stop_words,
        );
        log::debug!("Count vocabulary: {} terms", vocabulary.len());
        self.vocabulary = Some(vocabulary);
        Ok(())
    }

    /// Transform documents into a count matrix
    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<CsMat<f64>, VectorizerError> {
        let vocabulary = self.vocabulary.as_ref().ok_or(VectorizerError::NotFitted)?;
        let mut tri = TriMat::new((documents.len(), vocabulary.len()));

        for (doc_idx, doc) in documents.iter().enumerate() {
            for (idx, count) in vocabulary.count(doc.as_ref()) {
                tri.add_triplet(doc_idx, idx, count);
            }
        }

        Ok(tri.to_csr())
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(
        &mut self,
        documents: &[S],
    ) -> Result<CsMat<f64>, VectorizerError> {
        self.fit(documents)?;
        self.transform(documents)
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    /// Get term by index
    pub fn get_term(&self, index: usize) -> Option<&str> {
        self.vocabulary.as_ref().and_then(|v| v.term(index))
    }

    /// Get vocabulary size (0 before fitting)
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.as_ref().map_or(0, Vocabulary::len)
    }
}

impl Default for CountVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Document-term matrix with its vocabulary
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// CSR matrix (n_documents x n_terms)
    pub matrix: CsMat<f64>,
    /// Column terms
    pub vocabulary: Vocabulary,
}

impl FeatureMatrix {
    pub fn new(matrix: CsMat<f64>, vocabulary: Vocabulary) -> Self {
        Self { matrix, vocabulary }
    }

    /// Get matrix dimensions
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }

    pub fn n_documents(&self) -> usize {
        self.matrix.rows()
    }

    pub fn n_terms(&self) -> usize {
        self.matrix.cols()
    }

    /// Fraction of stored entries
    pub fn density(&self) -> f64 {
        let (rows, cols) = self.shape();
        if rows == 0 || cols == 0 {
            0.0
        } else {
            self.matrix.nnz() as f64 / (rows * cols) as f64
        }
    }

    /// Get top terms for a document
    pub fn top_terms_for_document(&self, doc_idx: usize, n: usize) -> Vec<(String, f64)> {
        let Some(row) = self.matrix.outer_view(doc_idx) else {
            return vec![];
        };

        let mut term_scores: Vec<(usize, f64)> = row
            .iter()
            .filter(|(_, &score)| score > 0.0)
            .map(|(idx, &score)| (idx, score))
            .collect();

        term_scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        term_scores.truncate(n);

        term_scores
            .into_iter()
            .filter_map(|(idx, score)| self.vocabulary.term(idx).map(|t| (t.to_string(), score)))
            .collect()
    }
}

/// English stop words re-applied at vectorization time
pub fn english_stop_words() -> HashSet<&'static str> {
    [
        "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
        "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
        "amongst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything",
        "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became", "because",
        "become", "becomes", "becoming", "been", "before", "beforehand", "behind", "being",
        "below", "beside", "besides", "between", "beyond", "both", "bottom", "but", "by", "call",
        "can", "cannot", "could", "describe", "detail", "do", "done", "down", "due", "during",
        "each", "eight", "either", "eleven", "else", "elsewhere", "empty", "enough", "etc",
        "even", "ever", "every", "everyone", "everything", "everywhere", "except", "few",
        "fifteen", "fifty", "fill", "find", "first", "five", "for", "former", "formerly",
        "forty", "four", "from", "front", "full", "further", "get", "give", "go", "had", "has",
        "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon",
        "hers", "herself", "him", "himself", "his", "how", "however", "hundred", "i", "if", "in",
        "indeed", "interest", "into", "is", "it", "its", "itself", "keep", "last", "latter",
        "latterly", "least", "less", "made", "many", "may", "me", "meanwhile", "might", "mine",
        "more", "moreover", "most", "mostly", "move", "much", "must", "my", "myself", "name",
        "namely", "neither", "never", "nevertheless", "next", "nine", "no", "nobody", "none",
        "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once",
        "one", "only", "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves",
        "out", "over", "own", "part", "per", "perhaps", "please", "put", "rather", "same", "see",
        "seem", "seemed", "seeming", "seems", "serious", "several", "she", "should", "show",
        "side", "since", "six", "sixty", "so", "some", "somehow", "someone", "something",
        "sometime", "sometimes", "somewhere", "still", "such", "take", "ten", "than", "that",
        "the", "their", "them", "themselves", "then", "thence", "there", "thereafter",
        "thereby", "therefore", "therein", "thereupon", "these", "they", "thick", "thin",
        "third", "this", "those", "though", "three", "through", "throughout", "thru", "thus",
        "to", "together", "too", "top", "toward", "towards", "twelve", "twenty", "two", "under",
        "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were", "what",
        "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby",
        "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who",
        "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without", "would",
        "yet", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
}
