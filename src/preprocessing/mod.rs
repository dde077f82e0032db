//! Text preprocessing module
//!
//! Provides text normalization, lemmatization, and vectorization
//! utilities for preparing documents for clustering and topic modeling.

pub mod lemmatizer;
pub mod tokenizer;
pub mod vectorizer;

pub use lemmatizer::Lemmatizer;
pub use tokenizer::Tokenizer;
pub use vectorizer::{CountVectorizer, FeatureMatrix, TfIdfVectorizer, VectorizerError, Vocabulary};
