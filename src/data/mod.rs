//! Corpus loading
//!
//! Provides the labelled document collection the pipeline runs on.

pub mod corpus;

pub use corpus::{Corpus, CorpusError, DirectoryOptions, Document};
