//! # Topic Clustering
//!
//! Exploratory analysis of a labelled text corpus.
//!
//! This library provides:
//! - Corpus loading from category directories or JSON datasets
//! - Text normalization (cleaning, stop words, lemmatization)
//! - TF-IDF and count vectorization
//! - Randomized truncated SVD
//! - K-means with a V-measure sweep over the cluster count
//! - Online variational LDA topic modeling
//! - Exact t-SNE projection and terminal reports
//!
//! ## Example
//!
//! ```rust,no_run
//! use topic_clustering::{AnalysisConfig, Corpus, Pipeline};
//!
//! fn main() -> topic_clustering::Result<()> {
//!     let pipeline = Pipeline::new(AnalysisConfig::default());
//!     let report = pipeline.run(Corpus::sample())?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod utils;

pub use data::{Corpus, CorpusError, Document};
pub use error::{PipelineError, Result};
pub use pipeline::{
    ClusterSelection, Features, NormalizedCorpus, Pipeline, ReducedSpace, TopicSummary,
};
pub use report::AnalysisReport;
pub use utils::config::{load_config, AnalysisConfig};
