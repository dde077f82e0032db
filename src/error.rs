//! Pipeline-wide error type

use crate::data::CorpusError;
use crate::models::{ClusterError, LdaError, SvdError, TsneError};
use crate::preprocessing::VectorizerError;
use crate::utils::ConfigError;
use thiserror::Error;

/// Any failure of an analysis stage
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Vectorizer error: {0}")]
    Vectorizer(#[from] VectorizerError),

    #[error("SVD error: {0}")]
    Svd(#[from] SvdError),

    #[error("Clustering error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("LDA error: {0}")]
    Lda(#[from] LdaError),

    #[error("t-SNE error: {0}")]
    Tsne(#[from] TsneError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
