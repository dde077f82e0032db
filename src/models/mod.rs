//! Numerical models
//!
//! This module provides implementations of:
//! - Randomized truncated SVD (latent semantic reduction)
//! - K-means clustering and the cluster-count sweep
//! - LDA (Latent Dirichlet Allocation) by online variational Bayes
//! - Exact t-SNE for 2-D projection

pub mod kmeans;
pub mod lda;
pub mod selection;
pub mod svd;
pub mod tsne;

pub use kmeans::{ClusterError, KMeans, KMeansConfig};
pub use lda::{LdaConfig, LdaError, LdaTopic, LDA};
pub use selection::{CandidateScore, ClusterSelector, SelectionResult};
pub use svd::{SvdConfig, SvdError, TruncatedSvd};
pub use tsne::{Projection, Tsne, TsneConfig, TsneError};
