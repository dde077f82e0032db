//! Configuration utilities

use crate::data::DirectoryOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Analysis configuration
///
/// Every section has defaults, so a config file only needs the values
/// it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Seed shared by every randomized step
    pub seed: u64,
    /// Where documents come from
    pub corpus: CorpusSettings,
    /// Vocabulary bounds of both vectorizers
    pub vectorizer: VectorizerSettings,
    /// Truncated SVD settings
    pub reduction: ReductionSettings,
    /// Cluster-count sweep settings
    pub clustering: ClusteringSettings,
    /// Topic model settings
    pub topics: TopicSettings,
    /// 2-D projection settings
    pub projection: ProjectionSettings,
    /// Report layout
    pub report: ReportSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            corpus: CorpusSettings::default(),
            vectorizer: VectorizerSettings::default(),
            reduction: ReductionSettings::default(),
            clustering: ClusteringSettings::default(),
            topics: TopicSettings::default(),
            projection: ProjectionSettings::default(),
            report: ReportSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Corpus source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Directory with one sub-directory per category
    pub directory: Option<PathBuf>,
    /// JSON dataset file
    pub dataset: Option<PathBuf>,
    /// Options used when reading `directory`
    pub options: DirectoryOptions,
    /// Shuffle documents with the shared seed after loading
    pub shuffle: bool,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            directory: None,
            dataset: None,
            options: DirectoryOptions::default(),
            shuffle: true,
        }
    }
}

/// Vocabulary bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularySettings {
    /// Minimum number of documents a term must appear in
    pub min_df: usize,
    /// Maximum fraction of documents a term may appear in
    pub max_df: f64,
    /// Vocabulary cap
    pub max_features: usize,
}

impl Default for VocabularySettings {
    fn default() -> Self {
        Self {
            min_df: 2,
            max_df: 0.95,
            max_features: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerSettings {
    pub tfidf: VocabularySettings,
    pub count: VocabularySettings,
}

/// Truncated SVD settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionSettings {
    /// Target rank
    pub n_components: usize,
    pub n_oversamples: usize,
    /// Power iterations
    pub n_iter: usize,
}

impl Default for ReductionSettings {
    fn default() -> Self {
        Self {
            n_components: 300,
            n_oversamples: 10,
            n_iter: 5,
        }
    }
}

/// Cluster-count sweep settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSettings {
    pub k_min: usize,
    pub k_max: usize,
    pub max_iter: usize,
    pub tol: f64,
    /// Seeded restarts per k
    pub n_init: usize,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            k_min: 2,
            k_max: 24,
            max_iter: 300,
            tol: 1e-4,
            n_init: 3,
        }
    }
}

/// Topic model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicSettings {
    /// Number of topics; the number of categories when unset
    pub n_topics: Option<usize>,
    pub learning_decay: f64,
    pub learning_offset: f64,
    pub batch_size: usize,
    /// Passes over the corpus
    pub max_passes: usize,
    /// Terms listed per topic
    pub n_top_words: usize,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            n_topics: None,
            learning_decay: 0.7,
            learning_offset: 10.0,
            batch_size: 128,
            max_passes: 10,
            n_top_words: 15,
        }
    }
}

/// 2-D projection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    pub enabled: bool,
    pub perplexity: f64,
    pub n_iter: usize,
    /// Points kept before embedding
    pub max_points: usize,
    /// Scatter plot size in characters
    pub width: usize,
    pub height: usize,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            perplexity: 30.0,
            n_iter: 1000,
            max_points: 2000,
            width: 72,
            height: 24,
        }
    }
}

/// Report layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Discriminative terms listed per cluster
    pub n_centroid_terms: usize,
    /// Words shown in each cluster's word cloud
    pub n_cloud_words: usize,
    /// Width of word cloud bars
    pub bar_width: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            n_centroid_terms: 15,
            n_cloud_words: 10,
            bar_width: 40,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig, ConfigError> {
    let content = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ConfigError::FileError(e.to_string()))?;

    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext {
        "json" => serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string())),
        "toml" => toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string())),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Save configuration to file
pub fn save_config<P: AsRef<Path>>(config: &AnalysisConfig, path: P) -> Result<(), ConfigError> {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let content = match ext {
        "json" => serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?,
        "toml" => toml::to_string_pretty(config)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?,
        _ => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
    };

    std::fs::write(path, content).map_err(|e| ConfigError::FileError(e.to_string()))
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("File error: {0}")]
    FileError(String),
    /// Parse error
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Serialization error
    #[error("Serialize error: {0}")]
    SerializeError(String),
    /// Unsupported format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
}
