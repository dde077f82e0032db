//! Analysis pipeline
//!
//! Each stage is a function from the previous stage's output to a new
//! immutable value:
//!
//! `Corpus -> NormalizedCorpus -> Features -> ReducedSpace ->
//! ClusterSelection -> TopicSummary -> AnalysisReport`

use crate::data::Corpus;
use crate::error::Result;
use crate::models::{
    ClusterSelector, KMeansConfig, LdaConfig, LdaTopic, Projection, SelectionResult, SvdConfig,
    TruncatedSvd, Tsne, TsneConfig, LDA,
};
use crate::preprocessing::{
    CountVectorizer, FeatureMatrix, TfIdfVectorizer, Tokenizer, VectorizerError,
};
use crate::report::AnalysisReport;
use crate::utils::config::{
    load_config, AnalysisConfig, ClusteringSettings, ProjectionSettings, ReductionSettings, TopicSettings,
    VectorizerSettings,
};
use crate::utils::evaluation::{Evaluator, TopicQuality};
use ndarray::Array2;
use std::path::Path;

/// Loaded corpus with one normalized string per document
#[derive(Debug, Clone)]
pub struct NormalizedCorpus {
    pub corpus: Corpus,
    /// Space-joined base-form tokens, in document order
    pub cleaned: Vec<String>,
}

/// TF-IDF and count matrices, each with its own vocabulary
#[derive(Debug, Clone)]
pub struct Features {
    pub tfidf: FeatureMatrix,
    pub counts: FeatureMatrix,
}

/// Unit-norm reduced rows plus the fitted basis
#[derive(Debug, Clone)]
pub struct ReducedSpace {
    pub svd: TruncatedSvd,
    /// n_documents x n_components
    pub matrix: Array2<f64>,
}

/// Outcome of the cluster-count sweep
#[derive(Debug, Clone)]
pub struct ClusterSelection {
    pub result: SelectionResult,
}

/// Fitted topic model and its top terms
#[derive(Debug, Clone)]
pub struct TopicSummary {
    pub model: LDA,
    pub topics: Vec<LdaTopic>,
    pub quality: TopicQuality,
    pub perplexity: f64,
}

/// Normalize every document
pub fn normalize(corpus: Corpus, tokenizer: &Tokenizer) -> NormalizedCorpus {
    let cleaned = tokenizer.normalize_all(&corpus.texts());
    log::info!("Normalized {} documents", cleaned.len());
    NormalizedCorpus { corpus, cleaned }
}

/// Fit both vectorizers on the full cleaned corpus
pub fn vectorize(normalized: &NormalizedCorpus, settings: &VectorizerSettings) -> Result<Features> {
    let docs = &normalized.cleaned;

    let mut tfidf = TfIdfVectorizer::new()
        .min_df(settings.tfidf.min_df)
        .max_df_ratio(settings.tfidf.max_df)
        .max_features(settings.tfidf.max_features);
    let tfidf_matrix = tfidf.fit_transform(docs)?;
    let tfidf_vocab = tfidf.vocabulary().cloned().ok_or(VectorizerError::NotFitted)?;

    let mut counts = CountVectorizer::new()
        .min_df(settings.count.min_df)
        .max_df_ratio(settings.count.max_df)
        .max_features(settings.count.max_features);
    let count_matrix = counts.fit_transform(docs)?;
    let count_vocab = counts.vocabulary().cloned().ok_or(VectorizerError::NotFitted)?;

    let features = Features {
        tfidf: FeatureMatrix::new(tfidf_matrix, tfidf_vocab),
        counts: FeatureMatrix::new(count_matrix, count_vocab),
    };
    log::info!(
        "TF-IDF matrix {:?} (density {:.4}), count matrix {:?}",
        features.tfidf.shape(),
        features.tfidf.density(),
        features.counts.shape()
    );
    Ok(features)
}

/// Truncated SVD of the TF-IDF matrix
pub fn reduce(features: &Features, settings: &ReductionSettings, seed: u64) -> Result<ReducedSpace> {
    let config = SvdConfig::new(settings.n_components)
        .n_oversamples(settings.n_oversamples)
        .n_iter(settings.n_iter)
        .random_seed(seed);
    let mut svd = TruncatedSvd::new(config)?;
    let matrix = svd.fit_transform(&features.tfidf.matrix)?;

    let explained: f64 = svd.explained_variance_ratio()?.sum();
    log::info!(
        "Reduced to {} components ({:.1}% of variance)",
        matrix.ncols(),
        explained * 100.0
    );
    Ok(ReducedSpace { svd, matrix })
}

/// Sweep k and refit at the best V-measure
pub fn select_clusters(
    reduced: &ReducedSpace,
    labels: &[usize],
    settings: &ClusteringSettings,
    seed: u64,
) -> Result<ClusterSelection> {
    let base = KMeansConfig::new(settings.k_min)
        .max_iter(settings.max_iter)
        .tol(settings.tol)
        .n_init(settings.n_init)
        .random_seed(seed);
    let selector = ClusterSelector::new(settings.k_min, settings.k_max, base);
    let result = selector.select(reduced.matrix.view(), labels)?;
    Ok(ClusterSelection { result })
}

/// Online variational LDA on the count matrix
pub fn model_topics(
    features: &Features,
    n_topics: usize,
    settings: &TopicSettings,
    seed: u64,
) -> Result<TopicSummary> {
    let mut config = LdaConfig::new(n_topics)
        .batch_size(settings.batch_size)
        .max_passes(settings.max_passes)
        .random_seed(seed);
    config.learning_decay = settings.learning_decay;
    config.learning_offset = settings.learning_offset;

    let counts = &features.counts;
    let mut model = LDA::new(config)?;
    model.fit(&counts.matrix, counts.vocabulary.terms().to_vec())?;

    let topics = model.top_terms(settings.n_top_words)?;
    let words: Vec<Vec<String>> = topics
        .iter()
        .map(|t| t.top_words.iter().map(|(w, _)| w.clone()).collect())
        .collect();
    let evaluator = Evaluator::new(&counts.matrix, counts.vocabulary.terms());
    let quality = TopicQuality::from_topics(&words, &evaluator);
    let perplexity = model.perplexity(&counts.matrix)?;

    log::info!(
        "Fitted {} topics (perplexity {:.2}, diversity {:.3})",
        n_topics,
        perplexity,
        quality.diversity
    );
    Ok(TopicSummary {
        model,
        topics,
        quality,
        perplexity,
    })
}

/// 2-D t-SNE projection of the reduced rows
pub fn project(
    reduced: &ReducedSpace,
    settings: &ProjectionSettings,
    seed: u64,
) -> Result<Projection> {
    let config = TsneConfig::default()
        .perplexity(settings.perplexity)
        .n_iter(settings.n_iter)
        .max_points(settings.max_points)
        .random_seed(seed);
    let projection = Tsne::new(config)?.project(reduced.matrix.view())?;
    log::info!("Projected {} points to 2-D", projection.indices.len());
    Ok(projection)
}

/// Runs every stage with one configuration
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: AnalysisConfig,
    tokenizer: Tokenizer,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            tokenizer: Tokenizer::new(),
        }
    }

    /// Build a pipeline from a TOML or JSON configuration file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = load_config(path)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AnalysisConfig {
        &mut self.config
    }

    /// Load the configured corpus: directory, then JSON dataset, else the built-in sample
    pub fn load_corpus(&self) -> Result<Corpus> {
        let settings = &self.config.corpus;
        let corpus = match (&settings.directory, &settings.dataset) {
            (Some(dir), _) => Corpus::from_directory(dir, &settings.options)?,
            (None, Some(path)) => Corpus::from_json(path)?,
            (None, None) => {
                log::info!("No corpus configured, using the built-in sample");
                Corpus::sample()
            }
        };

        Ok(if settings.shuffle {
            corpus.shuffled(self.config.seed)
        } else {
            corpus
        })
    }

    /// Run the full analysis on `corpus`
    pub fn run(&self, corpus: Corpus) -> Result<AnalysisReport> {
        let config = &self.config;
        let seed = config.seed;
        log::info!(
            "Analyzing {} documents in {} categories (seed {})",
            corpus.len(),
            corpus.n_labels(),
            seed
        );

        let normalized = normalize(corpus, &self.tokenizer);
        let features = vectorize(&normalized, &config.vectorizer)?;
        let reduced = reduce(&features, &config.reduction, seed)?;
        let labels = normalized.corpus.labels();
        let clusters = select_clusters(&reduced, &labels, &config.clustering, seed)?;

        let n_topics = config.topics.n_topics.unwrap_or(normalized.corpus.n_labels());
        let topics = model_topics(&features, n_topics, &config.topics, seed)?;

        let projection = if config.projection.enabled {
            Some(project(&reduced, &config.projection, seed)?)
        } else {
            None
        };

        AnalysisReport::build(
            &normalized,
            &features,
            &reduced,
            &clusters,
            topics,
            projection,
            config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Document;
    use crate::error::PipelineError;
    use crate::utils::config::{save_config, ConfigError};

    fn tiny_corpus() -> Corpus {
        let docs = vec![
            Document::new("rockets orbit planets", 0),
            Document::new("rocket orbits planet", 0),
            Document::new("goalie stops pucks", 1),
            Document::new("goalie stop puck", 1),
        ];
        Corpus::new(docs, vec!["space".into(), "hockey".into()]).unwrap()
    }

    fn small_config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.reduction.n_components = 8;
        config.projection.n_iter = 100;
        config
    }

    #[test]
    fn test_stages_preserve_document_order() {
        let tokenizer = Tokenizer::new();
        let normalized = normalize(tiny_corpus(), &tokenizer);
        assert_eq!(normalized.cleaned[0], "rocket orbit planet");
        assert_eq!(normalized.cleaned[2], "goalie stop puck");

        let features = vectorize(&normalized, &VectorizerSettings::default()).unwrap();
        assert_eq!(features.tfidf.shape(), (4, 6));
        assert_eq!(features.counts.n_documents(), 4);

        let reduced = reduce(&features, &small_config().reduction, 42).unwrap();
        assert_eq!(reduced.matrix.dim(), (4, 8));
    }

    #[test]
    fn test_load_sample_without_configuration() {
        let pipeline = Pipeline::default();
        let corpus = pipeline.load_corpus().unwrap();
        assert_eq!(corpus.len(), Corpus::sample().len());
    }

    #[test]
    fn test_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        let mut config = small_config();
        config.seed = 7;
        save_config(&config, &path).unwrap();

        let pipeline = Pipeline::from_config_file(&path).unwrap();
        assert_eq!(pipeline.config().seed, 7);
        assert_eq!(pipeline.config().reduction.n_components, 8);
    }

    #[test]
    fn test_config_file_errors_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("analysis.yaml");
        std::fs::write(&yaml, "seed: 7\n").unwrap();
        assert!(matches!(
            Pipeline::from_config_file(&yaml),
            Err(PipelineError::Config(ConfigError::UnsupportedFormat(ext))) if ext == "yaml"
        ));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Pipeline::from_config_file(&missing),
            Err(PipelineError::Config(ConfigError::FileError(_)))
        ));
    }

    #[test]
    fn test_run_tiny_corpus() {
        let report = Pipeline::new(small_config()).run(tiny_corpus()).unwrap();
        assert_eq!(report.best_k, 2);
        assert!((report.scores.v_measure - 1.0).abs() < 1e-9);
        assert_eq!(report.topics.len(), 2);
    }
}
