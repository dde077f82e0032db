//! Latent Dirichlet Allocation (LDA)
//!
//! LDA is a generative probabilistic model for topic modeling.
//! This implementation uses online variational Bayes: documents are
//! processed in mini-batches and the variational topic-word parameters
//! are blended in with a decaying learning rate.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_distr::Gamma;
use sprs::CsMat;
use statrs::function::gamma::digamma;
use thiserror::Error;

/// Errors that can occur during LDA computation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LdaError {
    #[error("Cannot fit an empty matrix of shape {0:?}")]
    EmptyMatrix((usize, usize)),

    #[error("Number of topics must be positive")]
    InvalidTopicCount,

    #[error("Matrix dimensions mismatch: expected {expected} terms, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model not fitted yet")]
    NotFitted,

    #[error("Invalid hyperparameter: {0}")]
    InvalidParameter(String),
}

/// Numerical floor added to the per-word normalizer
const EPS: f64 = f64::EPSILON;

/// Topic representation with words and weights
#[derive(Debug, Clone)]
pub struct LdaTopic {
    /// Topic index
    pub index: usize,
    /// Top words with their probabilities
    pub top_words: Vec<(String, f64)>,
    /// Share of the corpus assigned to the topic
    pub prevalence: f64,
}

/// LDA model configuration
#[derive(Debug, Clone)]
pub struct LdaConfig {
    /// Number of topics
    pub n_topics: usize,
    /// Document-topic prior (alpha); `1 / n_topics` when unset
    pub doc_topic_prior: Option<f64>,
    /// Topic-word prior (eta); `1 / n_topics` when unset
    pub topic_word_prior: Option<f64>,
    /// Exponent of the learning rate decay
    pub learning_decay: f64,
    /// Down-weights early iterations
    pub learning_offset: f64,
    /// Documents per mini-batch
    pub batch_size: usize,
    /// Passes over the corpus
    pub max_passes: usize,
    /// E-step iterations per document
    pub max_doc_update_iter: usize,
    /// E-step stops once the mean change of gamma falls below this
    pub mean_change_tol: f64,
    /// Random seed for reproducibility
    pub random_seed: u64,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            n_topics: 10,
            doc_topic_prior: None,
            topic_word_prior: None,
            learning_decay: 0.7,
            learning_offset: 10.0,
            batch_size: 128,
            max_passes: 10,
            max_doc_update_iter: 100,
            mean_change_tol: 1e-3,
            random_seed: 42,
        }
    }
}

impl LdaConfig {
    /// Create a new configuration with specified number of topics
    pub fn new(n_topics: usize) -> Self {
        Self {
            n_topics,
            ..Default::default()
        }
    }

    /// Set alpha (document-topic prior)
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.doc_topic_prior = Some(alpha);
        self
    }

    /// Set eta (topic-word prior)
    pub fn eta(mut self, eta: f64) -> Self {
        self.topic_word_prior = Some(eta);
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    /// Set number of passes over the corpus
    pub fn max_passes(mut self, n: usize) -> Self {
        self.max_passes = n;
        self
    }

    /// Set random seed
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    fn alpha_value(&self) -> f64 {
        self.doc_topic_prior.unwrap_or(1.0 / self.n_topics as f64)
    }

    fn eta_value(&self) -> f64 {
        self.topic_word_prior.unwrap_or(1.0 / self.n_topics as f64)
    }
}

/// `exp(E[log x])` for x ~ Dirichlet(row) applied to each row
fn exp_dirichlet_expectation(params: &Array2<f64>) -> Array2<f64> {
    let mut out = params.mapv(digamma);
    for (mut row, param_row) in out.rows_mut().into_iter().zip(params.rows()) {
        let total = digamma(param_row.sum());
        row.mapv_inplace(|x| (x - total).exp());
    }
    out
}

fn exp_dirichlet_expectation_1d(params: &Array1<f64>) -> Array1<f64> {
    let total = digamma(params.sum());
    params.mapv(|x| (digamma(x) - total).exp())
}

/// Latent Dirichlet Allocation model
///
/// Uses online variational Bayes for inference.
#[derive(Debug, Clone)]
pub struct LDA {
    /// Model configuration
    config: LdaConfig,
    /// Variational topic-word parameters (lambda): n_topics x n_words
    components: Option<Array2<f64>>,
    /// `exp(E[log beta])`, cached after each M-step
    exp_topic_word: Option<Array2<f64>>,
    /// Inverse vocabulary
    terms: Option<Vec<String>>,
    /// Mini-batch updates performed
    n_batch_iter: usize,
    /// Per-document topic mixtures of the training corpus
    doc_topics: Option<Array2<f64>>,
}

impl LDA {
    /// Create a new LDA model
    pub fn new(config: LdaConfig) -> Result<Self, LdaError> {
        if config.n_topics == 0 {
            return Err(LdaError::InvalidTopicCount);
        }
        if config.doc_topic_prior.is_some_and(|a| a <= 0.0) {
            return Err(LdaError::InvalidParameter("alpha must be positive".into()));
        }
        if config.topic_word_prior.is_some_and(|e| e <= 0.0) {
            return Err(LdaError::InvalidParameter("eta must be positive".into()));
        }
        if config.batch_size == 0 {
            return Err(LdaError::InvalidParameter("batch_size must be positive".into()));
        }
        if !(0.5..=1.0).contains(&config.learning_decay) {
            return Err(LdaError::InvalidParameter(
                "learning_decay must be in [0.5, 1]".into(),
            ));
        }

        Ok(Self {
            config,
            components: None,
            exp_topic_word: None,
            terms: None,
            n_batch_iter: 0,
            doc_topics: None,
        })
    }

    /// Create a simple LDA model with just topic count
    pub fn simple(n_topics: usize) -> Result<Self, LdaError> {
        Self::new(LdaConfig::new(n_topics))
    }

    /// Fit the model on a document-term count matrix
    ///
    /// # Arguments
    /// * `dtm` - Document-term matrix (documents x terms) with word counts
    /// * `terms` - Index to term mapping
    pub fn fit(&mut self, dtm: &CsMat<f64>, terms: Vec<String>) -> Result<(), LdaError> {
        let (n_docs, n_words) = dtm.shape();
        if n_docs == 0 || n_words == 0 {
            return Err(LdaError::EmptyMatrix((n_docs, n_words)));
        }
        if terms.len() != n_words {
            return Err(LdaError::DimensionMismatch {
                expected: n_words,
                actual: terms.len(),
            });
        }

        let n_topics = self.config.n_topics;
        let mut rng = StdRng::seed_from_u64(self.config.random_seed);
        let init = Gamma::new(100.0, 0.01)
            .map_err(|e| LdaError::InvalidParameter(format!("gamma init: {}", e)))?;

        let components = Array2::from_shape_fn((n_topics, n_words), |_| init.sample(&mut rng));
        self.exp_topic_word = Some(exp_dirichlet_expectation(&components));
        self.components = Some(components);
        self.n_batch_iter = 0;

        let batch_size = self.config.batch_size;
        for pass in 0..self.config.max_passes {
            for start in (0..n_docs).step_by(batch_size) {
                let end = (start + batch_size).min(n_docs);
                self.em_step(dtm, start..end, n_docs, &init, &mut rng)?;
            }
            log::debug!("LDA pass {} of {}", pass + 1, self.config.max_passes);
        }

        self.terms = Some(terms);
        self.doc_topics = Some(self.transform(dtm)?);
        Ok(())
    }

    /// One mini-batch E-step followed by the online M-step
    fn em_step(
        &mut self,
        dtm: &CsMat<f64>,
        rows: std::ops::Range<usize>,
        total_docs: usize,
        init: &Gamma<f64>,
        rng: &mut StdRng,
    ) -> Result<(), LdaError> {
        let n_topics = self.config.n_topics;
        let batch_docs = rows.len();
        let gamma_init =
            Array2::from_shape_fn((batch_docs, n_topics), |_| init.sample(&mut *rng));
        let (_, sstats) = self.e_step(dtm, rows, gamma_init)?;

        let components = self.components.as_mut().ok_or(LdaError::NotFitted)?;
        let weight =
            (self.config.learning_offset + self.n_batch_iter as f64).powf(-self.config.learning_decay);
        let doc_ratio = total_docs as f64 / batch_docs as f64;
        let eta = self.config.eta_value();

        components.zip_mut_with(&sstats, |lambda, &s| {
            *lambda = (1.0 - weight) * *lambda + weight * (eta + doc_ratio * s);
        });

        self.exp_topic_word = Some(exp_dirichlet_expectation(components));
        self.n_batch_iter += 1;
        Ok(())
    }

    /// Variational E-step over a row range
    ///
    /// Returns the per-document gamma and the sufficient statistics
    /// (already multiplied by `exp(E[log beta])`).
    fn e_step(
        &self,
        dtm: &CsMat<f64>,
        rows: std::ops::Range<usize>,
        mut gamma: Array2<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>), LdaError> {
        let exp_topic_word = self.exp_topic_word.as_ref().ok_or(LdaError::NotFitted)?;
        let alpha = self.config.alpha_value();
        let mut sstats = Array2::zeros(exp_topic_word.dim());

        for (local, doc) in rows.enumerate() {
            let Some(row) = dtm.outer_view(doc) else {
                continue;
            };
            let ids: Vec<usize> = row.indices().to_vec();
            let counts = Array1::from(row.data().to_vec());
            let word_probs = exp_topic_word.select(Axis(1), &ids);

            let mut gamma_d = gamma.row(local).to_owned();
            let mut exp_doc_topic = exp_dirichlet_expectation_1d(&gamma_d);
            let mut norm_phi = exp_doc_topic.dot(&word_probs) + EPS;

            for _ in 0..self.config.max_doc_update_iter {
                let last = gamma_d.clone();
                let ratio = &counts / &norm_phi;
                gamma_d = &exp_doc_topic * &word_probs.dot(&ratio) + alpha;
                exp_doc_topic = exp_dirichlet_expectation_1d(&gamma_d);
                norm_phi = exp_doc_topic.dot(&word_probs) + EPS;

                let change = (&last - &gamma_d).mapv(f64::abs).mean().unwrap_or(0.0);
                if change < self.config.mean_change_tol {
                    break;
                }
            }

            gamma.row_mut(local).assign(&gamma_d);
            let ratio = &counts / &norm_phi;
            for (pos, &word) in ids.iter().enumerate() {
                let mut column = sstats.column_mut(word);
                column.scaled_add(ratio[pos], &exp_doc_topic);
            }
        }

        sstats *= exp_topic_word;
        Ok((gamma, sstats))
    }

    /// Per-document topic mixtures (rows sum to one)
    ///
    /// Documents with no in-vocabulary words get a uniform mixture.
    pub fn transform(&self, dtm: &CsMat<f64>) -> Result<Array2<f64>, LdaError> {
        let components = self.components.as_ref().ok_or(LdaError::NotFitted)?;
        if dtm.cols() != components.ncols() {
            return Err(LdaError::DimensionMismatch {
                expected: components.ncols(),
                actual: dtm.cols(),
            });
        }

        let n_docs = dtm.rows();
        let gamma_init = Array2::ones((n_docs, self.config.n_topics));
        let (mut gamma, _) = self.e_step(dtm, 0..n_docs, gamma_init)?;
        for mut row in gamma.rows_mut() {
            let total = row.sum();
            row.mapv_inplace(|x| x / total);
        }
        Ok(gamma)
    }

    /// Topic-word distribution (rows sum to one)
    pub fn topic_word_distribution(&self) -> Result<Array2<f64>, LdaError> {
        let components = self.components.as_ref().ok_or(LdaError::NotFitted)?;
        let mut dist = components.clone();
        for mut row in dist.rows_mut() {
            let total = row.sum();
            row.mapv_inplace(|x| x / total);
        }
        Ok(dist)
    }

    /// Raw variational parameters (lambda)
    pub fn components(&self) -> Result<&Array2<f64>, LdaError> {
        self.components.as_ref().ok_or(LdaError::NotFitted)
    }

    /// Mean topic mixture of the training corpus
    pub fn prevalence(&self) -> Result<Array1<f64>, LdaError> {
        let doc_topics = self.doc_topics.as_ref().ok_or(LdaError::NotFitted)?;
        doc_topics.mean_axis(Axis(0)).ok_or(LdaError::NotFitted)
    }

    /// Top `n_words` terms of each topic by descending weight
    pub fn top_terms(&self, n_words: usize) -> Result<Vec<LdaTopic>, LdaError> {
        let dist = self.topic_word_distribution()?;
        let terms = self.terms.as_ref().ok_or(LdaError::NotFitted)?;
        let prevalence = self.prevalence()?;

        Ok(dist
            .rows()
            .into_iter()
            .enumerate()
            .map(|(index, row)| LdaTopic {
                index,
                top_words: top_weighted(row, terms, n_words),
                prevalence: prevalence[index],
            })
            .collect())
    }

    /// Get dominant topic for each training document
    pub fn dominant_topics(&self) -> Result<Vec<usize>, LdaError> {
        let doc_topics = self.doc_topics.as_ref().ok_or(LdaError::NotFitted)?;
        Ok(doc_topics
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (t, &p)| {
                        if p > best.1 {
                            (t, p)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect())
    }

    /// Perplexity of a count matrix under the fitted mixtures
    ///
    /// Lower perplexity indicates better fit.
    pub fn perplexity(&self, dtm: &CsMat<f64>) -> Result<f64, LdaError> {
        let doc_topics = self.transform(dtm)?;
        let topic_words = self.topic_word_distribution()?;

        let mut log_likelihood = 0.0;
        let mut total_words = 0.0;
        for (doc, row) in dtm.outer_iterator().enumerate() {
            for (word, &count) in row.iter() {
                let prob = doc_topics.row(doc).dot(&topic_words.column(word));
                log_likelihood += count * prob.max(f64::MIN_POSITIVE).ln();
                total_words += count;
            }
        }

        if total_words == 0.0 {
            return Ok(f64::NAN);
        }
        Ok((-log_likelihood / total_words).exp())
    }

    /// Get configuration
    pub fn config(&self) -> &LdaConfig {
        &self.config
    }
}

fn top_weighted(row: ArrayView1<f64>, terms: &[String], n: usize) -> Vec<(String, f64)> {
    let mut weights: Vec<(usize, f64)> = row.iter().copied().enumerate().collect();
    weights.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    weights.truncate(n);
    weights
        .into_iter()
        .filter_map(|(idx, w)| terms.get(idx).map(|t| (t.clone(), w)))
        .collect()
}

/// Display implementation for LdaTopic
impl std::fmt::Display for LdaTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Topic {}: (prevalence: {:.2}%) [",
            self.index,
            self.prevalence * 100.0
        )?;
        for (i, (word, prob)) in self.top_words.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:.3}", word, prob)?;
        }
        write!(f, "]")
    }
}
