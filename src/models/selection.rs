//! Cluster-count selection
//!
//! Fits K-means for each candidate k and keeps the one whose partition
//! best agrees with the ground-truth labels (V-measure).

use super::kmeans::{ClusterError, KMeans, KMeansConfig};
use crate::utils::evaluation::ClusteringScores;
use ndarray::ArrayView2;

/// Score of one candidate k
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub k: usize,
    pub scores: ClusteringScores,
    pub inertia: f64,
}

/// Outcome of a sweep
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Every evaluated candidate in ascending k
    pub candidates: Vec<CandidateScore>,
    pub best_k: usize,
    /// Model refit at `best_k`
    pub model: KMeans,
    /// Per-document cluster ids in `[0, best_k)`
    pub assignments: Vec<usize>,
    pub scores: ClusteringScores,
}

/// Sweeps k over an inclusive range
#[derive(Debug, Clone)]
pub struct ClusterSelector {
    k_min: usize,
    k_max: usize,
    /// Template for every fit; `n_clusters` is overridden per candidate
    base: KMeansConfig,
}

impl ClusterSelector {
    pub fn new(k_min: usize, k_max: usize, base: KMeansConfig) -> Self {
        Self {
            k_min: k_min.max(1),
            k_max,
            base,
        }
    }

    /// Fit and score a single k
    pub fn evaluate(
        &self,
        data: ArrayView2<f64>,
        labels: &[usize],
        k: usize,
    ) -> Result<(KMeans, ClusteringScores), ClusterError> {
        let mut config = self.base.clone();
        config.n_clusters = k;
        let mut model = KMeans::new(config);
        model.fit(data)?;
        let scores = ClusteringScores::compute(labels, model.labels()?);
        Ok((model, scores))
    }

    /// Evaluate every candidate k and refit at the best one
    ///
    /// Candidates run in ascending k; a later candidate replaces the
    /// current best only with a strictly greater V-measure.
    pub fn select(
        &self,
        data: ArrayView2<f64>,
        labels: &[usize],
    ) -> Result<SelectionResult, ClusterError> {
        let n_documents = data.nrows();
        if labels.len() != n_documents {
            return Err(ClusterError::LabelMismatch {
                expected: n_documents,
                actual: labels.len(),
            });
        }

        let ks: Vec<usize> = (self.k_min..=self.k_max).filter(|&k| k <= n_documents).collect();
        let skipped = (self.k_min..=self.k_max).count() - ks.len();
        if skipped > 0 {
            log::warn!(
                "Skipping {} candidate cluster counts above the {} documents",
                skipped,
                n_documents
            );
        }
        if n_documents < 2 || ks.is_empty() {
            return Err(ClusterError::TooFewDocuments { n_documents });
        }

        let mut candidates = Vec::with_capacity(ks.len());
        let mut best: Option<CandidateScore> = None;

        for k in ks {
            let (model, scores) = self.evaluate(data, labels, k)?;
            let candidate = CandidateScore {
                k,
                scores,
                inertia: model.inertia(),
            };
            log::debug!(
                "k={:>2}  V-measure {:.4}  homogeneity {:.4}  completeness {:.4}",
                k,
                scores.v_measure,
                scores.homogeneity,
                scores.completeness
            );

            if best.map_or(true, |b| scores.v_measure > b.scores.v_measure) {
                best = Some(candidate);
            }
            candidates.push(candidate);
        }

        let best_k = best.map_or(self.k_min, |b| b.k);
        let (model, scores) = self.evaluate(data, labels, best_k)?;
        let assignments = model.labels()?.to_vec();
        log::info!("Selected k={} (V-measure {:.4})", best_k, scores.v_measure);

        Ok(SelectionResult {
            candidates,
            best_k,
            model,
            assignments,
            scores,
        })
    }
}

impl Default for ClusterSelector {
    fn default() -> Self {
        Self::new(2, 24, KMeansConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_selects_true_cluster_count() {
        let data = array![
            [1.0, 0.0, 0.0],
            [0.98, 0.2, 0.0],
            [0.0, 1.0, 0.0],
            [0.2, 0.98, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.2, 0.98],
        ];
        let labels = [0, 0, 1, 1, 2, 2];

        let result = ClusterSelector::default().select(data.view(), &labels).unwrap();
        assert_eq!(result.best_k, 3);
        assert!((result.scores.v_measure - 1.0).abs() < 1e-9);
        // k = 2..=6; 7..=24 exceed the document count
        assert_eq!(result.candidates.len(), 5);
        assert_eq!(result.candidates[0].k, 2);
    }

    #[test]
    fn test_first_maximum_wins() {
        // Two identical pairs: k = 2 is perfect, larger k only splits
        let data = array![[1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0]];
        let result = ClusterSelector::default().select(data.view(), &[0, 0, 1, 1]).unwrap();
        assert_eq!(result.best_k, 2);

        let best = result
            .candidates
            .iter()
            .map(|c| c.scores.v_measure)
            .fold(f64::NEG_INFINITY, f64::max);
        let first = result.candidates.iter().find(|c| c.scores.v_measure == best).unwrap();
        assert_eq!(first.k, result.best_k);
    }

    #[test]
    fn test_too_few_documents() {
        let data = array![[1.0, 0.0]];
        assert_eq!(
            ClusterSelector::default().select(data.view(), &[0]).unwrap_err(),
            ClusterError::TooFewDocuments { n_documents: 1 }
        );
    }

    #[test]
    fn test_label_mismatch() {
        let data = array![[1.0], [2.0]];
        assert!(matches!(
            ClusterSelector::default().select(data.view(), &[0]),
            Err(ClusterError::LabelMismatch { .. })
        ));
    }

    #[test]
    fn test_sweep_is_deterministic() {
        let data = array![[0.0, 1.0], [0.1, 0.9], [1.0, 0.0], [0.9, 0.2], [0.5, 0.5]];
        let labels = [0, 0, 1, 1, 0];
        let a = ClusterSelector::default().select(data.view(), &labels).unwrap();
        let b = ClusterSelector::default().select(data.view(), &labels).unwrap();
        assert_eq!(a.candidates, b.candidates);
        assert_eq!(a.best_k, b.best_k);
        assert_eq!(a.assignments, b.assignments);
    }
}
