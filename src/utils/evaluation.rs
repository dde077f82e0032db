//! Evaluation metrics
//!
//! External-validity scores for a partition against ground-truth labels
//! (homogeneity, completeness, V-measure, adjusted Rand index) and
//! intrinsic quality measures for topics (UMass coherence, diversity).

use hashbrown::HashMap;
use ndarray::Array2;
use sprs::CsMat;
use std::collections::HashSet;

/// Label x cluster count table
///
/// Rows follow the sorted distinct true labels, columns the sorted
/// distinct cluster ids.
#[derive(Debug, Clone)]
pub struct Contingency {
    pub classes: Vec<usize>,
    pub clusters: Vec<usize>,
    pub counts: Array2<usize>,
}

impl Contingency {
    pub fn new(labels_true: &[usize], labels_pred: &[usize]) -> Self {
        let classes = sorted_unique(labels_true);
        let clusters = sorted_unique(labels_pred);
        let class_idx: HashMap<usize, usize> =
            classes.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        let cluster_idx: HashMap<usize, usize> =
            clusters.iter().enumerate().map(|(i, &c)| (c, i)).collect();

        let mut counts = Array2::zeros((classes.len(), clusters.len()));
        for (t, p) in labels_true.iter().zip(labels_pred) {
            counts[[class_idx[t], cluster_idx[p]]] += 1;
        }

        Self {
            classes,
            clusters,
            counts,
        }
    }

    fn total(&self) -> usize {
        self.counts.sum()
    }

    fn row_sums(&self) -> Vec<usize> {
        self.counts.rows().into_iter().map(|r| r.sum()).collect()
    }

    fn col_sums(&self) -> Vec<usize> {
        self.counts.columns().into_iter().map(|c| c.sum()).collect()
    }
}

fn sorted_unique(labels: &[usize]) -> Vec<usize> {
    let mut unique: Vec<usize> = labels.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

/// Entropy (natural log) of a count distribution
fn entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    -counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            p * p.ln()
        })
        .sum::<f64>()
}

/// Mutual information of the contingency table
fn mutual_information(table: &Contingency) -> f64 {
    let n = table.total() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let rows = table.row_sums();
    let cols = table.col_sums();

    let mut mi = 0.0;
    for ((i, j), &nij) in table.counts.indexed_iter() {
        if nij == 0 {
            continue;
        }
        let nij = nij as f64;
        mi += nij / n * ((n * nij) / (rows[i] as f64 * cols[j] as f64)).ln();
    }
    mi.max(0.0)
}

/// Partition scores against ground-truth labels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteringScores {
    pub homogeneity: f64,
    pub completeness: f64,
    pub v_measure: f64,
    pub adjusted_rand: f64,
}

impl ClusteringScores {
    pub fn compute(labels_true: &[usize], labels_pred: &[usize]) -> Self {
        let (homogeneity, completeness, v_measure) =
            homogeneity_completeness_v_measure(labels_true, labels_pred);
        Self {
            homogeneity,
            completeness,
            v_measure,
            adjusted_rand: adjusted_rand_index(labels_true, labels_pred),
        }
    }
}

/// Homogeneity, completeness and their harmonic mean
///
/// Homogeneity is 1 when every cluster holds a single class; completeness
/// is 1 when every class falls in a single cluster.
pub fn homogeneity_completeness_v_measure(
    labels_true: &[usize],
    labels_pred: &[usize],
) -> (f64, f64, f64) {
    if labels_true.is_empty() {
        return (1.0, 1.0, 1.0);
    }

    let table = Contingency::new(labels_true, labels_pred);
    let entropy_c = entropy(&table.row_sums());
    let entropy_k = entropy(&table.col_sums());
    let mi = mutual_information(&table);

    let homogeneity = if entropy_c == 0.0 { 1.0 } else { mi / entropy_c };
    let completeness = if entropy_k == 0.0 { 1.0 } else { mi / entropy_k };
    let v_measure = if homogeneity + completeness == 0.0 {
        0.0
    } else {
        2.0 * homogeneity * completeness / (homogeneity + completeness)
    };

    (homogeneity, completeness, v_measure)
}

pub fn v_measure(labels_true: &[usize], labels_pred: &[usize]) -> f64 {
    homogeneity_completeness_v_measure(labels_true, labels_pred).2
}

fn comb2(n: usize) -> f64 {
    let n = n as f64;
    n * (n - 1.0) / 2.0
}

/// Adjusted Rand index; 1.0 when the chance-corrected denominator vanishes
pub fn adjusted_rand_index(labels_true: &[usize], labels_pred: &[usize]) -> f64 {
    let table = Contingency::new(labels_true, labels_pred);
    let n = table.total();

    let sum_comb: f64 = table.counts.iter().map(|&c| comb2(c)).sum();
    let sum_rows: f64 = table.row_sums().into_iter().map(comb2).sum();
    let sum_cols: f64 = table.col_sums().into_iter().map(comb2).sum();
    let total_pairs = comb2(n);
    if total_pairs == 0.0 {
        return 1.0;
    }

    let expected = sum_rows * sum_cols / total_pairs;
    let max_index = (sum_rows + sum_cols) / 2.0;
    let denominator = max_index - expected;
    if denominator == 0.0 {
        return 1.0;
    }
    (sum_comb - expected) / denominator
}

/// Topic model evaluation metrics over a sparse count matrix
pub struct Evaluator<'a> {
    /// Document-term matrix for coherence computation
    dtm: &'a CsMat<f64>,
    /// Column terms
    vocabulary: &'a [String],
}

impl<'a> Evaluator<'a> {
    pub fn new(dtm: &'a CsMat<f64>, vocabulary: &'a [String]) -> Self {
        Self { dtm, vocabulary }
    }

    fn documents_containing(&self, term: usize) -> HashSet<usize> {
        self.dtm
            .outer_iterator()
            .enumerate()
            .filter(|(_, row)| row.get(term).map_or(false, |&v| v > 0.0))
            .map(|(doc, _)| doc)
            .collect()
    }

    /// UMass coherence of a ranked word list
    ///
    /// Averages `ln((D(wi, wj) + 1) / D(wj))` over ordered pairs, where `wj`
    /// ranks above `wi`. Higher (less negative) is more coherent.
    pub fn umass_coherence(&self, top_words: &[String]) -> Option<f64> {
        let index: HashMap<&str, usize> = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, w)| (w.as_str(), i))
            .collect();

        let docs: Vec<HashSet<usize>> = top_words
            .iter()
            .filter_map(|w| index.get(w.as_str()))
            .map(|&idx| self.documents_containing(idx))
            .filter(|set| !set.is_empty())
            .collect();

        if docs.len() < 2 {
            return None;
        }

        let mut coherence = 0.0;
        let mut pairs = 0;
        for i in 1..docs.len() {
            for j in 0..i {
                let joint = docs[i].intersection(&docs[j]).count() as f64;
                coherence += ((joint + 1.0) / docs[j].len() as f64).ln();
                pairs += 1;
            }
        }

        Some(coherence / pairs as f64)
    }

    /// Fraction of unique words across all topics' top words
    pub fn topic_diversity(topics: &[Vec<String>]) -> f64 {
        let total: usize = topics.iter().map(Vec::len).sum();
        if total == 0 {
            return 0.0;
        }
        let unique: HashSet<&str> = topics.iter().flatten().map(String::as_str).collect();
        unique.len() as f64 / total as f64
    }

    /// Jaccard similarity between two topics' word sets
    pub fn topic_overlap(topic1: &[String], topic2: &[String]) -> f64 {
        let set1: HashSet<&str> = topic1.iter().map(String::as_str).collect();
        let set2: HashSet<&str> = topic2.iter().map(String::as_str).collect();
        let union = set1.union(&set2).count();
        if union == 0 {
            0.0
        } else {
            set1.intersection(&set2).count() as f64 / union as f64
        }
    }
}

/// Coherence and diversity of a set of topics
#[derive(Debug, Clone)]
pub struct TopicQuality {
    pub avg_coherence: Option<f64>,
    pub diversity: f64,
    pub topic_coherences: Vec<Option<f64>>,
}

impl TopicQuality {
    pub fn from_topics(topics: &[Vec<String>], evaluator: &Evaluator) -> Self {
        let topic_coherences: Vec<Option<f64>> = topics
            .iter()
            .map(|words| evaluator.umass_coherence(words))
            .collect();

        let values: Vec<f64> = topic_coherences.iter().flatten().copied().collect();
        let avg_coherence = if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        };

        Self {
            avg_coherence,
            diversity: Evaluator::topic_diversity(topics),
            topic_coherences,
        }
    }
}
