//! Analysis report
//!
//! Collects the read-only summaries of every stage and renders them as
//! terminal text.

use crate::error::Result;
use crate::models::{CandidateScore, LdaTopic, Projection};
use crate::pipeline::{ClusterSelection, Features, NormalizedCorpus, ReducedSpace, TopicSummary};
use crate::utils::config::AnalysisConfig;
use crate::utils::evaluation::{ClusteringScores, TopicQuality};
use crate::utils::visualization::{
    glyph, render_bar_chart, render_heatmap, render_scatter, render_variance_plot,
};
use hashbrown::HashMap;
use ndarray::{Array1, Array2, ArrayView1};
use std::fmt;

/// Components shown in the variance table
const VARIANCE_ROWS: usize = 10;

/// Everything the pipeline found, ready for printing
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub label_names: Vec<String>,
    pub n_documents: usize,
    pub tfidf_vocabulary_size: usize,
    pub count_vocabulary_size: usize,
    pub explained_variance_ratio: Array1<f64>,
    /// Every evaluated k, ascending
    pub candidates: Vec<CandidateScore>,
    pub best_k: usize,
    pub scores: ClusteringScores,
    /// Per-document cluster ids
    pub assignments: Vec<usize>,
    /// n_labels x best_k document counts
    pub contingency: Array2<usize>,
    /// Highest-weighted TF-IDF terms of each centroid mapped back to term space
    pub centroid_terms: Vec<Vec<(String, f64)>>,
    /// Most frequent cleaned tokens of each cluster
    pub word_clouds: Vec<Vec<(String, usize)>>,
    pub topics: Vec<LdaTopic>,
    pub topic_quality: TopicQuality,
    pub perplexity: f64,
    pub projection: Option<Projection>,
    /// Cluster id of each projected point
    pub projection_groups: Vec<usize>,
    bar_width: usize,
    plot_size: (usize, usize),
}

impl AnalysisReport {
    /// Assemble the report from the stage outputs
    pub fn build(
        normalized: &NormalizedCorpus,
        features: &Features,
        reduced: &ReducedSpace,
        clusters: &ClusterSelection,
        topics: TopicSummary,
        projection: Option<Projection>,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let selection = &clusters.result;
        let best_k = selection.best_k;
        let labels = normalized.corpus.labels();
        let label_names = normalized.corpus.label_names().to_vec();

        let mut contingency = Array2::<usize>::zeros((label_names.len(), best_k));
        for (&label, &cluster) in labels.iter().zip(selection.assignments.iter()) {
            contingency[[label, cluster]] += 1;
        }

        let vocabulary = features.tfidf.vocabulary.terms();
        let mut centroid_terms = Vec::with_capacity(best_k);
        for centroid in selection.model.centroids()?.rows() {
            let weights = reduced.svd.inverse_transform(centroid)?;
            centroid_terms.push(top_weighted_terms(
                weights.view(),
                vocabulary,
                config.report.n_centroid_terms,
            ));
        }

        let word_clouds = cluster_word_counts(
            &normalized.cleaned,
            &selection.assignments,
            best_k,
            config.report.n_cloud_words,
        );

        let projection_groups = projection
            .as_ref()
            .map(|p| p.indices.iter().map(|&i| selection.assignments[i]).collect())
            .unwrap_or_default();

        Ok(Self {
            label_names,
            n_documents: normalized.corpus.len(),
            tfidf_vocabulary_size: features.tfidf.n_terms(),
            count_vocabulary_size: features.counts.n_terms(),
            explained_variance_ratio: reduced.svd.explained_variance_ratio()?.clone(),
            candidates: selection.candidates.clone(),
            best_k,
            scores: selection.scores,
            assignments: selection.assignments.clone(),
            contingency,
            centroid_terms,
            word_clouds,
            topics: topics.topics,
            topic_quality: topics.quality,
            perplexity: topics.perplexity,
            projection,
            projection_groups,
            bar_width: config.report.bar_width,
            plot_size: (config.projection.width, config.projection.height),
        })
    }

    /// Number of documents assigned to each cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.contingency.sum_axis(ndarray::Axis(0)).to_vec()
    }
}

/// Top `n` terms by descending weight; ties keep vocabulary order
fn top_weighted_terms(weights: ArrayView1<f64>, terms: &[String], n: usize) -> Vec<(String, f64)> {
    let mut order: Vec<usize> = (0..weights.len().min(terms.len())).collect();
    order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]).then(a.cmp(&b)));
    order
        .into_iter()
        .take(n)
        .map(|i| (terms[i].clone(), weights[i]))
        .collect()
}

/// Token frequencies of each cluster's concatenated cleaned text
fn cluster_word_counts(
    cleaned: &[String],
    assignments: &[usize],
    k: usize,
    n: usize,
) -> Vec<Vec<(String, usize)>> {
    let mut counts: Vec<HashMap<&str, usize>> = vec![HashMap::new(); k];
    for (text, &cluster) in cleaned.iter().zip(assignments.iter()) {
        for token in text.split_whitespace() {
            *counts[cluster].entry(token).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|cluster| {
            let mut words: Vec<(String, usize)> = cluster
                .into_iter()
                .map(|(word, count)| (word.to_string(), count))
                .collect();
            words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            words.truncate(n);
            words
        })
        .collect()
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "-".repeat(title.chars().count()))
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Corpus Analysis Report")?;
        writeln!(f, "======================")?;
        writeln!(
            f,
            "{} documents in {} categories: {}",
            self.n_documents,
            self.label_names.len(),
            self.label_names.join(", ")
        )?;
        writeln!(
            f,
            "Vocabulary: {} TF-IDF terms, {} count terms",
            self.tfidf_vocabulary_size, self.count_vocabulary_size
        )?;

        section(f, "Explained variance")?;
        write!(f, "{}", render_variance_plot(&self.explained_variance_ratio, VARIANCE_ROWS))?;

        section(f, "Cluster count sweep")?;
        writeln!(
            f,
            "{:>4} {:>12} {:>12} {:>10} {:>8} {:>12}",
            "k", "homogeneity", "completeness", "v-measure", "ARI", "inertia"
        )?;
        for c in &self.candidates {
            let marker = if c.k == self.best_k { " *" } else { "" };
            writeln!(
                f,
                "{:>4} {:>12.4} {:>12.4} {:>10.4} {:>8.4} {:>12.4}{}",
                c.k,
                c.scores.homogeneity,
                c.scores.completeness,
                c.scores.v_measure,
                c.scores.adjusted_rand,
                c.inertia,
                marker
            )?;
        }
        writeln!(
            f,
            "Selected k = {} (homogeneity {:.4}, completeness {:.4}, V-measure {:.4}, ARI {:.4})",
            self.best_k,
            self.scores.homogeneity,
            self.scores.completeness,
            self.scores.v_measure,
            self.scores.adjusted_rand
        )?;

        section(f, "Label x cluster contingency")?;
        let cells = self.contingency.mapv(|c| c as f64);
        let cols: Vec<String> = (0..self.best_k).map(|k| k.to_string()).collect();
        write!(f, "{}", render_heatmap(&cells, &self.label_names, &cols))?;

        section(f, "Cluster centroid terms")?;
        for (k, terms) in self.centroid_terms.iter().enumerate() {
            let words: Vec<&str> = terms.iter().map(|(t, _)| t.as_str()).collect();
            writeln!(f, "Cluster {:>2} [{}]: {}", k, glyph(k), words.join(", "))?;
        }

        section(f, "Cluster word clouds")?;
        for (k, cloud) in self.word_clouds.iter().enumerate() {
            let labels: Vec<String> = cloud.iter().map(|(w, _)| w.clone()).collect();
            let values: Vec<f64> = cloud.iter().map(|&(_, c)| c as f64).collect();
            let title = format!("Cluster {}", k);
            write!(f, "{}", render_bar_chart(&labels, &values, self.bar_width, &title))?;
            writeln!(f)?;
        }

        section(f, "Topics")?;
        for topic in &self.topics {
            writeln!(f, "{}", topic)?;
        }
        let coherence = self
            .topic_quality
            .avg_coherence
            .map_or_else(|| "n/a".to_string(), |c| format!("{:.4}", c));
        writeln!(
            f,
            "Perplexity {:.2}, UMass coherence {}, diversity {:.3}",
            self.perplexity, coherence, self.topic_quality.diversity
        )?;

        if let Some(projection) = &self.projection {
            section(f, "t-SNE projection")?;
            let (width, height) = self.plot_size;
            write!(
                f,
                "{}",
                render_scatter(&projection.embedding, &self.projection_groups, width, height)
            )?;
        }
        Ok(())
    }
}
