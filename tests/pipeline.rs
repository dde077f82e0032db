//! Integration tests for the corpus analysis pipeline

use std::collections::HashSet;
use std::fs;
use topic_clustering::models::ClusterError;
use topic_clustering::pipeline::{normalize, reduce, select_clusters, vectorize};
use topic_clustering::preprocessing::Tokenizer;
use topic_clustering::{AnalysisConfig, Corpus, Document, Pipeline, PipelineError};

/// Small reduced rank and no projection keep the sweeps fast
fn fast_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.reduction.n_components = 10;
    config.projection.enabled = false;
    config
}

/// Two documents per label, each label with its own vocabulary
fn twin_corpus() -> Corpus {
    let docs = vec![
        Document::new("Rockets orbit the planets.", 0),
        Document::new("A rocket orbits a planet!", 0),
        Document::new("The goalie stops pucks.", 1),
        Document::new("Goalie stop puck", 1),
    ];
    Corpus::new(docs, vec!["space".to_string(), "hockey".to_string()]).unwrap()
}

mod selection {
    use super::*;

    #[test]
    fn test_twin_vocabularies_recover_labels() {
        let report = Pipeline::new(fast_config()).run(twin_corpus()).unwrap();

        assert_eq!(report.best_k, 2);
        assert!((report.scores.homogeneity - 1.0).abs() < 1e-9);
        assert!((report.scores.completeness - 1.0).abs() < 1e-9);
        assert!((report.scores.v_measure - 1.0).abs() < 1e-9);
        assert_eq!(report.assignments[0], report.assignments[1]);
        assert_eq!(report.assignments[2], report.assignments[3]);
        assert_ne!(report.assignments[0], report.assignments[2]);
    }

    #[test]
    fn test_candidates_beyond_document_count_are_skipped() {
        let report = Pipeline::new(fast_config()).run(twin_corpus()).unwrap();
        let ks: Vec<usize> = report.candidates.iter().map(|c| c.k).collect();
        assert_eq!(ks, vec![2, 3, 4]);
    }

    #[test]
    fn test_single_document_fails_sweep() {
        let corpus =
            Corpus::new(vec![Document::new("rockets orbit planets", 0)], vec!["space".to_string()])
                .unwrap();
        let config = fast_config();

        let normalized = normalize(corpus.clone(), &Tokenizer::new());
        let features = vectorize(&normalized, &config.vectorizer).unwrap();
        assert_eq!(features.tfidf.shape(), (1, 0));
        assert_eq!(features.counts.shape(), (1, 0));

        let reduced = reduce(&features, &config.reduction, config.seed).unwrap();
        assert_eq!(reduced.matrix.dim(), (1, 10));

        let labels = normalized.corpus.labels();
        let err = select_clusters(&reduced, &labels, &config.clustering, config.seed).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Cluster(ClusterError::TooFewDocuments { n_documents: 1 })
        ));

        let err = Pipeline::new(config).run(corpus).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Cluster(ClusterError::TooFewDocuments { .. })
        ));
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let pipeline = Pipeline::new(fast_config());
        let first = pipeline.run(Corpus::sample().shuffled(7)).unwrap();
        let second = pipeline.run(Corpus::sample().shuffled(7)).unwrap();

        assert_eq!(first.best_k, second.best_k);
        assert_eq!(first.candidates, second.candidates);
        assert_eq!(first.assignments, second.assignments);
    }

    #[test]
    fn test_cluster_ids_are_contiguous() {
        let report = Pipeline::new(fast_config()).run(Corpus::sample()).unwrap();

        assert!(report.assignments.iter().all(|&c| c < report.best_k));
        let used: HashSet<usize> = report.assignments.iter().copied().collect();
        assert_eq!(used.len(), report.best_k);
        assert!(report.cluster_sizes().iter().all(|&n| n > 0));
        assert_eq!(report.cluster_sizes().iter().sum::<usize>(), report.n_documents);
    }
}

mod features {
    use super::*;

    #[test]
    fn test_vocabulary_respects_cap() {
        let mut config = fast_config();
        config.vectorizer.tfidf.max_features = 12;
        config.vectorizer.count.max_features = 8;

        let normalized = normalize(Corpus::sample(), &Tokenizer::new());
        let features = vectorize(&normalized, &config.vectorizer).unwrap();

        assert!(features.tfidf.n_terms() <= 12);
        assert!(features.counts.n_terms() <= 8);
        assert_eq!(features.tfidf.n_documents(), Corpus::sample().len());
    }

    #[test]
    fn test_reduced_rows_are_unit_norm() {
        let config = fast_config();
        let normalized = normalize(Corpus::sample(), &Tokenizer::new());
        let features = vectorize(&normalized, &config.vectorizer).unwrap();
        let reduced = reduce(&features, &config.reduction, config.seed).unwrap();

        assert_eq!(reduced.matrix.dim(), (Corpus::sample().len(), 10));
        for row in reduced.matrix.rows() {
            let norm = row.dot(&row).sqrt();
            assert!((norm - 1.0).abs() < 1e-6, "row norm {}", norm);
        }
    }

    #[test]
    fn test_normalizer_is_idempotent() {
        let tokenizer = Tokenizer::new();
        let normalized = normalize(Corpus::sample(), &tokenizer);
        for cleaned in &normalized.cleaned {
            assert_eq!(&tokenizer.normalize(cleaned), cleaned);
        }
        assert_eq!(tokenizer.normalize("  \t\n "), "");
    }
}

mod report {
    use super::*;

    #[test]
    fn test_centroid_terms_come_from_tfidf_vocabulary() {
        let config = fast_config();
        let corpus = Corpus::sample();
        let normalized = normalize(corpus.clone(), &Tokenizer::new());
        let features = vectorize(&normalized, &config.vectorizer).unwrap();
        let vocabulary: HashSet<&str> =
            features.tfidf.vocabulary.terms().iter().map(String::as_str).collect();

        let report = Pipeline::new(config).run(corpus).unwrap();
        assert_eq!(report.centroid_terms.len(), report.best_k);
        for terms in &report.centroid_terms {
            assert!(terms.len() <= 15);
            assert!(terms.iter().all(|(t, _)| vocabulary.contains(t.as_str())));
        }
    }

    #[test]
    fn test_contingency_matches_assignments() {
        let report = Pipeline::new(fast_config()).run(twin_corpus()).unwrap();
        assert_eq!(report.contingency.dim(), (2, 2));
        assert_eq!(report.contingency.sum(), 4);
        for row in report.contingency.rows() {
            assert_eq!(row.iter().filter(|&&c| c > 0).count(), 1);
        }
    }

    #[test]
    fn test_sample_corpus_end_to_end() {
        let mut config = fast_config();
        config.projection.enabled = true;
        config.projection.n_iter = 300;

        let report = Pipeline::new(config).run(Corpus::sample()).unwrap();

        assert_eq!(report.n_documents, 32);
        assert_eq!(report.topics.len(), 4);
        assert!(report.perplexity.is_finite());
        let projection = report.projection.as_ref().unwrap();
        assert_eq!(projection.embedding.dim(), (32, 2));
        assert_eq!(report.projection_groups.len(), 32);

        let text = report.to_string();
        assert!(text.contains("Selected k"));
        assert!(text.contains("Label x cluster contingency"));
        assert!(text.contains("t-SNE projection"));
    }
}

mod loading {
    use super::*;

    #[test]
    fn test_pipeline_loads_directory_corpus() {
        let dir = tempfile::tempdir().unwrap();
        for (category, texts) in [
            ("sci.space", ["rockets orbit planets", "rocket orbits planet"]),
            ("rec.sport.hockey", ["goalie stops pucks", "goalie stop puck"]),
        ] {
            let path = dir.path().join(category);
            fs::create_dir(&path).unwrap();
            for (i, text) in texts.iter().enumerate() {
                fs::write(path.join(format!("{}.txt", i)), text).unwrap();
            }
        }

        let mut config = fast_config();
        config.corpus.directory = Some(dir.path().to_path_buf());
        config.corpus.shuffle = false;
        let pipeline = Pipeline::new(config);

        let corpus = pipeline.load_corpus().unwrap();
        assert_eq!(corpus.len(), 4);
        assert_eq!(corpus.label_names(), &["rec.sport.hockey", "sci.space"]);

        let report = pipeline.run(corpus).unwrap();
        assert_eq!(report.best_k, 2);
    }

    #[test]
    fn test_pipeline_loads_json_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        fs::write(&path, twin_corpus().to_json().unwrap()).unwrap();

        let mut config = fast_config();
        config.corpus.dataset = Some(path);
        let corpus = Pipeline::new(config).load_corpus().unwrap();
        assert_eq!(corpus.len(), 4);
        assert_eq!(corpus.n_labels(), 2);
    }
}
