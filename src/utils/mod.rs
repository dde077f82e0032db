//! Utility functions and data structures
//!
//! This module provides various helpers for:
//! - Configuration loading and saving
//! - Dense / sparse linear algebra
//! - Metrics and evaluation
//! - Visualization helpers

pub mod config;
pub mod evaluation;
pub mod linalg;
pub mod visualization;

pub use config::{load_config, AnalysisConfig, ConfigError};
pub use evaluation::{ClusteringScores, Contingency, Evaluator, TopicQuality};
