//! The similarity metric abstraction and metric combinators.

use crate::models::media::MediaItem;
use std::sync::Arc;

/// A similarity measure between two media items.
///
/// A score of `1` or more means certainty, `0` means no evidence
/// (including a type mismatch between the two items), and negative
/// scores are penalties. A few metrics score beyond `1` on purpose so
/// certain matches outrank every fuzzy signal. Implementations are
/// total and never fail.
pub trait SimilarityMetric: Send + Sync {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32;
}

/// Combines sub-metrics into one score.
///
/// Sub-metrics run in order; a score of `1` short-circuits, otherwise
/// the score with the largest magnitude wins, so a strong penalty beats
/// a weak positive signal.
pub struct MetricCascade {
    metrics: Vec<Arc<dyn SimilarityMetric>>,
}

impl MetricCascade {
    pub fn new(metrics: Vec<Arc<dyn SimilarityMetric>>) -> Self {
        Self { metrics }
    }
}

impl SimilarityMetric for MetricCascade {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        let mut best = 0.0f32;
        for metric in &self.metrics {
            let score = metric.similarity(a, b);
            if score >= 1.0 {
                return score;
            }
            if score.abs() > best.abs() {
                best = score;
            }
        }
        best
    }
}
