//! Similarity gate: turns a store distance into a hit/no-hit decision

use serde::{Deserialize, Serialize};

use crate::domain::embedding::{cosine_similarity, euclidean_distance};

/// Distance metric used by the store and understood by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// Euclidean distance, similarity = 1 / (1 + d)
    #[default]
    L2,
    /// Cosine distance (1 - cos), similarity = 1 - d
    Cosine,
}

impl SimilarityMetric {
    /// Distance between two vectors; smaller is closer
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => euclidean_distance(a, b),
            Self::Cosine => {
                if a.len() != b.len() || a.is_empty() {
                    return f32::INFINITY;
                }
                1.0 - cosine_similarity(a, b)
            }
        }
    }

    /// Similarity in `[0, 1]` for a distance produced by this metric
    pub fn similarity(&self, distance: f32) -> f32 {
        match self {
            Self::L2 => similarity_from_distance(distance),
            Self::Cosine => {
                if distance.is_nan() {
                    return 0.0;
                }
                (1.0 - distance).clamp(0.0, 1.0)
            }
        }
    }
}

/// Convert a non-negative, unbounded distance into a similarity in `(0, 1]`
///
/// Negative distances count as 0 and NaN as infinitely far, so the
/// function is total.
pub fn similarity_from_distance(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }

    1.0 / (1.0 + distance.max(0.0))
}

/// Accepts candidates whose similarity reaches the configured threshold
#[derive(Debug, Clone, Copy)]
pub struct SimilarityGate {
    threshold: f32,
    metric: SimilarityMetric,
}

impl SimilarityGate {
    pub fn new(threshold: f32, metric: SimilarityMetric) -> Self {
        Self { threshold, metric }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn similarity(&self, distance: f32) -> f32 {
        self.metric.similarity(distance)
    }

    pub fn accepts_similarity(&self, similarity: f32) -> bool {
        similarity >= self.threshold
    }

    /// Gate decision for a raw store distance
    pub fn accepts(&self, distance: f32) -> bool {
        self.accepts_similarity(self.similarity(distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: [f32; 7] = [0.0, 0.1, 0.5, 0.9, 0.95, 0.999, 1.0];

    #[test]
    fn test_zero_distance_is_perfect_similarity() {
        assert_eq!(similarity_from_distance(0.0), 1.0);

        for threshold in THRESHOLDS {
            let gate = SimilarityGate::new(threshold, SimilarityMetric::L2);
            assert!(gate.accepts(0.0), "threshold {}", threshold);
        }
    }

    #[test]
    fn test_strictly_decreasing() {
        let distances: Vec<f32> = (0..2000).map(|i| i as f32 * 0.05).collect();

        for pair in distances.windows(2) {
            assert!(
                similarity_from_distance(pair[0]) > similarity_from_distance(pair[1]),
                "{} vs {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_bounded() {
        for d in [0.0, 0.001, 1.0, 10.0, 1e6] {
            let s = similarity_from_distance(d);
            assert!(s > 0.0 && s <= 1.0);
        }
    }

    #[test]
    fn test_known_values() {
        assert!((similarity_from_distance(1.0) - 0.5).abs() < 1e-6);
        assert!((similarity_from_distance(10.0) - 1.0 / 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_far_distance_fails_positive_threshold() {
        for threshold in THRESHOLDS.iter().copied().filter(|t| *t > 0.0) {
            let gate = SimilarityGate::new(threshold, SimilarityMetric::L2);
            assert!(!gate.accepts(1e9));
            assert!(!gate.accepts(f32::INFINITY));
        }
    }

    #[test]
    fn test_zero_threshold_accepts_everything_finite() {
        let gate = SimilarityGate::new(0.0, SimilarityMetric::L2);

        assert!(gate.accepts(1e9));
        assert!(gate.accepts(f32::INFINITY));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(similarity_from_distance(-3.0), 1.0);
        assert_eq!(similarity_from_distance(f32::NAN), 0.0);
        assert_eq!(similarity_from_distance(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_threshold_boundary_inclusive() {
        // distance 1 gives exactly 0.5
        let gate = SimilarityGate::new(0.5, SimilarityMetric::L2);

        assert!(gate.accepts(1.0));
        assert!(!gate.accepts(1.0001));
    }

    #[test]
    fn test_cosine_metric() {
        let metric = SimilarityMetric::Cosine;

        let d = metric.distance(&[1.0, 0.0], &[1.0, 0.0]);
        assert!(d.abs() < 1e-6);
        assert!((metric.similarity(d) - 1.0).abs() < 1e-6);

        let orthogonal = metric.distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((metric.similarity(orthogonal)).abs() < 1e-6);

        assert!(metric.distance(&[1.0], &[1.0, 0.0]).is_infinite());
        assert_eq!(metric.similarity(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_l2_metric_distance() {
        let d = SimilarityMetric::L2.distance(&[0.0, 0.0], &[0.0, 2.0]);
        assert!((d - 2.0).abs() < 1e-6);
    }
}
