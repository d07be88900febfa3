use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::RetrievalResult;
use crate::RagError;

/// Distances are compared after quantizing to this resolution, so values that
/// differ only by floating-point noise tie and fall back to id order.
pub const DISTANCE_TIE_EPSILON: f64 = 1e-6;

/// Similarity metric used to rank stored embeddings; lower is closer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity(a, b)`
    #[default]
    Cosine,
    /// L2 distance
    Euclidean,
}

impl DistanceMetric {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        }
    }

    /// Distance between two vectors of equal length
    #[inline]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            Self::Cosine => 1.0 - cosine_similarity(a, b),
            Self::Euclidean => euclidean_distance(a, b),
        }
    }
}

impl fmt::Display for DistanceMetric {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = RagError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            other => Err(RagError::Configuration(format!(
                "unknown distance metric '{}'",
                other
            ))),
        }
    }
}

/// Cosine similarity in `f64`; a zero-norm vector has similarity 0
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (x.mul_add(y, dot), x.mul_add(x, norm_a), y.mul_add(y, norm_b))
        },
    );

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Non-finite distances sort after every real one
fn tie_bucket(distance: f64) -> i64 {
    if distance.is_finite() {
        (distance / DISTANCE_TIE_EPSILON).round() as i64
    } else {
        i64::MAX
    }
}

fn compare(a: &RetrievalResult, b: &RetrievalResult) -> Ordering {
    tie_bucket(a.distance)
        .cmp(&tie_bucket(b.distance))
        .then(a.id.cmp(&b.id))
}

/// Sort results closest first, breaking ties by ascending id, and keep `k`
#[inline]
pub fn rank(mut results: Vec<RetrievalResult>, k: usize) -> Vec<RetrievalResult> {
    results.sort_by(compare);
    results.truncate(k);
    results
}
