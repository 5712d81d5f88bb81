use std::cmp::Ordering;

use ragchat_core::config::SimilarityMetric;
use ragchat_core::error::{Error, Result};
use ragchat_core::types::ScoredPassage;

/// Similarity under `metric`, higher is better. Always finite for finite inputs.
pub fn similarity(metric: SimilarityMetric, a: &[f32], b: &[f32]) -> f32 {
    let score = match metric {
        SimilarityMetric::Dot => dot(a, b),
        SimilarityMetric::Cosine => {
            let (na, nb) = (norm(a), norm(b));
            if na == 0.0 || nb == 0.0 { 0.0 } else { (dot(a, b) / (na * nb)).clamp(-1.0, 1.0) }
        }
        SimilarityMetric::Euclidean => {
            -a.iter().zip(b).map(|(x, y)| (f64::from(*x) - f64::from(*y)).powi(2)).sum::<f64>().sqrt()
        }
    };
    score.clamp(f64::from(f32::MIN), f64::from(f32::MAX)) as f32
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum()
}

fn norm(a: &[f32]) -> f64 {
    a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt()
}

/// Check a vector against the index dimensionality and reject NaN/inf components.
pub fn validate_vector(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(Error::DimensionMismatch { expected, actual: vector.len() });
    }
    if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
        return Err(Error::InvalidVector(format!("component {pos} is not finite")));
    }
    Ok(())
}

/// Best score first, ties by ascending document id.
pub fn rank_order(a: &ScoredPassage, b: &ScoredPassage) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.document.id.cmp(&b.document.id))
}

/// Sort, keep `top_k` and assign 1-based ranks.
pub fn finalize(mut passages: Vec<ScoredPassage>, top_k: usize) -> Vec<ScoredPassage> {
    passages.sort_by(rank_order);
    passages.truncate(top_k);
    for (i, p) in passages.iter_mut().enumerate() {
        p.rank = i + 1;
    }
    passages
}
