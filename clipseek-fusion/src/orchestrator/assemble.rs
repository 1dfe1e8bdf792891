//! Final ordering, truncation and rank assignment.

use crate::types::{RankedResult, ScoredResult};

/// Sort by composite score (descending), keep `top_k`, and assign dense
/// 1-based ranks.
///
/// The sort is stable, so equal scores keep the order in which their
/// handles were first accumulated.
pub fn assemble(mut scored: Vec<ScoredResult>, top_k: usize) -> Vec<RankedResult> {
    scored.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
    scored.truncate(top_k);
    scored
        .into_iter()
        .enumerate()
        .map(|(position, result)| RankedResult {
            rank: position + 1,
            handle: result.handle,
            confidence_percentage: confidence_percentage(result.composite_score),
            filename: result.filename,
            image_path: result.image_path,
            composite_score: result.composite_score,
            match_count: result.match_count,
        })
        .collect()
}

/// `score * 100` to one decimal place with a trailing `%`.
pub fn confidence_percentage(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}
