//! Rank fusion across query variants.
//!
//! Folds every variant's raw candidates into one call-scoped map keyed by
//! handle, then scores each handle as
//!
//! ```text
//! composite = (max * max_score_weight + mean * (1 - max_score_weight)) * bonus
//! bonus     = 1.0 + (match_count - 1) * match_bonus
//! ```
//!
//! over the weighted scores `raw_score * variant_weight` it collected.
//! With the default constants that is `(0.7 * max + 0.3 * mean) * (1 + 0.1 * extra)`.

use std::collections::HashMap;

use crate::config::FusionConfig;
use crate::index::Corpus;
use crate::types::{Handle, RawCandidate, ScoredResult};

/// Everything one handle collected during a single search call.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedCandidate {
    /// `raw_score * weight` for every variant that returned the handle.
    pub weighted_scores: Vec<f64>,
    /// Raw score of the first sighting.
    pub original_score: f32,
    /// Local ranks, parallel to `weighted_scores`.
    pub local_ranks: Vec<usize>,
}

impl AccumulatedCandidate {
    /// Number of variants that retrieved this handle.
    pub fn match_count(&self) -> usize {
        self.weighted_scores.len()
    }

    /// Composite score under `config`.
    pub fn composite_score(&self, config: &FusionConfig) -> f64 {
        composite_score(&self.weighted_scores, config)
    }
}

/// Blend `weighted_scores` into a composite score.
///
/// Returns 0.0 for an empty slice.
pub fn composite_score(weighted_scores: &[f64], config: &FusionConfig) -> f64 {
    if weighted_scores.is_empty() {
        return 0.0;
    }
    let max = weighted_scores
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let mean = weighted_scores.iter().sum::<f64>() / weighted_scores.len() as f64;
    let bonus = 1.0 + (weighted_scores.len() - 1) as f64 * config.match_bonus;
    (max * config.max_score_weight + mean * config.avg_score_weight()) * bonus
}

/// Call-scoped accumulation map that remembers first-insertion order.
#[derive(Debug, Default)]
pub struct Accumulator {
    slots: HashMap<Handle, usize>,
    entries: Vec<(Handle, AccumulatedCandidate)>,
}

impl Accumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one variant's candidates in at `weight`.
    pub fn add_variant(&mut self, weight: f64, candidates: &[RawCandidate]) {
        for candidate in candidates {
            let weighted = f64::from(candidate.raw_score) * weight;
            match self.slots.get(&candidate.handle) {
                Some(&slot) => {
                    let entry = &mut self.entries[slot].1;
                    entry.weighted_scores.push(weighted);
                    entry.local_ranks.push(candidate.local_rank);
                }
                None => {
                    self.slots.insert(candidate.handle, self.entries.len());
                    self.entries.push((
                        candidate.handle,
                        AccumulatedCandidate {
                            weighted_scores: vec![weighted],
                            original_score: candidate.raw_score,
                            local_ranks: vec![candidate.local_rank],
                        },
                    ));
                }
            }
        }
    }

    /// Number of distinct handles seen so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the accumulated state of `handle`.
    pub fn get(&self, handle: Handle) -> Option<&AccumulatedCandidate> {
        self.slots.get(&handle).map(|&slot| &self.entries[slot].1)
    }

    /// Score every handle, keep those with `composite >= threshold`, and
    /// attach corpus paths. Output is in first-insertion order.
    pub fn finish<C: Corpus + ?Sized>(
        self,
        threshold: f64,
        corpus: &C,
        config: &FusionConfig,
    ) -> Vec<ScoredResult> {
        self.entries
            .into_iter()
            .filter_map(|(handle, candidate)| {
                let composite_score = candidate.composite_score(config);
                (composite_score >= threshold).then(|| {
                    let (filename, image_path) = display_paths(handle, corpus);
                    ScoredResult {
                        handle,
                        filename,
                        image_path,
                        composite_score,
                        match_count: candidate.match_count(),
                    }
                })
            })
            .collect()
    }
}

/// Fuse per-variant results given as `(weight, candidates)` pairs.
pub fn aggregate<C: Corpus + ?Sized>(
    per_variant: &[(f64, Vec<RawCandidate>)],
    threshold: f64,
    corpus: &C,
    config: &FusionConfig,
) -> Vec<ScoredResult> {
    let mut accumulator = Accumulator::new();
    for (weight, candidates) in per_variant {
        accumulator.add_variant(*weight, candidates);
    }
    accumulator.finish(threshold, corpus, config)
}

/// `(filename, image_path)` for `handle`, falling back to `img_NNNNN.jpg`
/// when the corpus has no path.
fn display_paths<C: Corpus + ?Sized>(handle: Handle, corpus: &C) -> (String, String) {
    match corpus.path_of(handle) {
        Some(path) => {
            let filename = std::path::Path::new(path)
                .file_name()
                .map_or_else(|| path.to_owned(), |n| n.to_string_lossy().into_owned());
            (filename, path.to_owned())
        }
        None => {
            let fallback = format!("img_{handle:05}.jpg");
            (fallback.clone(), fallback)
        }
    }
}
