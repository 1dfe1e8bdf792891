//! Fusion configuration with the engine's fixed defaults.
//!
//! [`FusionConfig`] holds the weight-decay, over-fetch and match-bonus
//! constants together with the request bounds enforced at the boundary.
//! The defaults reproduce the reference ranking exactly; change them only
//! when behaviour parity is not required.

use serde::{Deserialize, Serialize};

use crate::error::FusionError;

/// Configuration for the rank fusion engine.
///
/// Use [`Default::default()`] for the standard constants, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Weight lost per variant position: `weight_i = 1.0 - i * weight_decay`.
    pub weight_decay: f64,
    /// Maximum number of variants produced by the enhancer.
    pub max_variants: usize,
    /// Each variant asks the index for `top_k * overfetch_factor` neighbours.
    pub overfetch_factor: usize,
    /// Bonus per additional variant that retrieved the same handle.
    pub match_bonus: f64,
    /// Share of the composite score taken from the best weighted score.
    /// The remaining `1 - max_score_weight` comes from the mean.
    pub max_score_weight: f64,
    /// Longest accepted query, in characters.
    pub max_query_chars: usize,
    /// Largest accepted `top_k`.
    pub max_top_k: usize,
    /// `top_k` used when a request omits it.
    pub default_top_k: usize,
    /// `threshold` used when a request omits it.
    pub default_threshold: f64,
    /// Number of variant embeddings kept by [`crate::CachedEncoder`].
    pub embedding_cache_capacity: u64,
    /// How long a cached embedding stays valid. Set to 0 to disable caching.
    pub embedding_cache_ttl_seconds: u64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weight_decay: 0.15,
            max_variants: 3,
            overfetch_factor: 3,
            match_bonus: 0.1,
            max_score_weight: 0.7,
            max_query_chars: 500,
            max_top_k: 20,
            default_top_k: 5,
            default_threshold: 0.2,
            embedding_cache_capacity: 1024,
            embedding_cache_ttl_seconds: 600,
        }
    }
}

impl FusionConfig {
    /// Weight of the mean weighted score in the composite.
    pub fn avg_score_weight(&self) -> f64 {
        1.0 - self.max_score_weight
    }

    /// Fusion weight for the variant at `position` in the enhancer output.
    pub fn variant_weight(&self, position: usize) -> f64 {
        1.0 - position as f64 * self.weight_decay
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_variants`, `overfetch_factor`, `max_query_chars` and `max_top_k` must be > 0
    /// - every variant weight must stay within `(0, 1]`
    /// - `match_bonus` must be >= 0
    /// - `max_score_weight` must be within `[0, 1]`
    /// - defaults must themselves be valid request values
    pub fn validate(&self) -> Result<(), FusionError> {
        if self.max_variants == 0 {
            return Err(FusionError::Config(
                "max_variants must be greater than 0".into(),
            ));
        }
        if self.overfetch_factor == 0 {
            return Err(FusionError::Config(
                "overfetch_factor must be greater than 0".into(),
            ));
        }
        if self.max_query_chars == 0 {
            return Err(FusionError::Config(
                "max_query_chars must be greater than 0".into(),
            ));
        }
        if self.max_top_k == 0 {
            return Err(FusionError::Config(
                "max_top_k must be greater than 0".into(),
            ));
        }
        if !(self.weight_decay >= 0.0 && self.variant_weight(self.max_variants - 1) > 0.0) {
            return Err(FusionError::Config(
                "weight_decay must keep every variant weight above 0".into(),
            ));
        }
        if !(self.match_bonus >= 0.0) {
            return Err(FusionError::Config("match_bonus must be >= 0".into()));
        }
        if !(0.0..=1.0).contains(&self.max_score_weight) {
            return Err(FusionError::Config(
                "max_score_weight must be within [0, 1]".into(),
            ));
        }
        if self.default_top_k == 0 || self.default_top_k > self.max_top_k {
            return Err(FusionError::Config(
                "default_top_k must be between 1 and max_top_k".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.default_threshold) {
            return Err(FusionError::Config(
                "default_threshold must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}
