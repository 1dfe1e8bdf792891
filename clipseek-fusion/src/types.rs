//! Core types for search requests, fused candidates and ranked results.

use serde::{Deserialize, Serialize};

use crate::config::FusionConfig;
use crate::error::FusionError;

/// Opaque identifier of one corpus image.
pub type Handle = u64;

/// One expanded form of the user's query, carrying its fusion weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryVariant {
    /// Text sent to the encoder.
    pub text: String,
    /// Fusion weight in `(0, 1]`. The primary query always has 1.0.
    pub weight: f64,
}

/// One neighbour returned by the vector index for one variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCandidate {
    /// Corpus handle resolved from the index position.
    pub handle: Handle,
    /// Similarity score as reported by the index.
    pub raw_score: f32,
    /// 0-based position within this variant's result list.
    pub local_rank: usize,
}

/// A fused candidate that cleared the threshold, before ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    /// Corpus handle.
    pub handle: Handle,
    /// Final path segment of `image_path`.
    pub filename: String,
    /// Corpus path of the image.
    pub image_path: String,
    /// Weighted max/mean blend times the multi-match bonus.
    pub composite_score: f64,
    /// Number of variants that retrieved this handle.
    pub match_count: usize,
}

/// A ranked search result as handed to callers.
///
/// The serialized field names are the public wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// 1-based dense rank.
    pub rank: usize,
    /// Corpus handle. Not part of the wire contract.
    #[serde(skip)]
    pub handle: Handle,
    /// Final path segment of `image_path`.
    pub filename: String,
    /// Corpus path of the image.
    pub image_path: String,
    /// Composite score (higher is better).
    #[serde(rename = "similarity_score")]
    pub composite_score: f64,
    /// `composite_score * 100` with one decimal and a trailing `%`.
    pub confidence_percentage: String,
    /// Number of variants that retrieved this image.
    #[serde(rename = "num_query_matches")]
    pub match_count: usize,
}

fn default_top_k() -> usize {
    FusionConfig::default().default_top_k
}

fn default_threshold() -> f64 {
    FusionConfig::default().default_threshold
}

fn default_use_enhancement() -> bool {
    true
}

/// Parameters of one search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Natural-language query.
    pub query: String,
    /// Number of results to return.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Inclusive lower bound on the composite score.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Whether to expand the query into several variants.
    #[serde(default = "default_use_enhancement")]
    pub use_enhancement: bool,
}

impl SearchRequest {
    /// Build a request for `query` with default parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: default_top_k(),
            threshold: default_threshold(),
            use_enhancement: default_use_enhancement(),
        }
    }

    /// Set the number of results to return.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the score threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Enable or disable query enhancement.
    #[must_use]
    pub fn with_enhancement(mut self, enabled: bool) -> Self {
        self.use_enhancement = enabled;
        self
    }

    /// Reject requests outside the bounds in `config` before any collaborator
    /// is called.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidInput`] when the query is blank or longer
    /// than `max_query_chars`, `top_k` is outside `1..=max_top_k`, or
    /// `threshold` is outside `[0, 1]`. A query made only of whitespace counts
    /// as blank, even though it is one character or longer.
    pub fn validate(&self, config: &FusionConfig) -> Result<(), FusionError> {
        if self.query.trim().is_empty() {
            return Err(FusionError::InvalidInput(
                "query must not be empty or whitespace only".into(),
            ));
        }
        let chars = self.query.chars().count();
        if chars > config.max_query_chars {
            return Err(FusionError::InvalidInput(format!(
                "query is {chars} characters, maximum is {}",
                config.max_query_chars
            )));
        }
        if self.top_k == 0 || self.top_k > config.max_top_k {
            return Err(FusionError::InvalidInput(format!(
                "top_k must be between 1 and {}",
                config.max_top_k
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(FusionError::InvalidInput(
                "threshold must be between 0.0 and 1.0".into(),
            ));
        }
        Ok(())
    }
}

/// Everything one search call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Ranked results, best first.
    pub results: Vec<RankedResult>,
    /// Wall-clock time from enhancement to assembly, in milliseconds.
    pub elapsed_ms: f64,
    /// The variants that were dispatched, in weight order.
    pub variants: Vec<QueryVariant>,
    /// Status of the backend snapshot that produced `results`.
    pub status: BackendStatus,
}

/// Descriptive state of a loaded backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Device the encoder runs on.
    pub device: String,
    /// Encoder model name.
    pub model: String,
    /// Number of vectors held by the index.
    pub vectors_indexed: usize,
    /// Embedding dimension.
    pub embedding_dim: usize,
    /// Number of images with a known path.
    pub total_images: usize,
    /// Index implementation name.
    pub index_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked() -> RankedResult {
        RankedResult {
            rank: 1,
            handle: 42,
            filename: "img_00042.jpg".into(),
            image_path: "/data/images/img_00042.jpg".into(),
            composite_score: 0.4235,
            confidence_percentage: "42.4%".into(),
            match_count: 2,
        }
    }

    #[test]
    fn ranked_result_uses_wire_field_names() {
        let json = serde_json::to_value(ranked()).expect("serialize");
        assert_eq!(json["rank"], 1);
        assert_eq!(json["filename"], "img_00042.jpg");
        assert_eq!(json["image_path"], "/data/images/img_00042.jpg");
        assert_eq!(json["confidence_percentage"], "42.4%");
        assert_eq!(json["num_query_matches"], 2);
        assert!((json["similarity_score"].as_f64().expect("f64") - 0.4235).abs() < 1e-12);
        assert!(json.get("handle").is_none());
    }

    #[test]
    fn request_defaults_fill_missing_fields() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"query": "horse"}"#).expect("deserialize");
        assert_eq!(request.query, "horse");
        assert_eq!(request.top_k, 5);
        assert!((request.threshold - 0.2).abs() < f64::EPSILON);
        assert!(request.use_enhancement);
    }

    #[test]
    fn builder_overrides_defaults() {
        let request = SearchRequest::new("cat")
            .with_top_k(3)
            .with_threshold(0.0)
            .with_enhancement(false);
        assert_eq!(request.top_k, 3);
        assert!(request.threshold.abs() < f64::EPSILON);
        assert!(!request.use_enhancement);
    }

    #[test]
    fn valid_request_passes() {
        let config = FusionConfig::default();
        assert!(SearchRequest::new("a red car").validate(&config).is_ok());
        assert!(SearchRequest::new("x")
            .with_top_k(20)
            .with_threshold(1.0)
            .validate(&config)
            .is_ok());
    }

    #[test]
    fn blank_query_rejected() {
        let config = FusionConfig::default();
        let err = SearchRequest::new("   ").validate(&config).unwrap_err();
        assert!(matches!(err, FusionError::InvalidInput(_)));
        assert!(err.to_string().contains("whitespace only"));

        for query in ["\t", "\n \n", "\u{3000}"] {
            assert!(SearchRequest::new(query).validate(&config).is_err());
        }
        assert!(SearchRequest::new(" x ").validate(&config).is_ok());
    }

    #[test]
    fn overlong_query_rejected_by_characters() {
        let config = FusionConfig::default();
        assert!(SearchRequest::new("é".repeat(500)).validate(&config).is_ok());
        let err = SearchRequest::new("é".repeat(501))
            .validate(&config)
            .unwrap_err();
        assert!(err.to_string().contains("501"));
    }

    #[test]
    fn top_k_bounds_enforced() {
        let config = FusionConfig::default();
        assert!(SearchRequest::new("dog").with_top_k(0).validate(&config).is_err());
        assert!(SearchRequest::new("dog").with_top_k(21).validate(&config).is_err());
    }

    #[test]
    fn threshold_bounds_enforced() {
        let config = FusionConfig::default();
        for bad in [-0.01, 1.01, f64::NAN] {
            let err = SearchRequest::new("dog")
                .with_threshold(bad)
                .validate(&config)
                .unwrap_err();
            assert!(err.to_string().contains("threshold"));
        }
    }
}
