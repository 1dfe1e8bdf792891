//! # clipseek-fusion
//!
//! Multi-query rank fusion for natural-language search over a corpus of
//! pre-embedded images.
//!
//! One user query is expanded into up to three weighted variants. Every
//! variant is encoded and searched against a vector index concurrently, the
//! overlapping candidate lists are fused per image handle, and a single
//! deterministic, threshold-filtered, ranked list comes back.
//!
//! ## Design
//!
//! - The text encoder, vector index and corpus are collaborators behind
//!   [`TextEncoder`], [`VectorIndex`] and [`Corpus`]
//! - Variants are dispatched concurrently; a failing variant contributes
//!   nothing and only a total failure is reported
//! - Composite score: `(0.7 * max + 0.3 * mean) * (1 + 0.1 * extra_matches)`
//!   over `raw_score * variant_weight`
//! - Ties keep first-accumulated order, so identical calls rank identically
//! - The loaded backend lives behind a [`SnapshotHandle`]; reloads swap the
//!   whole reference and never disturb in-flight searches

pub mod backend;
pub mod cache;
pub mod config;
pub mod encoder;
pub mod enhancer;
pub mod error;
pub mod index;
pub mod orchestrator;
pub mod snapshot;
pub mod types;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use backend::{Backend, SearchBackend};
pub use cache::CachedEncoder;
pub use config::FusionConfig;
pub use encoder::TextEncoder;
pub use enhancer::QueryEnhancer;
pub use error::{ErrorKind, FusionError, Result};
pub use index::{Corpus, FlatIndex, ImageCorpus, VectorIndex};
pub use snapshot::SnapshotHandle;
pub use types::{
    BackendStatus, Handle, QueryVariant, RankedResult, RawCandidate, ScoredResult, SearchOutcome,
    SearchRequest,
};

/// Run one search against whatever backend `snapshot` currently holds.
///
/// # Errors
///
/// Returns [`FusionError::Config`] if `config` is invalid,
/// [`FusionError::InvalidInput`] if the request is out of bounds (checked
/// before readiness), [`FusionError::NotReady`] if no backend is installed,
/// and otherwise the
/// errors of [`orchestrator::search::orchestrate_search`].
///
/// # Examples
///
/// ```no_run
/// # async fn example<B: clipseek_fusion::Backend>(
/// #     snapshot: &clipseek_fusion::SnapshotHandle<B>,
/// # ) -> clipseek_fusion::Result<()> {
/// let config = clipseek_fusion::FusionConfig::default();
/// let request = clipseek_fusion::SearchRequest::new("sunset");
/// let outcome = clipseek_fusion::search(snapshot, &request, &config).await?;
/// for result in &outcome.results {
///     println!("{} {} {}", result.rank, result.filename, result.confidence_percentage);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search<B: Backend>(
    snapshot: &SnapshotHandle<B>,
    request: &SearchRequest,
    config: &FusionConfig,
) -> Result<SearchOutcome> {
    config.validate()?;
    request.validate(config)?;
    let backend = snapshot
        .current()
        .ok_or_else(|| FusionError::NotReady("no index loaded".into()))?;
    orchestrator::search::orchestrate_search(
        &backend,
        &QueryEnhancer::new(config),
        request,
        config,
    )
    .await
}

/// A configured fusion engine bound to a swappable backend.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct FusionEngine<B> {
    snapshot: Arc<SnapshotHandle<B>>,
    enhancer: QueryEnhancer,
    config: FusionConfig,
}

impl<B: Backend> FusionEngine<B> {
    /// Engine with no backend installed yet.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`] if `config` is invalid.
    pub fn new(config: FusionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            snapshot: Arc::new(SnapshotHandle::empty()),
            enhancer: QueryEnhancer::new(&config),
            config,
        })
    }

    /// Replace the built-in expansion table.
    #[must_use]
    pub fn with_enhancer(mut self, enhancer: QueryEnhancer) -> Self {
        self.enhancer = enhancer;
        self
    }

    /// The engine configuration.
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// The shared backend slot.
    pub fn snapshot(&self) -> &Arc<SnapshotHandle<B>> {
        &self.snapshot
    }

    /// Install a new backend, returning the previous one.
    pub fn install(&self, backend: Arc<B>) -> Option<Arc<B>> {
        self.snapshot.install(backend)
    }

    /// Whether a backend is installed.
    pub fn is_ready(&self) -> bool {
        self.snapshot.is_ready()
    }

    /// Status of the installed backend, if any.
    pub fn status(&self) -> Option<BackendStatus> {
        self.snapshot.current().map(|b| b.status())
    }

    /// The variants a request would be expanded into.
    pub fn enhance(&self, request: &SearchRequest) -> Vec<QueryVariant> {
        self.enhancer
            .enhance(&request.query, request.use_enhancement)
    }

    /// Run one search call.
    ///
    /// # Errors
    ///
    /// See [`search`].
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        self.search_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Run one search call; variants still in flight when `cancel` fires
    /// count as failed.
    ///
    /// # Errors
    ///
    /// See [`search`].
    pub async fn search_with_cancel(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome> {
        // Validate before touching the snapshot so bad input never reads as "not ready".
        request.validate(&self.config)?;
        let backend = self
            .snapshot
            .current()
            .ok_or_else(|| FusionError::NotReady("no index loaded".into()))?;
        orchestrator::search::orchestrate_search_with_cancel(
            &backend,
            &self.enhancer,
            request,
            &self.config,
            cancel,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AxisEncoder;

    impl TextEncoder for AxisEncoder {
        async fn encode(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    type TestBackend = SearchBackend<AxisEncoder, FlatIndex, ImageCorpus>;

    fn backend(paths: &[&str]) -> Arc<TestBackend> {
        let index = FlatIndex::from_vectors(2, vec![vec![1.0, 0.0], vec![0.6, 0.8]])
            .expect("build");
        let corpus = ImageCorpus::new(paths.iter().map(|p| (*p).to_owned()).collect());
        Arc::new(SearchBackend::new(AxisEncoder, index, corpus))
    }

    #[tokio::test]
    async fn search_validates_config() {
        let snapshot = SnapshotHandle::new(backend(&["a.jpg", "b.jpg"]));
        let config = FusionConfig {
            max_variants: 0,
            ..Default::default()
        };
        let err = search(&snapshot, &SearchRequest::new("x"), &config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("max_variants"));
    }

    #[tokio::test]
    async fn search_without_backend_is_not_ready() {
        let snapshot: SnapshotHandle<TestBackend> = SnapshotHandle::empty();
        let err = search(&snapshot, &SearchRequest::new("x"), &FusionConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotReady);
    }

    #[tokio::test]
    async fn search_rejects_bad_input_even_when_not_ready() {
        let snapshot: SnapshotHandle<TestBackend> = SnapshotHandle::empty();
        let err = search(
            &snapshot,
            &SearchRequest::new("").with_top_k(0),
            &FusionConfig::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn engine_rejects_bad_input_even_when_not_ready() {
        let engine: FusionEngine<TestBackend> =
            FusionEngine::new(FusionConfig::default()).expect("engine");
        let err = engine
            .search(&SearchRequest::new("x").with_top_k(0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn engine_reads_the_installed_backend() {
        let engine = FusionEngine::new(FusionConfig::default()).expect("engine");
        assert!(!engine.is_ready());
        assert!(engine.status().is_none());

        engine.install(backend(&["/old/a.jpg", "/old/b.jpg"]));
        let request = SearchRequest::new("two words").with_threshold(0.0);
        let before = engine.search(&request).await.expect("search");
        assert_eq!(before.results[0].image_path, "/old/a.jpg");

        engine.install(backend(&["/new/a.jpg", "/new/b.jpg"]));
        let after = engine.search(&request).await.expect("search");
        assert_eq!(after.results[0].image_path, "/new/a.jpg");
        assert_eq!(engine.status().expect("ready").total_images, 2);
    }

    #[test]
    fn engine_enhance_matches_enhancer() {
        let engine: FusionEngine<TestBackend> =
            FusionEngine::new(FusionConfig::default()).expect("engine");
        let variants = engine.enhance(&SearchRequest::new("sunset"));
        assert_eq!(variants.len(), 3);
        let variants = engine.enhance(&SearchRequest::new("sunset").with_enhancement(false));
        assert_eq!(variants.len(), 1);
    }
}
