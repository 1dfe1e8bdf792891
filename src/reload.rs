//! Building and installing backend snapshots.
//!
//! Where a snapshot comes from (files, object storage, an in-memory build)
//! is up to the embedding application; this module only times the load and
//! swaps the result in atomically.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use clipseek_fusion::{
    Backend, CachedEncoder, Corpus, FusionEngine, SearchBackend, VectorIndex,
};
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::encoder::HttpTextEncoder;
use crate::error::{Result, ServiceError};

/// Produces a fresh backend on demand.
pub trait SnapshotLoader: Send + Sync + 'static {
    /// Backend type this loader builds.
    type Backend: Backend;

    /// Build a complete backend.
    ///
    /// # Errors
    ///
    /// Any error aborts the reload; the currently installed backend stays live.
    fn load(&self) -> impl Future<Output = Result<Self::Backend>> + Send;
}

/// Outcome of a successful reload.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadReport {
    /// Wall-clock load time, rounded to hundredths of a second.
    pub load_time_seconds: f64,
    /// Images in the newly installed corpus.
    pub total_images: usize,
}

/// Load a new backend with `loader` and install it into `engine`.
///
/// Searches already in flight finish against the snapshot they started
/// with.
///
/// # Errors
///
/// Returns [`ServiceError::Reload`] if the loader fails.
pub async fn reload<L: SnapshotLoader>(
    engine: &FusionEngine<L::Backend>,
    loader: &L,
) -> Result<ReloadReport> {
    let started = Instant::now();
    let backend = loader.load().await.map_err(|e| match e {
        ServiceError::Reload(_) => e,
        other => ServiceError::Reload(other.to_string()),
    })?;
    let status = backend.status();
    engine.install(Arc::new(backend));

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!(
        total_images = status.total_images,
        vectors_indexed = status.vectors_indexed,
        load_time_seconds = elapsed,
        "backend snapshot installed"
    );
    Ok(ReloadReport {
        load_time_seconds: (elapsed * 100.0).round() / 100.0,
        total_images: status.total_images,
    })
}

/// Backend whose text encoder is the remote embedding service, memoised.
pub type HttpBackend<I, C> = SearchBackend<CachedEncoder<HttpTextEncoder>, I, C>;

/// Wire an index and corpus to the configured embedding endpoint.
///
/// # Errors
///
/// Returns [`ServiceError::Encoder`] if the HTTP client cannot be built.
pub fn http_backend<I, C>(config: &ServiceConfig, index: I, corpus: C) -> Result<HttpBackend<I, C>>
where
    I: VectorIndex + 'static,
    C: Corpus + 'static,
{
    let encoder = CachedEncoder::new(HttpTextEncoder::new(&config.encoder)?, &config.fusion);
    Ok(SearchBackend::new(encoder, index, corpus)
        .with_model_info(config.encoder.model.as_str(), config.encoder.device.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipseek_fusion::{FlatIndex, FusionConfig, ImageCorpus, TextEncoder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AxisEncoder;

    impl TextEncoder for AxisEncoder {
        async fn encode(&self, _text: &str) -> clipseek_fusion::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    type TestBackend = SearchBackend<AxisEncoder, FlatIndex, ImageCorpus>;

    /// Loader that builds a corpus one image larger on every call.
    struct GrowingLoader {
        calls: AtomicUsize,
    }

    impl SnapshotLoader for GrowingLoader {
        type Backend = TestBackend;

        async fn load(&self) -> Result<TestBackend> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let vectors: Vec<Vec<f32>> = (0..n).map(|i| vec![1.0, i as f32]).collect();
            let index = FlatIndex::from_vectors(2, vectors)?;
            let corpus = ImageCorpus::new((0..n).map(|i| format!("/c/{i}.jpg")).collect());
            Ok(SearchBackend::new(AxisEncoder, index, corpus))
        }
    }

    struct FailingLoader;

    impl SnapshotLoader for FailingLoader {
        type Backend = TestBackend;

        async fn load(&self) -> Result<TestBackend> {
            Err(ServiceError::Io(std::io::Error::other("index file missing")))
        }
    }

    #[tokio::test]
    async fn reload_installs_new_snapshot() {
        let engine = FusionEngine::new(FusionConfig::default()).expect("engine");
        let loader = GrowingLoader {
            calls: AtomicUsize::new(0),
        };

        let first = reload(&engine, &loader).await.expect("reload");
        assert_eq!(first.total_images, 1);
        assert!(first.load_time_seconds >= 0.0);

        let second = reload(&engine, &loader).await.expect("reload");
        assert_eq!(second.total_images, 2);
        assert_eq!(engine.status().expect("ready").total_images, 2);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_snapshot() {
        let engine = FusionEngine::new(FusionConfig::default()).expect("engine");
        let loader = GrowingLoader {
            calls: AtomicUsize::new(0),
        };
        reload(&engine, &loader).await.expect("reload");

        let err = reload(&engine, &FailingLoader).await.unwrap_err();
        assert!(matches!(err, ServiceError::Reload(_)));
        assert!(err.to_string().contains("index file missing"));
        assert_eq!(engine.status().expect("still ready").total_images, 1);
    }

    #[tokio::test]
    async fn http_backend_reports_configured_model() {
        let mut config = ServiceConfig::default();
        config.encoder.model = "ViT-L/14".to_owned();
        config.encoder.device = "cuda".to_owned();
        config.encoder.dimension = 2;

        let index = FlatIndex::from_vectors(2, vec![vec![1.0, 0.0]]).expect("index");
        let backend = http_backend(&config, index, ImageCorpus::new(vec!["a.jpg".into()]))
            .expect("backend");
        let status = backend.status();
        assert_eq!(status.model, "ViT-L/14");
        assert_eq!(status.device, "cuda");
        assert_eq!(backend.encoder().dimension(), 2);
    }
}
