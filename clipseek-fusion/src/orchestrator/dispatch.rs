//! Concurrent per-variant candidate retrieval.
//!
//! Each variant is encoded and searched independently; all variants run
//! concurrently and the slowest one bounds the latency. Encoding overlaps on
//! the calling task, while the synchronous index scan of every variant runs
//! on tokio's blocking pool.
//! A failing or cancelled variant yields an `Err` outcome instead of
//! aborting its siblings.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backend::Backend;
use crate::encoder::TextEncoder;
use crate::error::FusionError;
use crate::index::{VectorIndex, NO_MATCH};
use crate::types::{QueryVariant, RawCandidate};

/// Result of dispatching one variant.
#[derive(Debug)]
pub struct VariantOutcome {
    /// Position of the variant in the enhancer output.
    pub position: usize,
    /// Fusion weight fixed by that position.
    pub weight: f64,
    /// Raw candidates in index order, or why the variant produced none.
    pub result: Result<Vec<RawCandidate>, FusionError>,
}

/// Fan out `variants` to the encoder and index, `k` neighbours each.
///
/// Outcomes come back in variant order regardless of completion order, so
/// weights always follow enhancer positions.
pub async fn dispatch<B: Backend>(
    backend: &Arc<B>,
    variants: &[QueryVariant],
    k: usize,
    cancel: &CancellationToken,
) -> Vec<VariantOutcome> {
    let futures: Vec<_> = variants
        .iter()
        .enumerate()
        .map(|(position, variant)| async move {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(FusionError::Cancelled),
                result = dispatch_variant(backend, &variant.text, k) => result,
            };
            VariantOutcome {
                position,
                weight: variant.weight,
                result,
            }
        })
        .collect();

    futures::future::join_all(futures).await
}

/// Encode one variant, search the index and resolve handles.
///
/// `NO_MATCH` padding and positions without a handle are dropped; the
/// surviving candidates keep their original index rank.
async fn dispatch_variant<B: Backend>(
    backend: &Arc<B>,
    text: &str,
    k: usize,
) -> Result<Vec<RawCandidate>, FusionError> {
    let embedding = backend.encoder().encode(text).await?;

    let backend = Arc::clone(backend);
    tokio::task::spawn_blocking(move || search_index(backend.index(), &embedding, k))
        .await
        .map_err(|e| FusionError::Index(format!("index search task failed: {e}")))?
}

fn search_index<I: VectorIndex>(
    index: &I,
    embedding: &[f32],
    k: usize,
) -> Result<Vec<RawCandidate>, FusionError> {
    let hits = index.search(embedding, k)?;

    Ok(hits
        .into_iter()
        .enumerate()
        .filter(|(_, (_, position))| *position != NO_MATCH)
        .filter_map(|(local_rank, (raw_score, position))| {
            index.resolve_handle(position).map(|handle| RawCandidate {
                handle,
                raw_score,
                local_rank,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SearchBackend;
    use crate::index::{FlatIndex, ImageCorpus};

    /// Maps known texts to fixed vectors; anything else fails.
    struct TableEncoder;

    impl TextEncoder for TableEncoder {
        async fn encode(&self, text: &str) -> Result<Vec<f32>, FusionError> {
            match text {
                "x" => Ok(vec![1.0, 0.0]),
                "y" => Ok(vec![0.0, 1.0]),
                "slow" => {
                    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                    Ok(vec![1.0, 0.0])
                }
                other => Err(FusionError::Encoder(format!("unknown text {other}"))),
            }
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn backend(
        handles: Option<Vec<u64>>,
    ) -> Arc<SearchBackend<TableEncoder, FlatIndex, ImageCorpus>> {
        let mut index =
            FlatIndex::from_vectors(2, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]])
                .expect("build");
        if let Some(handles) = handles {
            index = index.with_handles(handles);
        }
        Arc::new(SearchBackend::new(TableEncoder, index, ImageCorpus::default()))
    }

    fn variant(text: &str, weight: f64) -> QueryVariant {
        QueryVariant {
            text: text.into(),
            weight,
        }
    }

    #[tokio::test]
    async fn outcomes_follow_variant_order() {
        let backend = backend(None);
        let variants = vec![variant("x", 1.0), variant("y", 0.85)];
        let outcomes = dispatch(&backend, &variants, 2, &CancellationToken::new()).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].position, 0);
        assert!((outcomes[1].weight - 0.85).abs() < f64::EPSILON);

        let first = outcomes[0].result.as_ref().expect("x succeeds");
        assert_eq!(first[0].handle, 0);
        assert_eq!(first[0].local_rank, 0);
        assert_eq!(first[1].handle, 2);
        let second = outcomes[1].result.as_ref().expect("y succeeds");
        assert_eq!(second[0].handle, 1);
    }

    #[tokio::test]
    async fn failing_variant_does_not_affect_siblings() {
        let backend = backend(None);
        let variants = vec![variant("x", 1.0), variant("nope", 0.85)];
        let outcomes = dispatch(&backend, &variants, 2, &CancellationToken::new()).await;

        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(FusionError::Encoder(_))));
    }

    #[tokio::test]
    async fn padding_and_unresolved_positions_dropped() {
        // Position 2 has no handle in the table.
        let backend = backend(Some(vec![7, 8]));
        let variants = vec![variant("x", 1.0)];
        let outcomes = dispatch(&backend, &variants, 5, &CancellationToken::new()).await;

        let candidates = outcomes[0].result.as_ref().expect("ok");
        let handles: Vec<u64> = candidates.iter().map(|c| c.handle).collect();
        assert_eq!(handles, vec![7, 8]);
        // Rank is the position in the index result list, gaps included.
        assert_eq!(candidates[1].local_rank, 2);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_index_failure() {
        struct WideEncoder;
        impl TextEncoder for WideEncoder {
            async fn encode(&self, _text: &str) -> Result<Vec<f32>, FusionError> {
                Ok(vec![1.0, 0.0, 0.0])
            }
            fn dimension(&self) -> usize {
                3
            }
        }
        let index = FlatIndex::from_vectors(2, vec![vec![1.0, 0.0]]).expect("build");
        let backend = Arc::new(SearchBackend::new(WideEncoder, index, ImageCorpus::default()));
        let outcomes =
            dispatch(&backend, &[variant("x", 1.0)], 1, &CancellationToken::new()).await;
        assert!(matches!(outcomes[0].result, Err(FusionError::Index(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_fails_in_flight_variants() {
        let backend = backend(None);
        let variants = vec![variant("x", 1.0), variant("slow", 0.85)];
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        let outcomes = tokio::join!(dispatch(&backend, &variants, 2, &cancel), async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        })
        .0;

        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(FusionError::Cancelled)));
    }

    /// Index whose scans only succeed once `peers` scans are in flight at once.
    struct RendezvousIndex {
        inner: FlatIndex,
        peers: usize,
        arrived: std::sync::Mutex<usize>,
        all_here: std::sync::Condvar,
    }

    impl VectorIndex for RendezvousIndex {
        fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<(f32, i64)>, FusionError> {
            let mut arrived = self.arrived.lock().expect("lock");
            *arrived += 1;
            self.all_here.notify_all();
            let (arrived, wait) = self
                .all_here
                .wait_timeout_while(arrived, std::time::Duration::from_secs(5), |n| {
                    *n < self.peers
                })
                .expect("lock");
            drop(arrived);
            if wait.timed_out() {
                return Err(FusionError::Index("scans ran one at a time".into()));
            }
            self.inner.search(embedding, k)
        }

        fn resolve_handle(&self, position: i64) -> Option<crate::types::Handle> {
            self.inner.resolve_handle(position)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn index_type(&self) -> &str {
            "Rendezvous"
        }
    }

    #[tokio::test]
    async fn index_scans_of_variants_overlap() {
        let index = RendezvousIndex {
            inner: FlatIndex::from_vectors(2, vec![vec![1.0, 0.0], vec![0.0, 1.0]])
                .expect("build"),
            peers: 2,
            arrived: std::sync::Mutex::new(0),
            all_here: std::sync::Condvar::new(),
        };
        let backend = Arc::new(SearchBackend::new(TableEncoder, index, ImageCorpus::default()));
        let variants = vec![variant("x", 1.0), variant("y", 0.85)];
        let outcomes = dispatch(&backend, &variants, 1, &CancellationToken::new()).await;

        assert_eq!(outcomes[0].result.as_ref().expect("x scanned")[0].handle, 0);
        assert_eq!(outcomes[1].result.as_ref().expect("y scanned")[0].handle, 1);
    }
}
