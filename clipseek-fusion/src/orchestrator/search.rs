//! Core search orchestrator: enhance, fan out, fuse, rank.
//!
//! Expands the query into weighted variants, dispatches all of them
//! concurrently, folds the surviving candidates into one score per handle,
//! filters by threshold, and returns the top `top_k` with dense ranks and
//! the elapsed wall-clock time.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::backend::Backend;
use crate::config::FusionConfig;
use crate::enhancer::QueryEnhancer;
use crate::error::FusionError;
use crate::types::{SearchOutcome, SearchRequest};

use super::aggregate::Accumulator;
use super::assemble::assemble;
use super::dispatch::dispatch;

/// Orchestrate one search call against `backend`.
///
/// # Errors
///
/// See [`orchestrate_search_with_cancel`].
pub async fn orchestrate_search<B: Backend>(
    backend: &Arc<B>,
    enhancer: &QueryEnhancer,
    request: &SearchRequest,
    config: &FusionConfig,
) -> Result<SearchOutcome, FusionError> {
    orchestrate_search_with_cancel(backend, enhancer, request, config, &CancellationToken::new())
        .await
}

/// Orchestrate one search call, failing in-flight variants once `cancel`
/// fires.
///
/// # Pipeline
///
/// 1. Validate the request (no collaborator is called on bad input)
/// 2. Expand the query into weighted variants
/// 3. Fan out every variant to encoder + index, `top_k * overfetch_factor` each
/// 4. Log per-variant failures at warn level; they contribute nothing
/// 5. Fold candidates per handle, score, filter by threshold
/// 6. Sort, truncate to `top_k`, assign ranks
///
/// # Errors
///
/// - [`FusionError::InvalidInput`] if the request is out of bounds.
/// - [`FusionError::IndexUnavailable`] if every variant failed at the index.
/// - [`FusionError::AllVariantsFailed`] if every variant failed and at least
///   one did so at the encoder or through cancellation.
///
/// Zero results above the threshold is a successful, empty outcome.
pub async fn orchestrate_search_with_cancel<B: Backend>(
    backend: &Arc<B>,
    enhancer: &QueryEnhancer,
    request: &SearchRequest,
    config: &FusionConfig,
    cancel: &CancellationToken,
) -> Result<SearchOutcome, FusionError> {
    request.validate(config)?;
    tracing::trace!(query = %request.query, top_k = request.top_k, "search requested");

    let started = Instant::now();

    // 1. Expand.
    let variants = enhancer.enhance(&request.query, request.use_enhancement);
    let k = request.top_k.saturating_mul(config.overfetch_factor);

    // 2. Fan out.
    let outcomes = dispatch(backend, &variants, k, cancel).await;

    // 3. Fold successful variants in enhancer order.
    let mut accumulator = Accumulator::new();
    let mut errors: Vec<String> = Vec::new();
    let mut index_failures = 0_usize;

    for outcome in outcomes {
        match outcome.result {
            Ok(candidates) => {
                tracing::debug!(
                    variant = outcome.position,
                    weight = outcome.weight,
                    count = candidates.len(),
                    "variant returned candidates"
                );
                accumulator.add_variant(outcome.weight, &candidates);
            }
            Err(err) => {
                tracing::warn!(variant = outcome.position, error = %err, "variant dispatch failed");
                if matches!(err, FusionError::Index(_)) {
                    index_failures += 1;
                }
                errors.push(format!("variant {}: {err}", outcome.position));
            }
        }
    }

    // 4. Every variant failed: report once, distinguishing a dead index.
    if !variants.is_empty() && errors.len() == variants.len() {
        let detail = errors.join("; ");
        return Err(if index_failures == errors.len() {
            FusionError::IndexUnavailable(detail)
        } else {
            FusionError::AllVariantsFailed(detail)
        });
    }

    // 5. Score and filter.
    let scored = accumulator.finish(request.threshold, backend.corpus(), config);

    // 6. Rank.
    let results = assemble(scored, request.top_k);

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    tracing::debug!(count = results.len(), elapsed_ms, "search completed");

    Ok(SearchOutcome {
        results,
        elapsed_ms,
        variants,
        status: backend.status(),
    })
}
