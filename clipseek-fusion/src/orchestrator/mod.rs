//! Search orchestrator: variant fan-out, rank fusion, result assembly.
//!
//! This module dispatches every query variant to the encoder and index
//! concurrently, folds the per-variant candidates into one composite score
//! per image handle, and returns a thresholded, ranked, truncated list.

pub mod aggregate;
pub mod assemble;
pub mod dispatch;
pub mod search;
