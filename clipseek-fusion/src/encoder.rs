//! Trait definition for pluggable text encoders.
//!
//! A text encoder maps a query variant to a fixed-length, L2-normalised
//! embedding in the same space as the indexed images.

use crate::error::FusionError;

/// A pluggable text encoder backend.
///
/// All implementations must be `Send + Sync` so that variants can be
/// encoded concurrently.
pub trait TextEncoder: Send + Sync {
    /// Encode `text` into a normalised embedding of [`Self::dimension`] floats.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Encoder`] if the model or the service behind it
    /// cannot produce an embedding.
    fn encode(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, FusionError>> + Send;

    /// Length of every embedding this encoder returns.
    fn dimension(&self) -> usize;
}

/// Scale `vector` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
