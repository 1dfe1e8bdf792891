//! The set of collaborators one search call runs against.

use crate::encoder::TextEncoder;
use crate::index::{Corpus, VectorIndex};
use crate::types::BackendStatus;

/// Encoder, index and corpus loaded together.
///
/// A backend is immutable once built; a reload builds a new one and swaps
/// it in through [`crate::SnapshotHandle`].
pub trait Backend: Send + Sync + 'static {
    /// Text encoder type.
    type Encoder: TextEncoder;
    /// Vector index type.
    type Index: VectorIndex;
    /// Corpus type.
    type Corpus: Corpus;

    /// The text encoder.
    fn encoder(&self) -> &Self::Encoder;

    /// The vector index.
    fn index(&self) -> &Self::Index;

    /// The corpus path table.
    fn corpus(&self) -> &Self::Corpus;

    /// Descriptive status of this backend.
    fn status(&self) -> BackendStatus;
}

/// Plain struct implementation of [`Backend`].
#[derive(Debug, Clone)]
pub struct SearchBackend<E, I, C> {
    encoder: E,
    index: I,
    corpus: C,
    device: String,
    model: String,
}

impl<E, I, C> SearchBackend<E, I, C>
where
    E: TextEncoder,
    I: VectorIndex,
    C: Corpus,
{
    /// Bundle the three collaborators.
    pub fn new(encoder: E, index: I, corpus: C) -> Self {
        Self {
            encoder,
            index,
            corpus,
            device: "cpu".to_owned(),
            model: "unknown".to_owned(),
        }
    }

    /// Label the encoder for status reporting.
    #[must_use]
    pub fn with_model_info(mut self, model: impl Into<String>, device: impl Into<String>) -> Self {
        self.model = model.into();
        self.device = device.into();
        self
    }
}

impl<E, I, C> Backend for SearchBackend<E, I, C>
where
    E: TextEncoder + 'static,
    I: VectorIndex + 'static,
    C: Corpus + 'static,
{
    type Encoder = E;
    type Index = I;
    type Corpus = C;

    fn encoder(&self) -> &E {
        &self.encoder
    }

    fn index(&self) -> &I {
        &self.index
    }

    fn corpus(&self) -> &C {
        &self.corpus
    }

    fn status(&self) -> BackendStatus {
        BackendStatus {
            device: self.device.clone(),
            model: self.model.clone(),
            vectors_indexed: self.index.len(),
            embedding_dim: self.index.dimension(),
            total_images: self.corpus.len(),
            index_type: self.index.index_type().to_owned(),
        }
    }
}
