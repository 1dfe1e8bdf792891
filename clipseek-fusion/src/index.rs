//! Vector index and corpus collaborators.
//!
//! [`VectorIndex`] answers k-nearest-neighbour queries in index-internal
//! positions and resolves those positions to corpus handles. [`Corpus`]
//! maps handles to image paths. [`FlatIndex`] and [`ImageCorpus`] are exact
//! in-memory implementations of both.

use crate::encoder::l2_normalize;
use crate::error::FusionError;
use crate::types::Handle;

/// Index position that signals "no match" in a result list.
pub const NO_MATCH: i64 = -1;

/// A nearest-neighbour index over image embeddings.
///
/// All implementations must be `Send + Sync`; a loaded index is shared by
/// every concurrent search and never mutated during one.
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` `(score, position)` pairs, best first.
    ///
    /// A position of [`NO_MATCH`] marks padding and must be skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Index`] if the index is unavailable or the
    /// embedding has the wrong dimension.
    fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<(f32, i64)>, FusionError>;

    /// Translate an index position into a corpus handle.
    ///
    /// Returns `None` for [`NO_MATCH`] and out-of-range positions.
    fn resolve_handle(&self, position: i64) -> Option<Handle>;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Implementation name reported in backend status.
    fn index_type(&self) -> &str;
}

/// The static collection of indexed images.
pub trait Corpus: Send + Sync {
    /// Path of the image behind `handle`, if known.
    fn path_of(&self, handle: Handle) -> Option<&str>;

    /// Number of images with a path.
    fn len(&self) -> usize;

    /// Whether the corpus is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Brute-force exact inner-product index.
///
/// Vectors are L2-normalised on insertion, so scores are cosine
/// similarities when queries are normalised too.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Vec<Vec<f32>>,
    dim: usize,
    /// Position → handle table. Identity when `None`.
    handles: Option<Vec<Handle>>,
}

impl FlatIndex {
    /// Empty index for embeddings of `dim` floats.
    pub fn new(dim: usize) -> Self {
        Self {
            vectors: Vec::new(),
            dim,
            handles: None,
        }
    }

    /// Install a position → handle table (one handle per stored vector).
    #[must_use]
    pub fn with_handles(mut self, handles: Vec<Handle>) -> Self {
        self.handles = Some(handles);
        self
    }

    /// Append a vector. Its position is the current length.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Index`] on a dimension mismatch.
    pub fn add(&mut self, mut vector: Vec<f32>) -> Result<(), FusionError> {
        if vector.len() != self.dim {
            return Err(FusionError::Index(format!(
                "dimension mismatch: expected {}, got {}",
                self.dim,
                vector.len()
            )));
        }
        l2_normalize(&mut vector);
        self.vectors.push(vector);
        Ok(())
    }

    /// Build an index from a batch of vectors.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Index`] if any vector has the wrong dimension.
    pub fn from_vectors(
        dim: usize,
        vectors: impl IntoIterator<Item = Vec<f32>>,
    ) -> Result<Self, FusionError> {
        let mut index = Self::new(dim);
        for vector in vectors {
            index.add(vector)?;
        }
        Ok(index)
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<(f32, i64)>, FusionError> {
        if embedding.len() != self.dim {
            return Err(FusionError::Index(format!(
                "dimension mismatch: expected {}, got {}",
                self.dim,
                embedding.len()
            )));
        }

        let mut scored: Vec<(f32, i64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| {
                let dot = v.iter().zip(embedding).map(|(a, b)| a * b).sum::<f32>();
                (dot, pos as i64)
            })
            .collect();
        // Stable: equal scores keep ascending position order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);
        scored.resize(k, (f32::NEG_INFINITY, NO_MATCH));
        Ok(scored)
    }

    fn resolve_handle(&self, position: i64) -> Option<Handle> {
        let pos = usize::try_from(position).ok()?;
        match &self.handles {
            Some(handles) => handles.get(pos).copied(),
            None => (pos < self.vectors.len()).then_some(pos as Handle),
        }
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn index_type(&self) -> &str {
        "FlatIP"
    }
}

/// Image paths indexed by handle.
#[derive(Debug, Clone, Default)]
pub struct ImageCorpus {
    paths: Vec<String>,
}

impl ImageCorpus {
    /// Corpus where handle `i` is `paths[i]`.
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }
}

impl Corpus for ImageCorpus {
    fn path_of(&self, handle: Handle) -> Option<&str> {
        let idx = usize::try_from(handle).ok()?;
        self.paths
            .get(idx)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}
