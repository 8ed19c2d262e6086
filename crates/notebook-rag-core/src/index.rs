//! Exact nearest-neighbor index over a fixed set of vectors.
//!
//! [`FlatIndex`] stores vectors contiguously and answers k-nearest-neighbor
//! queries by brute-force squared Euclidean distance. For unit vectors this
//! ranks identically to cosine similarity (`‖a-b‖² = 2 - 2·cos`).
//!
//! The index is immutable once built. A changed corpus needs a new build.
//!
//! # Example
//!
//! ```rust
//! use notebook_rag_core::index::FlatIndex;
//!
//! let index = FlatIndex::build(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
//! let hits = index.search(&[0.0, 1.0], 5).unwrap();
//! assert_eq!(hits.len(), 2);
//! assert_eq!(hits[0].position, 1);
//! assert_eq!(hits[0].distance, 0.0);
//! ```

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::{RagError, Result};

/// One search hit: the vector's build-order position and its distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub position: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// Flat (exhaustive) L2 index.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    dims: usize,
    len: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from row vectors.
    ///
    /// An empty input is legal; every search against it returns nothing.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidConfiguration`] if the rows disagree on dimension
    /// or have dimension zero.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Ok(Self::default());
        };
        let dims = first.len();
        if dims == 0 {
            return Err(RagError::config("cannot index zero-dimension vectors"));
        }

        let mut data = Vec::with_capacity(dims * vectors.len());
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dims {
                return Err(RagError::config(format!(
                    "vector {} has {} dims, expected {}",
                    i,
                    v.len(),
                    dims
                )));
            }
            data.extend_from_slice(v);
        }

        Ok(Self {
            dims,
            len: vectors.len(),
            data,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dimension of the indexed vectors (`0` for an empty index).
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Return the `min(k, len)` nearest vectors, closest first.
    ///
    /// Equal distances keep build order, so results are deterministic.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidConfiguration`] if the query's dimension differs
    /// from the indexed vectors (never raised on an empty index).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            return Err(RagError::config(format!(
                "query has {} dims, index has {}",
                query.len(),
                self.dims
            )));
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dims)
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(row, query),
            })
            .collect();

        let k = k.min(hits.len());
        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, by_distance_then_position);
            hits.truncate(k);
        }
        hits.sort_by(by_distance_then_position);
        Ok(hits)
    }
}

fn by_distance_then_position(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.position.cmp(&b.position))
}

/// Squared Euclidean distance. Callers guarantee equal lengths.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
