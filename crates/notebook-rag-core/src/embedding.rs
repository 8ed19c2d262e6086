//! Embedder trait, vector normalization, and stored-vector codecs.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! the [`embed_texts`] / [`embed_query`] entry points that enforce the
//! output contract, a deterministic [`HashEmbedder`] for offline use, and
//! the two storage encodings for vectors:
//!
//! - **native**: little-endian `f32` bytes ([`vec_to_blob`] / [`blob_to_vec`])
//! - **text**: the pgvector literal `[0.1,0.2,...]` ([`format_vector`] /
//!   [`parse_vector`]), kept for stores that hand vectors back as strings
//!
//! Concrete network and model-backed providers (OpenAI, Ollama, fastembed)
//! live in the `notebook-rag` app crate.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{RagError, Result};

/// Trait for embedding backends.
///
/// Implementations are constructed once by the application and passed by
/// reference into ingestion and retrieval. Callers should go through
/// [`embed_texts`] / [`embed_query`] rather than calling
/// [`embed_batch`](Embedder::embed_batch) directly, so every vector is
/// validated and L2-normalized the same way.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Compute raw vectors for a batch, one per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a batch of texts and normalize the result to unit length.
///
/// # Errors
///
/// [`RagError::EmbeddingUnavailable`] if the backend fails, returns the
/// wrong number of vectors, or returns a vector that has the wrong
/// dimension, contains a non-finite value, or is all zeros. Zero vectors
/// are never passed through.
pub async fn embed_texts(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let raw = embedder.embed_batch(texts).await?;
    if raw.len() != texts.len() {
        return Err(RagError::embedding(format!(
            "{} returned {} vectors for {} inputs",
            embedder.model_name(),
            raw.len(),
            texts.len()
        )));
    }

    let dims = embedder.dims();
    raw.into_iter()
        .enumerate()
        .map(|(i, mut v)| {
            if v.len() != dims {
                return Err(RagError::embedding(format!(
                    "{} returned {} dims for input {}, expected {}",
                    embedder.model_name(),
                    v.len(),
                    i,
                    dims
                )));
            }
            if !l2_normalize(&mut v) {
                return Err(RagError::embedding(format!(
                    "{} returned a zero or non-finite vector for input {}",
                    embedder.model_name(),
                    i
                )));
            }
            Ok(v)
        })
        .collect()
}

/// Embed a single query string with the same normalization as the corpus.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    embed_texts(embedder, &[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RagError::embedding("empty embedding response"))
}

/// Scale `v` to unit length in place.
///
/// Returns `false` (leaving `v` untouched) when the vector is empty, all
/// zeros, or holds a non-finite component.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    if v.is_empty() || v.iter().any(|x| !x.is_finite()) {
        return false;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < f32::EPSILON || !norm.is_finite() {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
/// For unit vectors, squared Euclidean distance equals `2 - 2·cos`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

// ============ Hash Embedder ============

/// Deterministic bag-of-words embedder.
///
/// Each lowercase alphanumeric token is hashed with SHA-256 into one of
/// `dims` buckets. Texts sharing words land close together, identical
/// texts produce identical vectors, and no model or network is needed.
/// Used for tests and offline runs.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub const MODEL_NAME: &'static str = "hash-bow";

    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            return Err(RagError::config("hash embedder dims must be > 0"));
        }
        Ok(Self { dims })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();
        let mut tokens = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .peekable();

        if tokens.peek().is_none() {
            // Punctuation-only or empty text still gets a stable vector.
            v[self.bucket(lowered.trim())] += 1.0;
            return v;
        }
        for token in tokens {
            v[self.bucket(token)] += 1.0;
        }
        v
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(head) % self.dims as u64) as usize
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

// ============ Stored Vectors ============

/// Why a stored embedding could not be turned into a searchable vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedEmbedding {
    #[error("no embedding stored")]
    Missing,
    #[error("not a vector literal: {0:?}")]
    NotAVector(String),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("non-finite component at position {0}")]
    NonFinite(usize),
    #[error("blob length {0} is not a multiple of 4")]
    BadBlobLength(usize),
    #[error("expected {expected} dims, found {found}")]
    WrongDimension { expected: usize, found: usize },
    #[error("zero-length vector")]
    ZeroNorm,
}

/// An embedding as it comes back from storage.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredEmbedding {
    /// Little-endian `f32` bytes. The primary storage format.
    Native(Vec<u8>),
    /// Textual vector literal, e.g. `"[0.1,0.2]"`.
    Serialized(String),
    /// The chunk was stored without a vector.
    Missing,
}

impl StoredEmbedding {
    /// Decode into a unit vector of exactly `dims` finite components.
    ///
    /// Rows written by other tools may not be normalized, so the result is
    /// always rescaled. All-zero vectors are rejected.
    pub fn decode(&self, dims: usize) -> std::result::Result<Vec<f32>, MalformedEmbedding> {
        let mut v = match self {
            StoredEmbedding::Native(bytes) => {
                if bytes.len() % 4 != 0 {
                    return Err(MalformedEmbedding::BadBlobLength(bytes.len()));
                }
                blob_to_vec(bytes)
            }
            StoredEmbedding::Serialized(text) => parse_vector(text)?,
            StoredEmbedding::Missing => return Err(MalformedEmbedding::Missing),
        };
        if let Some(pos) = v.iter().position(|x| !x.is_finite()) {
            return Err(MalformedEmbedding::NonFinite(pos));
        }
        if v.len() != dims {
            return Err(MalformedEmbedding::WrongDimension {
                expected: dims,
                found: v.len(),
            });
        }
        if !l2_normalize(&mut v) {
            return Err(MalformedEmbedding::ZeroNorm);
        }
        Ok(v)
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use notebook_rag_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]. Trailing bytes that do not fill a whole `f32`
/// are ignored; [`StoredEmbedding::decode`] rejects them up front.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Render a vector as a pgvector literal: `[0.1,0.2,0.3]`.
pub fn format_vector(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Parse a textual vector literal.
///
/// Accepts pgvector (`[1,2,3]`) and JSON array syntax, with arbitrary
/// whitespace. Every component must be a number.
pub fn parse_vector(text: &str) -> std::result::Result<Vec<f32>, MalformedEmbedding> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| MalformedEmbedding::NotAVector(preview(trimmed)))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f32>()
                .map_err(|_| MalformedEmbedding::InvalidNumber(preview(part)))
        })
        .collect()
}

fn preview(s: &str) -> String {
    s.chars().take(32).collect()
}
