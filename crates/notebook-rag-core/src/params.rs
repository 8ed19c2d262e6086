//! Tuning parameters, decoupled from application config.
//!
//! The application parses its TOML file and builds these values; the core
//! never reads configuration from ambient state.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Word-window chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingParams {
    /// Words per chunk.
    pub chunk_size: usize,
    /// Words shared between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl ChunkingParams {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let params = Self {
            chunk_size,
            overlap,
        };
        params.validate()?;
        Ok(params)
    }

    /// `chunk_size > 0` and `overlap < chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::config("chunk_size must be > 0"));
        }
        if self.overlap >= self.chunk_size {
            return Err(RagError::config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Words the window advances by. Always positive for validated params.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Query-time retrieval and assembly parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalParams {
    /// Nearest chunks fetched per question.
    pub top_k: usize,
    /// Most recent conversation turns included in the context bundle.
    pub max_history_turns: usize,
    /// Top-ranked chunks merged into the context text. `1` keeps only the
    /// best match.
    pub context_chunks: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_history_turns: 5,
            context_chunks: 1,
        }
    }
}

impl RetrievalParams {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RagError::config("top_k must be >= 1"));
        }
        if self.context_chunks == 0 {
            return Err(RagError::config("context_chunks must be >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        ChunkingParams::default().validate().unwrap();
        RetrievalParams::default().validate().unwrap();
    }

    #[test]
    fn test_overlap_equal_to_size_rejected() {
        let err = ChunkingParams::new(3, 3).unwrap_err();
        assert!(matches!(err, RagError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(
            ChunkingParams::new(0, 0),
            Err(RagError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_stride() {
        assert_eq!(ChunkingParams::new(3, 1).unwrap().stride(), 2);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let params = RetrievalParams {
            top_k: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
