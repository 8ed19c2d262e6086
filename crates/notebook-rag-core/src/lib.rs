//! # Notebook RAG Core
//!
//! Runtime-agnostic retrieval logic for Notebook RAG: data models,
//! word-window chunking, the embedder trait, an exact vector index,
//! session-scoped retrieval, and context assembly.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Storage and embedding backends are supplied
//! by the caller through the [`store::Store`] and [`embedding::Embedder`]
//! traits.
//!
//! ## Pipeline
//!
//! ```text
//! ingest:  text ──▶ chunk ──▶ embed ──▶ Store::put_document
//! ask:     Store::session_corpus ──▶ FlatIndex ──▶ top-k ──▶ assemble ──▶ ContextBundle
//! ```

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod params;
pub mod pipeline;
pub mod retriever;
pub mod store;

pub use error::{RagError, Result};
