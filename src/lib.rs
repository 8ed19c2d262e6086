//! # Notebook RAG
//!
//! Session-scoped retrieval for study notebooks. Students upload documents
//! into a session; questions asked in that session are answered from those
//! documents only, together with the recent conversation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐
//! │ Extracted    │──▶│ Chunk + Embed │──▶│   SQLite     │
//! │ text (file)  │   │   (core)      │   │ chunks+BLOBs │
//! └──────────────┘   └───────────────┘   └──────┬───────┘
//!                                               │ session scope
//!                                               ▼
//!                    ┌───────────────┐   ┌──────────────┐
//!                    │ ContextBundle │◀──│ Flat L2 index│
//!                    │ + history     │   │ per session  │
//!                    └───────────────┘   └──────────────┘
//! ```
//!
//! The algorithms live in `notebook-rag-core`; this crate supplies
//! configuration, SQLite storage, embedding providers, and the `nrag` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`embedding`] | Embedding providers (hash, OpenAI, Ollama, local) |
//! | [`ingest`] | `document add` |
//! | [`session`] | `session create/attach/show/list` |
//! | [`ask`] | `ask` |
//! | [`history`] | `history append/show` |

pub mod ask;
pub mod config;
pub mod db;
pub mod embedding;
pub mod history;
pub mod ingest;
pub mod migrate;
pub mod session;
pub mod sqlite_store;
