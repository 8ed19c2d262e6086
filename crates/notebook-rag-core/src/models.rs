//! Core data models used throughout Notebook RAG.
//!
//! These types represent the documents, chunks, sessions, and conversation
//! turns that flow through the ingestion and retrieval pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A document whose text has already been extracted by an upstream
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub user_id: String,
    /// Extracted plain text. Opaque to the core beyond word splitting.
    pub content: String,
    pub created_at: i64,
}

/// A word window of a document's text.
///
/// `(document_id, chunk_index)` is unique. Chunks are written once at
/// ingestion and replaced only when the whole document is re-ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    /// 0-based position in insertion order.
    pub chunk_index: i64,
    pub text: String,
}

/// A study session: the unit of retrieval isolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: i64,
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => f.write_str("User"),
            Sender::Bot => f.write_str("Bot"),
        }
    }
}

impl FromStr for Sender {
    type Err = String;

    /// Case-insensitive, accepting the aliases chat clients send.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "human" | "you" | "student" => Ok(Sender::User),
            "bot" | "assistant" | "ai" | "tutor" => Ok(Sender::Bot),
            other => Err(format!(
                "unknown sender '{}': expected user or bot",
                other
            )),
        }
    }
}

/// One message in a session's conversation. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub session_id: String,
    pub sender: Sender,
    pub message: String,
    /// Unix seconds. Turns are ordered by this, then by insertion.
    pub timestamp: i64,
}
