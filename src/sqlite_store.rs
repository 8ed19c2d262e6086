//! SQLite-backed [`Store`] implementation.
//!
//! Vectors are written as little-endian f32 blobs in `chunks.embedding`.
//! Rows imported from older deployments may instead carry a serialized
//! `[a,b,c]` vector in `chunks.embedding_text`; those are decoded at query
//! time and excluded if unusable.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use notebook_rag_core::embedding::{vec_to_blob, StoredEmbedding};
use notebook_rag_core::error::{RagError, Result};
use notebook_rag_core::models::{Chunk, ConversationTurn, Document, Session, Sender};
use notebook_rag_core::store::{SessionCorpus, SessionStats, StoredChunk, Store};

use crate::config::Config;
use crate::db;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database. Run `nrag init` first.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(db::connect(config).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, user_id, title, content, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RagError::storage)?;

        Ok(row.map(|r| Document {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            content: r.get("content"),
            created_at: r.get("created_at"),
        }))
    }

    /// Sessions owned by a user, newest first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, created_at FROM sessions WHERE user_id = ? \
             ORDER BY created_at DESC, id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::storage)?;

        Ok(rows.iter().map(session_from_row).collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn count(&self, sql: &str, session_id: &str) -> Result<usize> {
        let n: i64 = sqlx::query_scalar(sql)
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::storage)?;
        Ok(n as usize)
    }
}

fn session_from_row(r: &SqliteRow) -> Session {
    Session {
        id: r.get("id"),
        user_id: r.get("user_id"),
        name: r.get("name"),
        created_at: r.get("created_at"),
    }
}

fn stored_embedding(blob: Option<Vec<u8>>, text: Option<String>) -> StoredEmbedding {
    match (blob, text) {
        (Some(bytes), _) => StoredEmbedding::Native(bytes),
        (None, Some(text)) => StoredEmbedding::Serialized(text),
        (None, None) => StoredEmbedding::Missing,
    }
}

async fn write_document(conn: &mut SqliteConnection, doc: &Document) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, user_id, title, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content
        "#,
    )
    .bind(&doc.id)
    .bind(&doc.user_id)
    .bind(&doc.title)
    .bind(&doc.content)
    .bind(doc.created_at)
    .execute(&mut *conn)
    .await
    .map_err(RagError::storage)?;
    Ok(())
}

/// Delete and rewrite a document's chunks, then bump every session that
/// holds the document. Callers own the transaction.
async fn write_chunks(
    conn: &mut SqliteConnection,
    document_id: &str,
    chunks: &[Chunk],
    vectors: Option<&[Vec<f32>]>,
) -> Result<()> {
    if let Some(vecs) = vectors {
        if vecs.len() != chunks.len() {
            return Err(RagError::storage(format!(
                "{} vectors for {} chunks",
                vecs.len(),
                chunks.len()
            )));
        }
    }

    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *conn)
        .await
        .map_err(RagError::storage)?;

    for (i, chunk) in chunks.iter().enumerate() {
        let blob = vectors.and_then(|v| v.get(i)).map(|v| vec_to_blob(v));
        sqlx::query(
            "INSERT INTO chunks (document_id, chunk_index, text, embedding) VALUES (?, ?, ?, ?)",
        )
        .bind(document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(blob)
        .execute(&mut *conn)
        .await
        .map_err(RagError::storage)?;
    }

    sqlx::query(
        r#"
        UPDATE sessions SET generation = generation + 1
        WHERE id IN (SELECT session_id FROM session_documents WHERE document_id = ?)
        "#,
    )
    .bind(document_id)
    .execute(&mut *conn)
    .await
    .map_err(RagError::storage)?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, name, created_at, generation) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.name)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(RagError::storage)?;
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT id, user_id, name, created_at FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RagError::storage)?;
        Ok(row.as_ref().map(session_from_row))
    }

    async fn upsert_document(&self, doc: &Document) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(RagError::storage)?;
        write_document(&mut conn, doc).await
    }

    async fn attach_document(&self, session_id: &str, document_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(RagError::storage)?;

        let doc_exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM documents WHERE id = ?")
            .bind(document_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(RagError::storage)?;
        if !doc_exists {
            return Err(RagError::storage(format!(
                "document {} not found",
                document_id
            )));
        }

        let session_exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM sessions WHERE id = ?")
                .bind(session_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(RagError::storage)?;
        if !session_exists {
            return Err(RagError::storage(format!("session {} not found", session_id)));
        }

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO session_documents (session_id, document_id, attached_at, position)
            VALUES (?, ?, ?,
                    (SELECT COALESCE(MAX(position), -1) + 1
                     FROM session_documents WHERE session_id = ?))
            "#,
        )
        .bind(session_id)
        .bind(document_id)
        .bind(chrono::Utc::now().timestamp())
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(RagError::storage)?
        .rows_affected();

        if inserted > 0 {
            sqlx::query("UPDATE sessions SET generation = generation + 1 WHERE id = ?")
                .bind(session_id)
                .execute(&mut *tx)
                .await
                .map_err(RagError::storage)?;
        }

        tx.commit().await.map_err(RagError::storage)?;
        Ok(())
    }

    async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(RagError::storage)?;
        write_chunks(&mut tx, document_id, chunks, vectors).await?;
        tx.commit().await.map_err(RagError::storage)?;
        Ok(())
    }

    async fn put_document(
        &self,
        doc: &Document,
        chunks: &[Chunk],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(RagError::storage)?;
        write_document(&mut tx, doc).await?;
        write_chunks(&mut tx, &doc.id, chunks, vectors).await?;
        tx.commit().await.map_err(RagError::storage)?;
        Ok(())
    }

    async fn session_document_ids(&self, session_id: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT document_id FROM session_documents WHERE session_id = ? ORDER BY position ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::storage)
    }

    async fn session_corpus(&self, session_id: &str) -> Result<SessionCorpus> {
        // One read transaction, so an attach committed between the two
        // queries cannot split the view.
        let mut tx = self.pool.begin().await.map_err(RagError::storage)?;

        let document_ids: Vec<String> = sqlx::query_scalar(
            "SELECT document_id FROM session_documents WHERE session_id = ? ORDER BY position ASC",
        )
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(RagError::storage)?;

        let rows = sqlx::query(
            r#"
            SELECT c.document_id, c.chunk_index, c.text, c.embedding, c.embedding_text
            FROM session_documents sd
            JOIN chunks c ON c.document_id = sd.document_id
            WHERE sd.session_id = ?
            ORDER BY sd.position ASC, c.chunk_index ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(RagError::storage)?;

        tx.commit().await.map_err(RagError::storage)?;

        let chunks = rows
            .iter()
            .map(|row| StoredChunk {
                document_id: row.get("document_id"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
                embedding: stored_embedding(row.get("embedding"), row.get("embedding_text")),
            })
            .collect();
        Ok(SessionCorpus {
            document_ids,
            chunks,
        })
    }

    async fn session_generation(&self, session_id: &str) -> Result<u64> {
        let generation: Option<i64> =
            sqlx::query_scalar("SELECT generation FROM sessions WHERE id = ?")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RagError::storage)?;
        Ok(generation.unwrap_or(0).max(0) as u64)
    }

    async fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let rows = sqlx::query(
            r#"
            SELECT session_id, sender, message, timestamp
            FROM conversation_turns
            WHERE session_id = ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::storage)?;

        rows.iter()
            .map(|row| {
                let sender: String = row.get("sender");
                Ok(ConversationTurn {
                    session_id: row.get("session_id"),
                    sender: sender.parse::<Sender>().map_err(RagError::storage)?,
                    message: row.get("message"),
                    timestamp: row.get("timestamp"),
                })
            })
            .collect()
    }

    async fn append_turn(&self, turn: &ConversationTurn) -> Result<()> {
        if self.get_session(&turn.session_id).await?.is_none() {
            return Err(RagError::storage(format!(
                "session {} not found",
                turn.session_id
            )));
        }

        sqlx::query(
            "INSERT INTO conversation_turns (session_id, sender, message, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(&turn.session_id)
        .bind(turn.sender.as_str())
        .bind(&turn.message)
        .bind(turn.timestamp)
        .execute(&self.pool)
        .await
        .map_err(RagError::storage)?;
        Ok(())
    }

    async fn session_stats(&self, session_id: &str) -> Result<SessionStats> {
        Ok(SessionStats {
            documents: self
                .count(
                    "SELECT COUNT(*) FROM session_documents WHERE session_id = ?",
                    session_id,
                )
                .await?,
            chunks: self
                .count(
                    "SELECT COUNT(*) FROM session_documents sd \
                     JOIN chunks c ON c.document_id = sd.document_id \
                     WHERE sd.session_id = ?",
                    session_id,
                )
                .await?,
            turns: self
                .count(
                    "SELECT COUNT(*) FROM conversation_turns WHERE session_id = ?",
                    session_id,
                )
                .await?,
        })
    }
}
