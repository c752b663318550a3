//! SQLite-backed persistence for voice signatures
//!
//! One row per writer, keyed by `writer_id`, holding the full signature
//! as a JSON payload. The store is a thin durability boundary with no
//! optimistic concurrency and no migrations; callers serialize mutations
//! per writer.

use std::path::Path;
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::Result;
use crate::voice::signature::VoiceSignature;

/// SQLite-backed signature store
pub struct SignatureStore {
    conn: Arc<Mutex<Connection>>,
}

impl SignatureStore {
    /// Open (or create) a store at the given path
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(crate::error::VoiceError::storage)?;
        }

        let conn = Connection::open(&path)?;

        // WAL mode for better concurrent-reader performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS voice_signatures (
                writer_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_signatures_updated
                ON voice_signatures(updated_at DESC);
        "#,
        )?;
        Ok(())
    }

    /// Save (insert or replace) a signature
    pub async fn save(&self, signature: &VoiceSignature) -> Result<()> {
        let conn = self.conn.lock().await;
        let payload = serde_json::to_string(signature)?;

        conn.execute(
            r#"INSERT OR REPLACE INTO voice_signatures
               (writer_id, payload, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                signature.writer_id,
                payload,
                signature.created_at.to_rfc3339(),
                signature.updated_at.to_rfc3339(),
            ],
        )?;

        info!("Saved signature for '{}'", signature.writer_id);
        Ok(())
    }

    /// Load a signature by writer identifier
    pub async fn load(&self, writer_id: &str) -> Result<Option<VoiceSignature>> {
        let conn = self.conn.lock().await;

        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM voice_signatures WHERE writer_id = ?1",
                params![writer_id],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Delete a signature; returns whether a record existed
    pub async fn delete(&self, writer_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM voice_signatures WHERE writer_id = ?1",
            params![writer_id],
        )?;
        if removed > 0 {
            info!("Deleted signature for '{}'", writer_id);
        }
        Ok(removed > 0)
    }

    /// All writer identifiers with a stored signature, most recently
    /// updated first
    pub async fn list(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT writer_id FROM voice_signatures ORDER BY updated_at DESC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn signature(writer_id: &str) -> VoiceSignature {
        VoiceSignature {
            writer_id: writer_id.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            vector: vec![0.25, -0.5, 0.75],
            dimension: 3,
            sample_count: 2,
            sample_fingerprints: BTreeSet::from(["deadbeefdeadbeef".to_string()]),
            total_word_count: 1200,
            threshold: 0.55,
            confidence: 0.5,
            positive_feedback_count: 1,
            negative_feedback_count: 0,
            contrast_vectors: vec![],
        }
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignatureStore::new(dir.path().join("voices.db")).await.unwrap();

        let sig = signature("ada");
        store.save(&sig).await.unwrap();

        let loaded = store.load("ada").await.unwrap().unwrap();
        assert_eq!(loaded.writer_id, "ada");
        assert_eq!(loaded.vector, sig.vector);
        assert_eq!(loaded.sample_fingerprints, sig.sample_fingerprints);
        assert_eq!(loaded.threshold, sig.threshold);
        assert_eq!(loaded.positive_feedback_count, 1);
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignatureStore::new(dir.path().join("voices.db")).await.unwrap();
        assert!(store.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignatureStore::new(dir.path().join("voices.db")).await.unwrap();

        let mut sig = signature("ada");
        store.save(&sig).await.unwrap();
        sig.sample_count = 5;
        store.save(&sig).await.unwrap();

        let loaded = store.load("ada").await.unwrap().unwrap();
        assert_eq!(loaded.sample_count, 5);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignatureStore::new(dir.path().join("voices.db")).await.unwrap();

        store.save(&signature("ada")).await.unwrap();
        assert!(store.delete("ada").await.unwrap());
        assert!(!store.delete("ada").await.unwrap());
        assert!(store.load("ada").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignatureStore::new(dir.path().join("voices.db")).await.unwrap();

        store.save(&signature("ada")).await.unwrap();
        store.save(&signature("grace")).await.unwrap();

        let ids = store.list().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"ada".to_string()));
        assert!(ids.contains(&"grace".to_string()));
    }
}
