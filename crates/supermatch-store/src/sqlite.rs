//! SQLite-backed supervisor store with in-process cosine similarity.
//!
//! Field vectors are loaded per field type into a normalized matrix so a query
//! is one matrix-vector product. Matrices are tagged with the write generation
//! they were loaded at and rebuilt lazily after any embedding write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::{Array1, Array2};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::embedding::{cosine_similarity, decode_vector, encode_vector, normalize};
use crate::schema::{META_EMBEDDING_DIM, SCHEMA_SQL};
use crate::types::*;
use supermatch_core::{Error, FieldType, Result};

/// SQLite store for supervisors, their embeddings and the embedding cache.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    embedding_dim: usize,
    /// Bumped on every write that touches `supervisor_embeddings`.
    generation: AtomicU64,
    matrices: Mutex<HashMap<FieldType, FieldMatrix>>,
}

struct FieldMatrix {
    /// Normalized embeddings, shape (N, dim).
    matrix: Array2<f32>,
    /// Supervisor IDs corresponding to each row.
    supervisor_ids: Vec<String>,
    generation: u64,
}

impl SqliteStore {
    /// Open or create the SQLite store.
    ///
    /// `db_dir` is the directory (e.g., `data/vectordb/`). The file will be
    /// `db_dir/supermatch.db`. Opening an existing store with a different
    /// `embedding_dim` than it was created with is a configuration error.
    pub fn open(db_dir: impl AsRef<Path>, embedding_dim: usize) -> Result<Self> {
        if embedding_dim == 0 {
            return Err(Error::Config("embedding dimension must be positive".into()));
        }
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("supermatch.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;
        Self::check_dimension(&conn, embedding_dim)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            embedding_dim,
            generation: AtomicU64::new(1),
            matrices: Mutex::new(HashMap::new()),
        };

        info!(
            "SqliteStore initialized: {} supervisors, {} cache entries, dim={}, path={}",
            store.count_supervisors()?,
            store.count_cache_entries()?,
            embedding_dim,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    /// Record the dimension on first open; refuse a different one afterwards.
    fn check_dimension(conn: &Connection, embedding_dim: usize) -> Result<()> {
        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = ?1",
                params![META_EMBEDDING_DIM],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        match stored {
            Some(value) => {
                let stored_dim: usize = value.parse().map_err(|_| {
                    Error::Storage(format!("corrupt {} value: {}", META_EMBEDDING_DIM, value))
                })?;
                if stored_dim != embedding_dim {
                    return Err(Error::Config(format!(
                        "store was created with embedding dimension {}, configured {}",
                        stored_dim, embedding_dim
                    )));
                }
            }
            None => {
                conn.execute(
                    "INSERT INTO store_meta (key, value) VALUES (?1, ?2)",
                    params![META_EMBEDDING_DIM, embedding_dim.to_string()],
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            }
        }
        Ok(())
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    fn check_len(&self, embedding: &Array1<f32>) -> Result<()> {
        if embedding.len() != self.embedding_dim {
            return Err(Error::DimensionMismatch {
                expected: self.embedding_dim,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    // ---------------------------------------------------------------
    // Profile writes
    // ---------------------------------------------------------------

    /// Upsert a supervisor, its field embeddings and its interest rows as one
    /// transaction. Any failure rolls back every change made for the profile.
    pub fn write_profile(&self, write: &ProfileWrite) -> Result<()> {
        let now = now_millis();
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;

        Self::upsert_supervisor(&tx, &write.supervisor, now)?;

        for (field, embedding) in &write.field_embeddings {
            self.check_len(embedding)?;
            tx.prepare_cached(
                "INSERT INTO supervisor_embeddings (supervisor_id, embedding_type, embedding, created_at) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT (supervisor_id, embedding_type) \
                 DO UPDATE SET embedding = excluded.embedding, created_at = excluded.created_at",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .execute(params![
                write.supervisor.id,
                field.as_str(),
                encode_vector(embedding),
                now
            ])
            .map_err(|e| Error::Database(e.to_string()))?;
        }

        tx.execute(
            "DELETE FROM research_interests WHERE supervisor_id = ?1",
            params![write.supervisor.id],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        for (interest, embedding) in &write.interests {
            self.check_len(embedding)?;
            tx.prepare_cached(
                "INSERT INTO research_interests (supervisor_id, interest, embedding, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .execute(params![
                write.supervisor.id,
                interest,
                encode_vector(embedding),
                now
            ])
            .map_err(|e| Error::Database(e.to_string()))?;
        }

        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        if !write.field_embeddings.is_empty() {
            self.bump_generation();
        }
        debug!(
            "Wrote supervisor {} ({} field embeddings, {} interests)",
            write.supervisor.id,
            write.field_embeddings.len(),
            write.interests.len()
        );
        Ok(())
    }

    fn upsert_supervisor(conn: &Connection, record: &SupervisorRecord, now: i64) -> Result<()> {
        let profile_json = serde_json::to_string(&record.profile)?;
        conn.prepare_cached(
            "INSERT INTO supervisors (id, name, position, department, email, profile_json, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
             ON CONFLICT (id) DO UPDATE SET \
               name = excluded.name, \
               position = excluded.position, \
               department = excluded.department, \
               email = excluded.email, \
               profile_json = excluded.profile_json, \
               updated_at = excluded.updated_at",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            record.id,
            record.name,
            record.position,
            record.department,
            record.email,
            profile_json,
            now
        ])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a supervisor; field and interest embeddings cascade.
    pub fn delete_supervisor(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM supervisors WHERE id = ?1", params![id])
            .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);
        if count > 0 {
            self.bump_generation();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Get a supervisor by ID.
    pub fn get_supervisor(&self, id: &str) -> Result<Option<Supervisor>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM supervisors WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![id], |row| Ok(Self::row_to_supervisor(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// Count total supervisors.
    pub fn count_supervisors(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM supervisors")
    }

    fn count(&self, sql: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(sql, [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Stored field vector for one supervisor, if any.
    pub fn get_field_embedding(
        &self,
        supervisor_id: &str,
        field: FieldType,
    ) -> Result<Option<Array1<f32>>> {
        let conn = self.conn.lock();
        let blob: Option<Vec<u8>> = conn
            .prepare_cached(
                "SELECT embedding FROM supervisor_embeddings \
                 WHERE supervisor_id = ?1 AND embedding_type = ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![supervisor_id, field.as_str()], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        blob.map(|b| decode_vector(&b, self.embedding_dim)).transpose()
    }

    /// Field types that currently have a stored vector for this supervisor.
    pub fn field_types_for(&self, supervisor_id: &str) -> Result<Vec<FieldType>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT embedding_type FROM supervisor_embeddings WHERE supervisor_id = ?1",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![supervisor_id], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut fields = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| Error::Database(e.to_string()))?;
            fields.push(raw.parse::<FieldType>()?);
        }
        fields.sort();
        Ok(fields)
    }

    /// Interest rows for one supervisor, in insertion order.
    pub fn get_interest_embeddings(&self, supervisor_id: &str) -> Result<Vec<InterestEmbedding>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT supervisor_id, interest, embedding FROM research_interests \
                 WHERE supervisor_id = ?1 ORDER BY id",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![supervisor_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            let (supervisor_id, interest, blob) = row.map_err(|e| Error::Database(e.to_string()))?;
            out.push(InterestEmbedding {
                supervisor_id,
                interest,
                embedding: decode_vector(&blob, self.embedding_dim)?,
            });
        }
        Ok(out)
    }

    // ---------------------------------------------------------------
    // Similarity
    // ---------------------------------------------------------------

    fn load_field_matrix(&self, field: FieldType, generation: u64) -> Result<FieldMatrix> {
        let mut supervisor_ids = Vec::new();
        let mut embeddings: Vec<Array1<f32>> = Vec::new();

        {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare_cached(
                    "SELECT supervisor_id, embedding FROM supervisor_embeddings \
                     WHERE embedding_type = ?1 ORDER BY supervisor_id",
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            let rows = stmt
                .query_map(params![field.as_str()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })
                .map_err(|e| Error::Database(e.to_string()))?;

            for row in rows {
                let (sid, blob) = row.map_err(|e| Error::Database(e.to_string()))?;
                // Zero vectors have no direction; they can't be ranked.
                if let Some(unit) = normalize(&decode_vector(&blob, self.embedding_dim)?) {
                    supervisor_ids.push(sid);
                    embeddings.push(unit);
                }
            }
        }

        let mut matrix = Array2::zeros((embeddings.len(), self.embedding_dim));
        for (i, emb) in embeddings.iter().enumerate() {
            matrix.row_mut(i).assign(emb);
        }
        debug!("Loaded {} {} embeddings into matrix", supervisor_ids.len(), field);

        Ok(FieldMatrix {
            matrix,
            supervisor_ids,
            generation,
        })
    }

    /// Cosine similarity of `query` against every stored vector of `field`.
    ///
    /// Returns one entry per supervisor that has a (non-zero) vector for the
    /// field, in supervisor ID order. A zero query has no direction and
    /// matches nothing.
    pub fn field_similarities(
        &self,
        field: FieldType,
        query: &Array1<f32>,
    ) -> Result<Vec<FieldSimilarity>> {
        self.check_len(query)?;
        let q = match normalize(query) {
            Some(q) => q,
            None => return Ok(Vec::new()),
        };

        let current = self.generation.load(Ordering::SeqCst);
        {
            let matrices = self.matrices.lock();
            if let Some(m) = matrices.get(&field) {
                if m.generation == current {
                    return Ok(Self::score_matrix(m, &q));
                }
            }
        }

        let fresh = self.load_field_matrix(field, current)?;
        let scores = Self::score_matrix(&fresh, &q);
        self.matrices.lock().insert(field, fresh);
        Ok(scores)
    }

    fn score_matrix(m: &FieldMatrix, q: &Array1<f32>) -> Vec<FieldSimilarity> {
        if m.matrix.nrows() == 0 {
            return Vec::new();
        }
        // (N, dim) @ (dim,) → (N,)
        let similarities = m.matrix.dot(q);
        m.supervisor_ids
            .iter()
            .zip(similarities.iter())
            .map(|(id, &s)| FieldSimilarity {
                supervisor_id: id.clone(),
                similarity: s as f64,
            })
            .collect()
    }

    /// Rank individual interest rows against `query`.
    pub fn interest_similarities(
        &self,
        query: &Array1<f32>,
        limit: usize,
    ) -> Result<Vec<InterestMatch>> {
        self.check_len(query)?;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT supervisor_id, interest, embedding FROM research_interests")
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut matches = Vec::new();
        for row in rows {
            let (supervisor_id, interest, blob) = row.map_err(|e| Error::Database(e.to_string()))?;
            // None for zero rows and for a zero query.
            let stored = decode_vector(&blob, self.embedding_dim)?;
            if let Some(similarity) = cosine_similarity(&stored, query) {
                matches.push(InterestMatch {
                    supervisor_id,
                    interest,
                    similarity,
                });
            }
        }
        drop(stmt);
        drop(conn);

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.supervisor_id.cmp(&b.supervisor_id))
                .then_with(|| a.interest.cmp(&b.interest))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    // ---------------------------------------------------------------
    // Embedding cache
    // ---------------------------------------------------------------

    /// Look up a cached vector by text hash, refreshing `last_used` on a hit.
    pub fn cache_get(&self, text_hash: &str) -> Result<Option<Array1<f32>>> {
        let conn = self.conn.lock();
        let blob: Option<Vec<u8>> = conn
            .prepare_cached("SELECT embedding FROM embedding_cache WHERE text_hash = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![text_hash], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        let blob = match blob {
            Some(b) => b,
            None => return Ok(None),
        };

        // The vector is valid even if the timestamp can't move.
        let touched = conn
            .prepare_cached("UPDATE embedding_cache SET last_used = ?1 WHERE text_hash = ?2")
            .and_then(|mut stmt| stmt.execute(params![now_millis(), text_hash]));
        if let Err(e) = touched {
            warn!("Failed to refresh last_used for cache entry {}: {}", text_hash, e);
        }

        decode_vector(&blob, self.embedding_dim).map(Some)
    }

    /// Store a vector under `text_hash`. If another writer got there first the
    /// existing vector is kept and only `last_used` moves.
    pub fn cache_put(&self, text_hash: &str, text_preview: &str, embedding: &Array1<f32>) -> Result<()> {
        self.check_len(embedding)?;
        let now = now_millis();
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO embedding_cache (text_hash, text, embedding, created_at, last_used) \
             VALUES (?1, ?2, ?3, ?4, ?4) \
             ON CONFLICT (text_hash) DO UPDATE SET last_used = excluded.last_used",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![text_hash, text_preview, encode_vector(embedding), now])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// `last_used` timestamp (ms) of a cache entry.
    pub fn cache_last_used(&self, text_hash: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        let last_used = conn
            .prepare_cached("SELECT last_used FROM embedding_cache WHERE text_hash = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![text_hash], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(last_used)
    }

    /// Delete cache entries not used since `cutoff_millis`. Returns the count removed.
    pub fn prune_embedding_cache(&self, cutoff_millis: i64) -> Result<usize> {
        let conn = self.conn.lock();
        let removed = conn
            .execute(
                "DELETE FROM embedding_cache WHERE last_used < ?1",
                params![cutoff_millis],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        if removed > 0 {
            info!("Pruned {} embedding cache entries", removed);
        }
        Ok(removed)
    }

    pub fn count_cache_entries(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM embedding_cache")
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let supervisors = self.count_supervisors()?;
        let field_embeddings = self.count("SELECT COUNT(*) FROM supervisor_embeddings")?;
        let interest_embeddings = self.count("SELECT COUNT(*) FROM research_interests")?;
        let cache_entries = self.count_cache_entries()?;

        let db_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(StoreStats {
            supervisors,
            field_embeddings,
            interest_embeddings,
            cache_entries,
            embedding_dimension: self.embedding_dim,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
        })
    }

    // ---------------------------------------------------------------
    // Row Mapping Helpers
    // ---------------------------------------------------------------

    fn row_to_supervisor(row: &rusqlite::Row<'_>) -> Supervisor {
        Supervisor {
            id: row.get("id").unwrap_or_default(),
            name: row.get("name").ok().flatten(),
            position: row.get("position").ok().flatten(),
            department: row.get("department").ok().flatten(),
            email: row.get("email").ok().flatten(),
            profile: row
                .get::<_, String>("profile_json")
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or(serde_json::Value::Null),
            created_at: row.get("created_at").unwrap_or(0),
            updated_at: row.get("updated_at").unwrap_or(0),
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
