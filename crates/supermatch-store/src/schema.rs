//! Database schema SQL.

/// Core tables: supervisors, supervisor_embeddings, research_interests, embedding_cache.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS supervisors (
    id TEXT PRIMARY KEY,
    name TEXT,
    position TEXT,
    department TEXT,
    email TEXT,
    profile_json TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS supervisor_embeddings (
    supervisor_id TEXT NOT NULL REFERENCES supervisors(id) ON DELETE CASCADE,
    embedding_type TEXT NOT NULL
        CHECK (embedding_type IN ('research_interests', 'expertise', 'publications')),
    embedding BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (supervisor_id, embedding_type)
);

CREATE INDEX IF NOT EXISTS idx_supervisor_embeddings_type
    ON supervisor_embeddings(embedding_type);

CREATE TABLE IF NOT EXISTS research_interests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    supervisor_id TEXT NOT NULL REFERENCES supervisors(id) ON DELETE CASCADE,
    interest TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_research_interests_supervisor
    ON research_interests(supervisor_id);

CREATE TABLE IF NOT EXISTS embedding_cache (
    text_hash TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    last_used INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_embedding_cache_last_used
    ON embedding_cache(last_used);
"#;

/// `store_meta` key holding the vector dimension the store was created with.
pub const META_EMBEDDING_DIM: &str = "embedding_dimension";
