//! SQL DDL for initializing the local store.

/// SQLite schema includes:
/// - `sync_queue` + `sync_queue_fields` (pending writes and their ordered body fields)
/// - `stories` (mirror of the last successful list fetch)
/// - `favorites` (user-curated stories, independent of the mirror)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Pending writes. AUTOINCREMENT keeps ids monotonic and never reused.
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sync_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    method TEXT NOT NULL,
    headers TEXT NOT NULL DEFAULT '{}', -- JSON object
    created_at TEXT NOT NULL -- RFC3339
);

CREATE TABLE IF NOT EXISTS sync_queue_fields (
    entry_id INTEGER NOT NULL REFERENCES sync_queue(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    text_value TEXT NULL,
    bytes BLOB NULL, -- set for binary fields only
    filename TEXT NULL,
    content_type TEXT NULL,
    PRIMARY KEY (entry_id, position)
);

-- ---------------------------------------------------------------------------
-- Story mirror (fully replaced on every successful list fetch)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS stories (
    id TEXT PRIMARY KEY NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    photo_url TEXT NOT NULL,
    created_at TEXT NOT NULL, -- RFC3339
    lat REAL NULL,
    lon REAL NULL
);

-- ---------------------------------------------------------------------------
-- Favorites (never evicted by mirror refresh)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS favorites (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    photo_url TEXT NOT NULL,
    created_at TEXT NOT NULL, -- RFC3339
    lat REAL NULL,
    lon REAL NULL,
    favorited_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_favorites_favorited_at ON favorites(favorited_at);
"#;
