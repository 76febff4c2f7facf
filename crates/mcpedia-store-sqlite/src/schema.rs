//! SQL schema for the MCPedia SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision so future migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS` / `OR IGNORE`.
///
/// The full-text index is a standalone FTS5 table whose rowid is the entry
/// id. It is written by hand in the same transaction as the entry row rather
/// than through triggers.
pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS entries (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    slug        TEXT    NOT NULL UNIQUE CHECK (length(slug) > 0),
    title       TEXT    NOT NULL CHECK (length(title) > 0),
    description TEXT    NOT NULL DEFAULT '',
    content     TEXT    NOT NULL
                CHECK (length(content) > 0 AND length(CAST(content AS BLOB)) <= 32768),
    kind        TEXT    NOT NULL DEFAULT 'skill'
                CHECK (kind IN ('skill', 'rule', 'context', 'pattern', 'reference', 'guide')),
    language    TEXT    NOT NULL DEFAULT '',
    domain      TEXT    NOT NULL DEFAULT '',
    project     TEXT    NOT NULL DEFAULT '',
    version     INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT    NOT NULL,   -- RFC 3339 UTC, set once
    updated_at  TEXT    NOT NULL    -- RFC 3339 UTC, refreshed on every update
);

CREATE TABLE IF NOT EXISTS tags (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT    NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS entry_tags (
    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    tag_id   INTEGER NOT NULL REFERENCES tags(id)    ON DELETE CASCADE,
    PRIMARY KEY (entry_id, tag_id)
);

CREATE TABLE IF NOT EXISTS entry_stats (
    entry_id       INTEGER PRIMARY KEY REFERENCES entries(id) ON DELETE CASCADE,
    reads          INTEGER NOT NULL DEFAULT 0,
    searches       INTEGER NOT NULL DEFAULT 0,
    updates        INTEGER NOT NULL DEFAULT 0,
    last_read_at   TEXT,
    last_search_at TEXT,
    last_update_at TEXT
);

-- Single-row write lock. `token` holds an argon2 PHC string, never the secret.
CREATE TABLE IF NOT EXISTS lock (
    id     INTEGER PRIMARY KEY CHECK (id = 1),
    active INTEGER NOT NULL DEFAULT 0,
    token  TEXT    NOT NULL DEFAULT ''
);
INSERT OR IGNORE INTO lock (id, active, token) VALUES (1, 0, '');

CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts USING fts5(
    title,
    description,
    content,
    tokenize = 'porter unicode61'
);

CREATE INDEX IF NOT EXISTS entries_kind_idx     ON entries(kind);
CREATE INDEX IF NOT EXISTS entries_language_idx ON entries(language);
CREATE INDEX IF NOT EXISTS entries_domain_idx   ON entries(domain);
CREATE INDEX IF NOT EXISTS entries_project_idx  ON entries(project);
CREATE INDEX IF NOT EXISTS entries_title_idx    ON entries(title);
CREATE INDEX IF NOT EXISTS entry_tags_tag_idx   ON entry_tags(tag_id);

PRAGMA user_version = 1;
";

/// How long SQLite waits on a competing writer before reporting `SQLITE_BUSY`.
pub const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
