//! SQL schema for the attest SQLite store.
//!
//! Executed once at connection startup. Future migrations will be
//! gated on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id    TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    department     TEXT NOT NULL,
    email          TEXT NOT NULL UNIQUE,
    embedding_json TEXT,            -- JSON-encoded Embedding; NULL for legacy rows
    enrolled_at    TEXT NOT NULL    -- ISO 8601 UTC
);

-- Attendance is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS attendance (
    event_id      TEXT PRIMARY KEY,
    identity_id   TEXT NOT NULL REFERENCES identities(identity_id),
    identity_name TEXT NOT NULL,    -- snapshot at write time, never backfilled
    kind          TEXT NOT NULL,    -- 'check-in' | 'check-out'
    confidence    REAL NOT NULL,
    timestamp     TEXT NOT NULL     -- ISO 8601 UTC
);

CREATE INDEX IF NOT EXISTS attendance_identity_idx  ON attendance(identity_id);
CREATE INDEX IF NOT EXISTS attendance_timestamp_idx ON attendance(timestamp);

PRAGMA user_version = 1;
";
