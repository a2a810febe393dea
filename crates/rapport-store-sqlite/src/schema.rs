//! SQL schema for the Rapport SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id    TEXT PRIMARY KEY,
    username   TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- Subjects are soft-deleted: deleted_at is set and the row kept, so the
-- activity history of a record outlives the record itself.
CREATE TABLE IF NOT EXISTS subjects (
    subject_id   TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL REFERENCES users(user_id),
    subject_kind TEXT NOT NULL,   -- discriminant of SubjectDetails variant
    access       TEXT NOT NULL DEFAULT 'public',
    details_json TEXT NOT NULL,   -- JSON payload (inner data only)
    created_at   TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    updated_at   TEXT NOT NULL,
    deleted_at   TEXT
);

CREATE TABLE IF NOT EXISTS permissions (
    permission_id TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES users(user_id),
    subject_kind  TEXT NOT NULL,
    subject_id    TEXT NOT NULL REFERENCES subjects(subject_id),
    created_at    TEXT NOT NULL,
    UNIQUE (user_id, subject_id)
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id   TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    subject_kind TEXT NOT NULL,
    subject_id   TEXT NOT NULL REFERENCES subjects(subject_id),
    body         TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

-- Append-only, with two exceptions: a re-viewed 'viewed' row has its
-- updated_at touched in place, and a subject's 'viewed' rows are purged
-- when the subject is deleted.
CREATE TABLE IF NOT EXISTS activities (
    activity_id  TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    subject_kind TEXT NOT NULL,
    subject_id   TEXT NOT NULL,
    action       TEXT NOT NULL,   -- 'created'|'updated'|'deleted'|'viewed'|'commented'
    info         TEXT NOT NULL DEFAULT '',
    private      INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- At most one 'viewed' row per user and subject.
CREATE UNIQUE INDEX IF NOT EXISTS activities_viewed_idx
    ON activities(user_id, subject_id) WHERE action = 'viewed';

CREATE INDEX IF NOT EXISTS activities_user_idx    ON activities(user_id);
CREATE INDEX IF NOT EXISTS activities_action_idx  ON activities(action);
CREATE INDEX IF NOT EXISTS activities_created_idx ON activities(created_at);
CREATE INDEX IF NOT EXISTS subjects_kind_idx      ON subjects(subject_kind);
CREATE INDEX IF NOT EXISTS permissions_user_idx   ON permissions(user_id);

PRAGMA user_version = 1;
";
