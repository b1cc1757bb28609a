//! SQL schema for the Keeper SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,
    email          TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash  TEXT NOT NULL,            -- argon2 PHC string
    email_verified INTEGER NOT NULL DEFAULT 1,
    created_at     TEXT NOT NULL
);

-- Only digests of the tokens are kept; the tokens themselves are handed to
-- the client once and never stored.
CREATE TABLE IF NOT EXISTS sessions (
    session_id   TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    access_hash  TEXT NOT NULL UNIQUE,     -- hex SHA-256
    refresh_hash TEXT NOT NULL UNIQUE,     -- hex SHA-256
    expires_at   TEXT NOT NULL,            -- RFC 3339 UTC
    created_at   TEXT NOT NULL
);

-- One row per user. Rows are deactivated, never deleted.
CREATE TABLE IF NOT EXISTS profiles (
    user_id           TEXT PRIMARY KEY REFERENCES users(user_id) ON DELETE CASCADE,
    email             TEXT NOT NULL,
    full_name         TEXT NOT NULL,
    employee_id       TEXT NOT NULL,
    role              TEXT NOT NULL
                      CHECK (role IN ('admin', 'employee', 'hexanurse', 'security')),
    department        TEXT NOT NULL,
    phone             TEXT,
    emergency_contact TEXT,
    floor_number      INTEGER NOT NULL,
    office_location   TEXT NOT NULL,
    privacy_settings  TEXT NOT NULL DEFAULT '{}',  -- JSON object
    is_active         INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_user_idx ON sessions(user_id);
CREATE INDEX IF NOT EXISTS profiles_role_idx ON profiles(role);

PRAGMA user_version = 1;
";
