//! Database schema and migrations for Nimbus.
//!
//! Migrations are applied in order; the `schema_version` table records
//! how many have run. Timestamps are always bound from Rust as UTC.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: accounts
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL UNIQUE,    -- stored lowercased
    full_name   TEXT NOT NULL DEFAULT '',
    password    TEXT NOT NULL,           -- Argon2 hash
    is_admin    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE INDEX idx_users_created_at ON users(created_at);
"#,
    // v2: file records
    r#"
CREATE TABLE files (
    id                  BLOB PRIMARY KEY,            -- UUID
    owner_id            INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    original_name       TEXT NOT NULL,
    stored_name         TEXT NOT NULL UNIQUE,
    size_bytes          INTEGER NOT NULL,
    comment             TEXT NOT NULL DEFAULT '',
    uploaded_at         TEXT NOT NULL,
    last_downloaded_at  TEXT,
    download_token      BLOB NOT NULL UNIQUE         -- UUID, public link
);

CREATE INDEX idx_files_owner_id ON files(owner_id);
"#,
    // v3: refresh tokens
    r#"
CREATE TABLE refresh_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    revoked_at  TEXT
);

CREATE INDEX idx_refresh_tokens_user_id ON refresh_tokens(user_id);
"#,
];
