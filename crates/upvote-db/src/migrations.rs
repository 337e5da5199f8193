use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            name        TEXT NOT NULL,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS features (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL CHECK (length(title) <= 100),
            description TEXT NOT NULL CHECK (length(description) <= 500),
            status      TEXT NOT NULL DEFAULT 'open'
                        CHECK (status IN ('open', 'planned', 'in_progress', 'done')),
            creator_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_features_status
            ON features(status, created_at);

        -- One row per (user, feature): a vote is a flag, not a counter
        CREATE TABLE IF NOT EXISTS votes (
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            feature_id  TEXT NOT NULL REFERENCES features(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            PRIMARY KEY (user_id, feature_id)
        );

        CREATE INDEX IF NOT EXISTS idx_votes_feature
            ON votes(feature_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
