//! Schema migrations tracked with `PRAGMA user_version`.

use oxicoach_training::repository::{RepositoryError, RepositoryResult};
use rusqlite::Connection;

const V001_INITIAL: &str = "
    CREATE TABLE IF NOT EXISTS games (
        username     TEXT NOT NULL,
        platform     TEXT NOT NULL,
        game_id      TEXT NOT NULL,
        played_at    TEXT NOT NULL,
        white        TEXT NOT NULL,
        black        TEXT NOT NULL,
        result       TEXT NOT NULL,
        move_text    TEXT NOT NULL,
        opening      TEXT,
        time_control TEXT,
        PRIMARY KEY (username, platform, game_id)
    );

    CREATE TABLE IF NOT EXISTS items (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        username    TEXT NOT NULL,
        platform    TEXT NOT NULL,
        game_id     TEXT NOT NULL,
        ply         INTEGER NOT NULL,
        fen_before  TEXT NOT NULL,
        played_uci  TEXT NOT NULL,
        best_uci    TEXT NOT NULL,
        pv_uci      TEXT NOT NULL DEFAULT '',
        tags        TEXT NOT NULL DEFAULT '',
        swing_cp    INTEGER NOT NULL,
        created_at  TEXT NOT NULL,
        UNIQUE (username, platform, game_id, ply)
    );

    CREATE TABLE IF NOT EXISTS item_stats (
        item_id         INTEGER PRIMARY KEY REFERENCES items(id),
        attempts        INTEGER NOT NULL DEFAULT 0,
        solved          INTEGER NOT NULL DEFAULT 0,
        last_attempt_at TEXT
    );

    CREATE TABLE IF NOT EXISTS checkins (
        username TEXT NOT NULL,
        day      TEXT NOT NULL,
        fatigue  INTEGER NOT NULL,
        note     TEXT,
        PRIMARY KEY (username, day)
    );

    CREATE TABLE IF NOT EXISTS reviews (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        username  TEXT NOT NULL,
        item_id   INTEGER NOT NULL REFERENCES items(id),
        due_date  TEXT NOT NULL,
        done      INTEGER NOT NULL DEFAULT 0,
        UNIQUE (username, item_id, due_date)
    );

    CREATE TABLE IF NOT EXISTS weekly_curriculum (
        username     TEXT NOT NULL,
        start_date   TEXT NOT NULL,
        payload_json TEXT NOT NULL,
        PRIMARY KEY (username, start_date)
    );
";

const V002_INDEXES: &str = "
    CREATE INDEX IF NOT EXISTS idx_games_user_played ON games(username, played_at DESC);
    CREATE INDEX IF NOT EXISTS idx_games_user_opening ON games(username, opening);
    CREATE INDEX IF NOT EXISTS idx_items_user_created ON items(username, created_at DESC);
    CREATE INDEX IF NOT EXISTS idx_items_user_game ON items(username, game_id, ply);
    CREATE INDEX IF NOT EXISTS idx_stats_solved ON item_stats(solved, attempts);
    CREATE INDEX IF NOT EXISTS idx_reviews_user_due ON reviews(username, done, due_date);
";

const MIGRATIONS: &[(&str, u32)] = &[(V001_INITIAL, 1), (V002_INDEXES, 2)];

pub(crate) const LATEST_VERSION: u32 = 2;

fn migration_err(version: u32, err: &rusqlite::Error) -> RepositoryError {
    RepositoryError::Backend {
        message: format!("migration v{version:03} failed: {err}"),
    }
}

/// Applies every migration newer than the stored schema version.
///
/// A database written by a newer schema than [`LATEST_VERSION`] is refused.
pub(crate) fn run_migrations(conn: &Connection) -> RepositoryResult<()> {
    let current = current_version(conn)?;
    if current > LATEST_VERSION {
        return Err(RepositoryError::Backend {
            message: format!("database schema v{current:03} is newer than supported v{LATEST_VERSION:03}"),
        });
    }

    for &(sql, version) in MIGRATIONS {
        if current >= version {
            continue;
        }
        conn.execute_batch(sql)
            .map_err(|e| migration_err(version, &e))?;
        conn.pragma_update(None, "user_version", version)
            .map_err(|e| migration_err(version, &e))?;
        tracing::info!(version, "applied migration");
    }
    Ok(())
}

pub(crate) fn current_version(conn: &Connection) -> RepositoryResult<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| crate::to_storage_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", LATEST_VERSION + 1).unwrap();
        let err = run_migrations(&conn).unwrap_err();
        assert!(matches!(err, RepositoryError::Backend { .. }));
        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION + 1);
    }
}
