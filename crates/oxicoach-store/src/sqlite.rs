use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use oxicoach_board::join_uci;
use oxicoach_tactics::{
    game::Game,
    motif::{MotifSet, MotifTag},
};
use oxicoach_training::{
    curriculum::WeeklyCurriculum,
    diagnostics::OpeningStat,
    fatigue::Fatigue,
    item::{ItemId, ItemStat, NewTrainingItem, TrainingItem},
    repository::{
        Capabilities, CheckinStore, CurriculumStore, GameStore, ItemStore, RepositoryError,
        RepositoryResult, ReviewStore,
    },
    review::{ReviewEntry, ReviewId},
};
use rusqlite::{Connection, OptionalExtension as _, Params, params};

use crate::{
    migrations,
    rows::{
        GAME_COLUMNS, GameRow, ITEM_COLUMNS, ITEM_FROM, ItemRow, REVIEW_COLUMNS, ReviewRow,
        format_day, format_timestamp, sql_int,
    },
    to_storage_err,
};

/// [`Repository`](oxicoach_training::repository::Repository) backed by one SQLite
/// connection.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Opens (creating if needed) the database at `path` and migrates it.
    pub fn open(path: &Path) -> RepositoryResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        tracing::debug!(path = %path.display(), "opened database");
        Self::initialize(conn)
    }

    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> RepositoryResult<Self> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> RepositoryResult<u32> {
        migrations::current_version(&self.conn)
    }

    fn query_games<P: Params>(&self, filter: &str, params: P) -> RepositoryResult<Vec<Game>> {
        let sql = format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE {filter} ORDER BY played_at DESC, game_id ASC LIMIT ?"
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(params, GameRow::read)
            .map_err(|e| to_storage_err(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| to_storage_err(e.to_string()))?;
        rows.into_iter().map(GameRow::into_game).collect()
    }

    fn query_items<P: Params>(
        &self,
        filter: &str,
        order: &str,
        params: P,
    ) -> RepositoryResult<Vec<TrainingItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM {ITEM_FROM} WHERE {filter} ORDER BY {order}");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(params, ItemRow::read)
            .map_err(|e| to_storage_err(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| to_storage_err(e.to_string()))?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }

    fn item_exists(&self, id: ItemId) -> RepositoryResult<bool> {
        self.conn
            .query_row("SELECT 1 FROM items WHERE id = ?1", params![id.0], |_| Ok(()))
            .optional()
            .map(|found| found.is_some())
            .map_err(|e| to_storage_err(e.to_string()))
    }
}

impl GameStore for SqliteRepository {
    fn save_games(&mut self, username: &str, games: &[Game]) -> RepositoryResult<usize> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| to_storage_err(e.to_string()))?;
        let mut saved = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO games
                     (username, platform, game_id, played_at, white, black, result, move_text, opening, time_control)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
            for game in games {
                saved += stmt
                    .execute(params![
                        username,
                        game.platform,
                        game.game_id,
                        format_timestamp(game.played_at),
                        game.white,
                        game.black,
                        game.result,
                        game.move_text,
                        game.opening,
                        game.time_control,
                    ])
                    .map_err(|e| to_storage_err(e.to_string()))?;
            }
        }
        tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
        Ok(saved)
    }

    fn recent_games(&self, username: &str, limit: usize) -> RepositoryResult<Vec<Game>> {
        self.query_games("username = ?1", params![username, sql_int(limit)])
    }

    fn games_by_opening(
        &self,
        username: &str,
        opening: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<Game>> {
        self.query_games(
            "username = ?1 AND opening = ?2",
            params![username, opening, sql_int(limit)],
        )
    }

    fn opening_stats(&self, username: &str, limit: usize) -> RepositoryResult<Vec<OpeningStat>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT opening, COUNT(*) AS n FROM games
                 WHERE username = ?1 AND opening IS NOT NULL
                 GROUP BY opening ORDER BY n DESC, opening ASC LIMIT ?2",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(params![username, sql_int(limit)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| to_storage_err(e.to_string()))?;
        rows.map(|row| {
            let (opening, count) = row.map_err(|e| to_storage_err(e.to_string()))?;
            Ok(OpeningStat {
                opening,
                count: usize::try_from(count).unwrap_or(0),
            })
        })
        .collect()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            opening_stats: true,
        }
    }
}

impl ItemStore for SqliteRepository {
    fn insert_items(
        &mut self,
        username: &str,
        items: Vec<NewTrainingItem>,
    ) -> RepositoryResult<Vec<ItemId>> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| to_storage_err(e.to_string()))?;
        let mut ids = Vec::new();
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO items
                     (username, platform, game_id, ply, fen_before, played_uci, best_uci, pv_uci, tags, swing_cp, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
            for item in items {
                let inserted = stmt
                    .execute(params![
                        username,
                        item.platform,
                        item.game_id,
                        sql_int(item.ply),
                        item.fen_before,
                        item.played.to_string(),
                        item.best.to_string(),
                        join_uci(&item.pv),
                        item.tags.to_string(),
                        item.swing_cp,
                        format_timestamp(item.created_at),
                    ])
                    .map_err(|e| to_storage_err(e.to_string()))?;
                if inserted == 1 {
                    ids.push(ItemId(tx.last_insert_rowid()));
                }
            }
        }
        tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
        Ok(ids)
    }

    fn item(&self, id: ItemId) -> RepositoryResult<Option<TrainingItem>> {
        Ok(self
            .query_items("i.id = ?1", "i.id", params![id.0])?
            .into_iter()
            .next())
    }

    fn recent_items(&self, username: &str, limit: usize) -> RepositoryResult<Vec<TrainingItem>> {
        self.query_items(
            "i.username = ?1",
            "i.created_at DESC, i.id DESC LIMIT ?2",
            params![username, sql_int(limit)],
        )
    }

    fn set_tags(&mut self, id: ItemId, tags: MotifSet) -> RepositoryResult<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE items SET tags = ?2 WHERE id = ?1 AND tags = ''",
                params![id.0, tags.to_string()],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        if updated == 0 && !self.item_exists(id)? {
            return Err(RepositoryError::ItemNotFound { id });
        }
        Ok(updated == 1)
    }

    fn record_attempt(
        &mut self,
        id: ItemId,
        solved: bool,
        at: DateTime<Utc>,
    ) -> RepositoryResult<ItemStat> {
        if !self.item_exists(id)? {
            return Err(RepositoryError::ItemNotFound { id });
        }
        // solved stays set once reached
        self.conn
            .execute(
                "INSERT INTO item_stats (item_id, attempts, solved, last_attempt_at)
                 VALUES (?1, 1, ?2, ?3)
                 ON CONFLICT(item_id) DO UPDATE SET
                     attempts = attempts + 1,
                     solved = MAX(solved, excluded.solved),
                     last_attempt_at = excluded.last_attempt_at",
                params![id.0, solved, format_timestamp(at)],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        self.item(id)?
            .map(|item| item.stat)
            .ok_or(RepositoryError::ItemNotFound { id })
    }

    fn items_by_tag(
        &self,
        username: &str,
        tag: MotifTag,
        limit: usize,
    ) -> RepositoryResult<Vec<TrainingItem>> {
        self.query_items(
            "i.username = ?1 AND (',' || i.tags || ',') LIKE ('%,' || ?2 || ',%')",
            "i.swing_cp DESC, i.id ASC LIMIT ?3",
            params![username, tag.as_str(), sql_int(limit)],
        )
    }

    fn items_by_game(
        &self,
        username: &str,
        game_id: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<TrainingItem>> {
        self.query_items(
            "i.username = ?1 AND i.game_id = ?2",
            "i.ply ASC LIMIT ?3",
            params![username, game_id, sql_int(limit)],
        )
    }

    fn unresolved_items(
        &self,
        username: &str,
        tags: &[MotifTag],
        limit: usize,
    ) -> RepositoryResult<Vec<ItemId>> {
        let wanted: MotifSet = tags.iter().copied().collect();
        let candidates = self.query_items(
            "i.username = ?1 AND COALESCE(s.solved, 0) = 0 AND i.tags != ''",
            "COALESCE(s.attempts, 0) DESC, i.swing_cp DESC, i.id ASC",
            params![username],
        )?;
        Ok(candidates
            .into_iter()
            .filter(|item| item.tags.intersects(wanted))
            .take(limit)
            .map(|item| item.id)
            .collect())
    }
}

impl ReviewStore for SqliteRepository {
    fn review_exists(
        &self,
        username: &str,
        item_id: ItemId,
        due_date: NaiveDate,
    ) -> RepositoryResult<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM reviews WHERE username = ?1 AND item_id = ?2 AND due_date = ?3",
                params![username, item_id.0, format_day(due_date)],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(|e| to_storage_err(e.to_string()))
    }

    fn add_review(
        &mut self,
        username: &str,
        item_id: ItemId,
        due_date: NaiveDate,
    ) -> RepositoryResult<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO reviews (username, item_id, due_date) VALUES (?1, ?2, ?3)",
                params![username, item_id.0, format_day(due_date)],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        Ok(inserted == 1)
    }

    fn due_reviews(
        &self,
        username: &str,
        date: NaiveDate,
        limit: usize,
    ) -> RepositoryResult<Vec<ReviewEntry>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             WHERE username = ?1 AND done = 0 AND due_date <= ?2
             ORDER BY due_date ASC, id ASC LIMIT ?3"
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(
                params![username, format_day(date), sql_int(limit)],
                ReviewRow::read,
            )
            .map_err(|e| to_storage_err(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| to_storage_err(e.to_string()))?;
        rows.into_iter().map(ReviewRow::into_entry).collect()
    }

    fn mark_review_done(&mut self, id: ReviewId) -> RepositoryResult<()> {
        let updated = self
            .conn
            .execute("UPDATE reviews SET done = 1 WHERE id = ?1", params![id.0])
            .map_err(|e| to_storage_err(e.to_string()))?;
        if updated == 0 {
            return Err(RepositoryError::ReviewNotFound { id });
        }
        Ok(())
    }
}

impl CheckinStore for SqliteRepository {
    fn save_checkin(
        &mut self,
        username: &str,
        day: NaiveDate,
        fatigue: Fatigue,
        note: Option<&str>,
    ) -> RepositoryResult<()> {
        self.conn
            .execute(
                "INSERT INTO checkins (username, day, fatigue, note) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(username, day) DO UPDATE SET fatigue = excluded.fatigue, note = excluded.note",
                params![username, format_day(day), fatigue.level(), note],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        Ok(())
    }

    fn checkin(&self, username: &str, day: NaiveDate) -> RepositoryResult<Option<Fatigue>> {
        let level: Option<u8> = self
            .conn
            .query_row(
                "SELECT fatigue FROM checkins WHERE username = ?1 AND day = ?2",
                params![username, format_day(day)],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| to_storage_err(e.to_string()))?;
        Ok(level.map(Fatigue::new))
    }
}

impl CurriculumStore for SqliteRepository {
    fn save_curriculum(&mut self, curriculum: &WeeklyCurriculum) -> RepositoryResult<()> {
        let payload = serde_json::to_string(curriculum).map_err(|e| to_storage_err(e.to_string()))?;
        self.conn
            .execute(
                "INSERT INTO weekly_curriculum (username, start_date, payload_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(username, start_date) DO UPDATE SET payload_json = excluded.payload_json",
                params![curriculum.username, format_day(curriculum.start_date), payload],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        Ok(())
    }

    fn curriculum(
        &self,
        username: &str,
        start_date: NaiveDate,
    ) -> RepositoryResult<Option<WeeklyCurriculum>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload_json FROM weekly_curriculum WHERE username = ?1 AND start_date = ?2",
                params![username, format_day(start_date)],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| to_storage_err(e.to_string()))?;
        payload
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| RepositoryError::Corrupt {
                    message: format!("stored curriculum: {e}"),
                })
            })
            .transpose()
    }
}
