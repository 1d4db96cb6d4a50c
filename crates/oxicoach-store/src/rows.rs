//! Conversions between table rows and domain values.
//!
//! Rows are read into plain structs inside the rusqlite callbacks and converted
//! afterwards, so that malformed stored values surface as
//! [`RepositoryError::Corrupt`] instead of a driver error.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use oxicoach_board::{Move, split_uci};
use oxicoach_tactics::{game::Game, motif::MotifSet};
use oxicoach_training::{
    item::{ItemId, ItemStat, TrainingItem},
    repository::{RepositoryError, RepositoryResult},
    review::{ReviewEntry, ReviewId},
};
use rusqlite::Row;

fn corrupt(what: &str, value: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Corrupt {
        message: format!("{what} {value:?}: {err}"),
    }
}

/// Timestamps are stored as RFC 3339 text with second precision, so text order is
/// time order.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_timestamp(value: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| corrupt("timestamp", value, e))
}

pub(crate) fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_day(value: &str) -> RepositoryResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| corrupt("date", value, e))
}

fn parse_move(value: &str) -> RepositoryResult<Move> {
    Move::from_uci(value).map_err(|e| corrupt("move", value, e))
}

fn to_usize(what: &str, value: i64) -> RepositoryResult<usize> {
    usize::try_from(value).map_err(|e| corrupt(what, &value.to_string(), e))
}

pub(crate) fn sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) const GAME_COLUMNS: &str =
    "platform, game_id, played_at, white, black, result, move_text, opening, time_control";

pub(crate) struct GameRow {
    platform: String,
    game_id: String,
    played_at: String,
    white: String,
    black: String,
    result: String,
    move_text: String,
    opening: Option<String>,
    time_control: Option<String>,
}

impl GameRow {
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            platform: row.get(0)?,
            game_id: row.get(1)?,
            played_at: row.get(2)?,
            white: row.get(3)?,
            black: row.get(4)?,
            result: row.get(5)?,
            move_text: row.get(6)?,
            opening: row.get(7)?,
            time_control: row.get(8)?,
        })
    }

    pub(crate) fn into_game(self) -> RepositoryResult<Game> {
        Ok(Game {
            played_at: parse_timestamp(&self.played_at)?,
            platform: self.platform,
            game_id: self.game_id,
            white: self.white,
            black: self.black,
            result: self.result,
            move_text: self.move_text,
            opening: self.opening,
            time_control: self.time_control,
        })
    }
}

pub(crate) const ITEM_COLUMNS: &str = "i.id, i.username, i.platform, i.game_id, i.ply, \
     i.fen_before, i.played_uci, i.best_uci, i.pv_uci, i.tags, i.swing_cp, i.created_at, \
     COALESCE(s.attempts, 0), COALESCE(s.solved, 0), s.last_attempt_at";

pub(crate) const ITEM_FROM: &str = "items i LEFT JOIN item_stats s ON s.item_id = i.id";

pub(crate) struct ItemRow {
    id: i64,
    username: String,
    platform: String,
    game_id: String,
    ply: i64,
    fen_before: String,
    played: String,
    best: String,
    pv: String,
    tags: String,
    swing_cp: i32,
    created_at: String,
    attempts: u32,
    solved: bool,
    last_attempt_at: Option<String>,
}

impl ItemRow {
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            platform: row.get(2)?,
            game_id: row.get(3)?,
            ply: row.get(4)?,
            fen_before: row.get(5)?,
            played: row.get(6)?,
            best: row.get(7)?,
            pv: row.get(8)?,
            tags: row.get(9)?,
            swing_cp: row.get(10)?,
            created_at: row.get(11)?,
            attempts: row.get(12)?,
            solved: row.get(13)?,
            last_attempt_at: row.get(14)?,
        })
    }

    pub(crate) fn into_item(self) -> RepositoryResult<TrainingItem> {
        let tags: MotifSet = self
            .tags
            .parse()
            .map_err(|e| corrupt("tags", &self.tags, e))?;
        let pv = split_uci(&self.pv).map_err(|e| corrupt("principal variation", &self.pv, e))?;
        let last_attempt_at = self
            .last_attempt_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;
        Ok(TrainingItem {
            id: ItemId(self.id),
            ply: to_usize("ply", self.ply)?,
            played: parse_move(&self.played)?,
            best: parse_move(&self.best)?,
            created_at: parse_timestamp(&self.created_at)?,
            username: self.username,
            platform: self.platform,
            game_id: self.game_id,
            fen_before: self.fen_before,
            pv,
            swing_cp: self.swing_cp,
            tags,
            stat: ItemStat {
                attempts: self.attempts,
                solved: self.solved,
                last_attempt_at,
            },
        })
    }
}

pub(crate) const REVIEW_COLUMNS: &str = "id, username, item_id, due_date, done";

pub(crate) struct ReviewRow {
    id: i64,
    username: String,
    item_id: i64,
    due_date: String,
    done: bool,
}

impl ReviewRow {
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            item_id: row.get(2)?,
            due_date: row.get(3)?,
            done: row.get(4)?,
        })
    }

    pub(crate) fn into_entry(self) -> RepositoryResult<ReviewEntry> {
        Ok(ReviewEntry {
            id: ReviewId(self.id),
            due_date: parse_day(&self.due_date)?,
            username: self.username,
            item_id: ItemId(self.item_id),
            done: self.done,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn test_timestamps_sort_as_text() {
        let early = Utc.with_ymd_and_hms(2024, 5, 9, 23, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 5, 10, 1, 0, 0).unwrap();
        assert_eq!(format_timestamp(early), "2024-05-09T23:00:00Z");
        assert!(format_timestamp(early) < format_timestamp(late));
        assert_eq!(parse_timestamp(&format_timestamp(late)).unwrap(), late);
    }

    #[test]
    fn test_malformed_values_are_corrupt() {
        assert!(matches!(parse_day("yesterday"), Err(RepositoryError::Corrupt { .. })));
        assert!(matches!(parse_move("zz99"), Err(RepositoryError::Corrupt { .. })));
        assert!(matches!(to_usize("ply", -1), Err(RepositoryError::Corrupt { .. })));
    }
}
