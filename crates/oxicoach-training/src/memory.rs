//! In-memory [`Repository`](crate::repository::Repository) backend.
//!
//! Used by tests and by callers that do not need persistence. Orderings and
//! duplicate rules match the persistent backend.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use oxicoach_tactics::{
    game::Game,
    motif::{MotifSet, MotifTag},
};

use crate::{
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

#[derive(Debug, Clone)]
pub struct MemoryRepository {
    games: Vec<(String, Game)>,
    items: BTreeMap<ItemId, TrainingItem>,
    next_item_id: i64,
    reviews: Vec<ReviewEntry>,
    next_review_id: i64,
    checkins: HashMap<(String, NaiveDate), Fatigue>,
    curricula: HashMap<(String, NaiveDate), WeeklyCurriculum>,
    opening_stats: bool,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self {
            games: Vec::new(),
            items: BTreeMap::new(),
            next_item_id: 1,
            reviews: Vec::new(),
            next_review_id: 1,
            checkins: HashMap::new(),
            curricula: HashMap::new(),
            opening_stats: true,
        }
    }
}

impl MemoryRepository {
    /// A repository that reports no opening statistics capability.
    #[must_use]
    pub fn without_opening_stats() -> Self {
        Self {
            opening_stats: false,
            ..Self::default()
        }
    }

    fn user_games<'a>(&'a self, username: &'a str) -> impl Iterator<Item = &'a Game> + 'a {
        self.games
            .iter()
            .filter(move |(owner, _)| owner == username)
            .map(|(_, game)| game)
    }

    fn user_items<'a>(&'a self, username: &'a str) -> impl Iterator<Item = &'a TrainingItem> + 'a {
        self.items.values().filter(move |item| item.username == username)
    }

    fn item_mut(&mut self, id: ItemId) -> RepositoryResult<&mut TrainingItem> {
        self.items
            .get_mut(&id)
            .ok_or(RepositoryError::ItemNotFound { id })
    }
}

fn newest_first(games: &mut [Game]) {
    games.sort_by(|a, b| b.played_at.cmp(&a.played_at));
}

impl GameStore for MemoryRepository {
    fn save_games(&mut self, username: &str, games: &[Game]) -> RepositoryResult<usize> {
        let mut saved = 0;
        for game in games {
            let exists = self.user_games(username).any(|stored| {
                stored.platform == game.platform && stored.game_id == game.game_id
            });
            if !exists {
                self.games.push((username.to_owned(), game.clone()));
                saved += 1;
            }
        }
        Ok(saved)
    }

    fn recent_games(&self, username: &str, limit: usize) -> RepositoryResult<Vec<Game>> {
        let mut games: Vec<_> = self.user_games(username).cloned().collect();
        newest_first(&mut games);
        games.truncate(limit);
        Ok(games)
    }

    fn games_by_opening(
        &self,
        username: &str,
        opening: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<Game>> {
        let mut games: Vec<_> = self
            .user_games(username)
            .filter(|game| game.opening.as_deref() == Some(opening))
            .cloned()
            .collect();
        newest_first(&mut games);
        games.truncate(limit);
        Ok(games)
    }

    fn opening_stats(&self, username: &str, limit: usize) -> RepositoryResult<Vec<OpeningStat>> {
        if !self.opening_stats {
            return Err(RepositoryError::Unsupported {
                capability: "opening statistics",
            });
        }
        let mut counts = BTreeMap::<&str, usize>::new();
        for game in self.user_games(username) {
            if let Some(opening) = game.opening.as_deref() {
                *counts.entry(opening).or_default() += 1;
            }
        }
        let mut stats: Vec<_> = counts
            .into_iter()
            .map(|(opening, count)| OpeningStat {
                opening: opening.to_owned(),
                count,
            })
            .collect();
        stats.sort_by(|a, b| b.count.cmp(&a.count));
        stats.truncate(limit);
        Ok(stats)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            opening_stats: self.opening_stats,
        }
    }
}

impl ItemStore for MemoryRepository {
    fn insert_items(
        &mut self,
        username: &str,
        items: Vec<NewTrainingItem>,
    ) -> RepositoryResult<Vec<ItemId>> {
        let mut ids = Vec::new();
        for new in items {
            let duplicate = self.user_items(username).any(|item| {
                item.platform == new.platform && item.game_id == new.game_id && item.ply == new.ply
            });
            if duplicate {
                continue;
            }
            let id = ItemId(self.next_item_id);
            self.next_item_id += 1;
            self.items.insert(id, TrainingItem::from_new(id, username, new));
            ids.push(id);
        }
        Ok(ids)
    }

    fn item(&self, id: ItemId) -> RepositoryResult<Option<TrainingItem>> {
        Ok(self.items.get(&id).cloned())
    }

    fn recent_items(&self, username: &str, limit: usize) -> RepositoryResult<Vec<TrainingItem>> {
        let mut items: Vec<_> = self.user_items(username).cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items.truncate(limit);
        Ok(items)
    }

    fn set_tags(&mut self, id: ItemId, tags: MotifSet) -> RepositoryResult<bool> {
        let item = self.item_mut(id)?;
        if !item.tags.is_empty() {
            return Ok(false);
        }
        item.tags = tags;
        Ok(true)
    }

    fn record_attempt(
        &mut self,
        id: ItemId,
        solved: bool,
        at: DateTime<Utc>,
    ) -> RepositoryResult<ItemStat> {
        let item = self.item_mut(id)?;
        item.stat.record(solved, at);
        Ok(item.stat)
    }

    fn items_by_tag(
        &self,
        username: &str,
        tag: MotifTag,
        limit: usize,
    ) -> RepositoryResult<Vec<TrainingItem>> {
        let mut items: Vec<_> = self
            .user_items(username)
            .filter(|item| item.tags.contains(tag))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.swing_cp.cmp(&a.swing_cp));
        items.truncate(limit);
        Ok(items)
    }

    fn items_by_game(
        &self,
        username: &str,
        game_id: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<TrainingItem>> {
        let mut items: Vec<_> = self
            .user_items(username)
            .filter(|item| item.game_id == game_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.ply);
        items.truncate(limit);
        Ok(items)
    }

    fn unresolved_items(
        &self,
        username: &str,
        tags: &[MotifTag],
        limit: usize,
    ) -> RepositoryResult<Vec<ItemId>> {
        let wanted: MotifSet = tags.iter().copied().collect();
        let mut items: Vec<_> = self
            .user_items(username)
            .filter(|item| !item.stat.solved && item.tags.intersects(wanted))
            .collect();
        items.sort_by(|a, b| {
            b.stat
                .attempts
                .cmp(&a.stat.attempts)
                .then(b.swing_cp.cmp(&a.swing_cp))
        });
        Ok(items.into_iter().take(limit).map(|item| item.id).collect())
    }
}

impl ReviewStore for MemoryRepository {
    fn review_exists(
        &self,
        username: &str,
        item_id: ItemId,
        due_date: NaiveDate,
    ) -> RepositoryResult<bool> {
        Ok(self.reviews.iter().any(|entry| {
            entry.username == username && entry.item_id == item_id && entry.due_date == due_date
        }))
    }

    fn add_review(
        &mut self,
        username: &str,
        item_id: ItemId,
        due_date: NaiveDate,
    ) -> RepositoryResult<bool> {
        if self.review_exists(username, item_id, due_date)? {
            return Ok(false);
        }
        let id = ReviewId(self.next_review_id);
        self.next_review_id += 1;
        self.reviews.push(ReviewEntry {
            id,
            username: username.to_owned(),
            item_id,
            due_date,
            done: false,
        });
        Ok(true)
    }

    fn due_reviews(
        &self,
        username: &str,
        date: NaiveDate,
        limit: usize,
    ) -> RepositoryResult<Vec<ReviewEntry>> {
        let mut due: Vec<_> = self
            .reviews
            .iter()
            .filter(|entry| entry.username == username && !entry.done && entry.due_date <= date)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        due.truncate(limit);
        Ok(due)
    }

    fn mark_review_done(&mut self, id: ReviewId) -> RepositoryResult<()> {
        let entry = self
            .reviews
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(RepositoryError::ReviewNotFound { id })?;
        entry.done = true;
        Ok(())
    }
}

impl CheckinStore for MemoryRepository {
    fn save_checkin(
        &mut self,
        username: &str,
        day: NaiveDate,
        fatigue: Fatigue,
        _note: Option<&str>,
    ) -> RepositoryResult<()> {
        self.checkins.insert((username.to_owned(), day), fatigue);
        Ok(())
    }

    fn checkin(&self, username: &str, day: NaiveDate) -> RepositoryResult<Option<Fatigue>> {
        Ok(self.checkins.get(&(username.to_owned(), day)).copied())
    }
}

impl CurriculumStore for MemoryRepository {
    fn save_curriculum(&mut self, curriculum: &WeeklyCurriculum) -> RepositoryResult<()> {
        self.curricula.insert(
            (curriculum.username.clone(), curriculum.start_date),
            curriculum.clone(),
        );
        Ok(())
    }

    fn curriculum(
        &self,
        username: &str,
        start_date: NaiveDate,
    ) -> RepositoryResult<Option<WeeklyCurriculum>> {
        Ok(self.curricula.get(&(username.to_owned(), start_date)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;
    use crate::item::test_util::new_item;

    fn stored_game(id: &str, day: u32, opening: &str) -> Game {
        Game {
            platform: "lichess".to_owned(),
            game_id: id.to_owned(),
            played_at: Utc.with_ymd_and_hms(2024, 5, day, 10, 0, 0).unwrap(),
            white: "alice".to_owned(),
            black: "bob".to_owned(),
            result: "1-0".to_owned(),
            move_text: "1. e4 e5".to_owned(),
            opening: Some(opening.to_owned()),
            time_control: None,
        }
    }

    #[test]
    fn test_games_dedupe_and_order() {
        let mut repo = MemoryRepository::default();
        let games = [
            stored_game("a", 1, "Italian Game"),
            stored_game("b", 3, "Sicilian Defense"),
            stored_game("c", 2, "Italian Game"),
        ];
        assert_eq!(repo.save_games("alice", &games).unwrap(), 3);
        assert_eq!(repo.save_games("alice", &games).unwrap(), 0);
        assert_eq!(repo.save_games("carol", &games[..1]).unwrap(), 1);

        let recent: Vec<_> = repo
            .recent_games("alice", 2)
            .unwrap()
            .into_iter()
            .map(|g| g.game_id)
            .collect();
        assert_eq!(recent, ["b", "c"]);

        let stats = repo.opening_stats("alice", 10).unwrap();
        assert_eq!(stats[0].opening, "Italian Game");
        assert_eq!(stats[0].count, 2);
        assert!(repo.capabilities().opening_stats);

        let bare = MemoryRepository::without_opening_stats();
        assert!(!bare.capabilities().opening_stats);
        assert!(matches!(
            bare.opening_stats("alice", 10),
            Err(RepositoryError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_items_dedupe_and_tag_backfill() {
        let mut repo = MemoryRepository::default();
        let ids = repo
            .insert_items("alice", vec![new_item("g1", 10, 300, &[]), new_item("g1", 10, 300, &[])])
            .unwrap();
        assert_eq!(ids.len(), 1);

        assert!(repo.set_tags(ids[0], MotifTag::Fork.into()).unwrap());
        assert!(!repo.set_tags(ids[0], MotifTag::Pin.into()).unwrap());
        let item = repo.item(ids[0]).unwrap().unwrap();
        assert_eq!(item.tags, MotifSet::from(MotifTag::Fork));

        assert!(matches!(
            repo.set_tags(ItemId(77), MotifTag::Pin.into()),
            Err(RepositoryError::ItemNotFound { .. })
        ));
    }

    #[test]
    fn test_unresolved_items_order() {
        let mut repo = MemoryRepository::default();
        let ids = repo
            .insert_items(
                "alice",
                vec![
                    new_item("g1", 10, 300, &[MotifTag::Fork]),
                    new_item("g2", 10, 900, &[MotifTag::Fork]),
                    new_item("g3", 10, 500, &[MotifTag::Pin]),
                    new_item("g4", 10, 800, &[MotifTag::Check]),
                ],
            )
            .unwrap();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        repo.record_attempt(ids[2], false, at).unwrap();
        repo.record_attempt(ids[1], true, at).unwrap();

        let picked = repo
            .unresolved_items("alice", &[MotifTag::Fork, MotifTag::Pin], 10)
            .unwrap();
        assert_eq!(picked, [ids[2], ids[0]]);
    }
}
