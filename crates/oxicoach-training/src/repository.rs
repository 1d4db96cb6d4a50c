//! Storage boundary of the training pipeline.
//!
//! The pipeline owns no storage. Every stage states the operations it needs through one
//! of the narrow store traits below, and [`Repository`] is simply all of them together.
//! Backends implement each store; the blanket impl does the rest.
//!
//! Operations a backend cannot provide are declared through [`Capabilities`] rather
//! than silently doing nothing: callers check the flag and treat the data source as
//! missing.

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
    review::{ReviewEntry, ReviewId},
};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RepositoryError {
    #[display("storage backend failed: {message}")]
    Backend {
        #[error(not(source))]
        message: String,
    },
    #[display("stored data is corrupt: {message}")]
    Corrupt {
        #[error(not(source))]
        message: String,
    },
    #[display("training item {id} not found")]
    ItemNotFound {
        #[error(not(source))]
        id: ItemId,
    },
    #[display("review {id} not found")]
    ReviewNotFound {
        #[error(not(source))]
        id: ReviewId,
    },
    #[display("repository does not support {capability}")]
    Unsupported {
        #[error(not(source))]
        capability: &'static str,
    },
}

/// Optional operations a backend provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// [`GameStore::opening_stats`] is implemented.
    pub opening_stats: bool,
}

pub trait GameStore {
    /// Stores `games` for `username`, skipping games already stored under the same
    /// `(username, platform, game_id)`. Returns the number of newly stored games.
    fn save_games(&mut self, username: &str, games: &[Game]) -> RepositoryResult<usize>;

    /// Most recently played games first.
    fn recent_games(&self, username: &str, limit: usize) -> RepositoryResult<Vec<Game>>;

    /// Most recently played games first.
    fn games_by_opening(
        &self,
        username: &str,
        opening: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<Game>>;

    /// Number of games per opening, most frequent first.
    fn opening_stats(&self, _username: &str, _limit: usize) -> RepositoryResult<Vec<OpeningStat>> {
        Err(RepositoryError::Unsupported {
            capability: "opening statistics",
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

pub trait ItemStore {
    /// Stores new items, skipping any already stored for the same
    /// `(username, platform, game_id, ply)`. Returns the ids of the stored items.
    fn insert_items(
        &mut self,
        username: &str,
        items: Vec<NewTrainingItem>,
    ) -> RepositoryResult<Vec<ItemId>>;

    fn item(&self, id: ItemId) -> RepositoryResult<Option<TrainingItem>>;

    /// Newest items first.
    fn recent_items(&self, username: &str, limit: usize) -> RepositoryResult<Vec<TrainingItem>>;

    /// Sets the tags of an item that has none yet. Returns `false` if the item was
    /// already tagged.
    fn set_tags(&mut self, id: ItemId, tags: MotifSet) -> RepositoryResult<bool>;

    /// Records one attempt and returns the updated counters.
    fn record_attempt(
        &mut self,
        id: ItemId,
        solved: bool,
        at: DateTime<Utc>,
    ) -> RepositoryResult<ItemStat>;

    /// Items carrying `tag`, largest swing first.
    fn items_by_tag(
        &self,
        username: &str,
        tag: MotifTag,
        limit: usize,
    ) -> RepositoryResult<Vec<TrainingItem>>;

    /// Items of one game in ply order.
    fn items_by_game(
        &self,
        username: &str,
        game_id: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<TrainingItem>>;

    /// Unsolved items carrying any of `tags`, most attempted first, then largest swing.
    fn unresolved_items(
        &self,
        username: &str,
        tags: &[MotifTag],
        limit: usize,
    ) -> RepositoryResult<Vec<ItemId>>;
}

pub trait ReviewStore {
    fn review_exists(
        &self,
        username: &str,
        item_id: ItemId,
        due_date: NaiveDate,
    ) -> RepositoryResult<bool>;

    /// Adds a pending review. Returns `false` (and changes nothing) if an entry with the
    /// same `(username, item_id, due_date)` exists.
    fn add_review(
        &mut self,
        username: &str,
        item_id: ItemId,
        due_date: NaiveDate,
    ) -> RepositoryResult<bool>;

    /// Pending reviews due on or before `date`, earliest first.
    fn due_reviews(
        &self,
        username: &str,
        date: NaiveDate,
        limit: usize,
    ) -> RepositoryResult<Vec<ReviewEntry>>;

    fn mark_review_done(&mut self, id: ReviewId) -> RepositoryResult<()>;
}

pub trait CheckinStore {
    /// Stores the fatigue for `day`, replacing an earlier check-in of the same day.
    fn save_checkin(
        &mut self,
        username: &str,
        day: NaiveDate,
        fatigue: Fatigue,
        note: Option<&str>,
    ) -> RepositoryResult<()>;

    fn checkin(&self, username: &str, day: NaiveDate) -> RepositoryResult<Option<Fatigue>>;
}

pub trait CurriculumStore {
    /// Stores a curriculum under `(username, start_date)`, replacing any earlier one.
    fn save_curriculum(&mut self, curriculum: &WeeklyCurriculum) -> RepositoryResult<()>;

    fn curriculum(
        &self,
        username: &str,
        start_date: NaiveDate,
    ) -> RepositoryResult<Option<WeeklyCurriculum>>;
}

/// Everything the pipeline persists.
pub trait Repository: GameStore + ItemStore + ReviewStore + CheckinStore + CurriculumStore {}

impl<T> Repository for T where T: GameStore + ItemStore + ReviewStore + CheckinStore + CurriculumStore {}
