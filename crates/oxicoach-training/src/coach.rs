//! The training pipeline wired to a repository.
//!
//! [`Coach`] owns a [`Repository`] and the configured stage objects. Each public method
//! is one use case: it reads what it needs from the repository, runs the pure stages
//! and writes the results back. External capabilities (game source, evaluation engine,
//! text generator) are passed in per call; the coach never constructs them.
//!
//! # Data Flow
//!
//! ```text
//! GameSource ──import_games──► games
//!                                │
//! EvaluationPort ──mine──────────┼──► items (tagged) ──attempt──► item stats
//!                                │          │
//!                                ▼          ▼
//!                          diagnostics ◄── tag stats
//!                           │        │
//!                   daily_plan   weekly_curriculum ──► review entries
//! ```
//!
//! Clock values (`now`, `today`) are parameters so that every use case is
//! deterministic under test.

use chrono::{DateTime, NaiveDate, Utc};
use oxicoach_board::Move;
use oxicoach_tactics::{
    blunder_miner::{BlunderMiner, MiningError},
    evaluation::EvaluationPort,
    game::{Game, GameSource, GameSourceError},
    motif::{MotifSet, MotifTagger},
    structure::{self, StructureDetector, StructureTag},
};
use serde::{Deserialize, Serialize};

use crate::{
    config::CoachConfig,
    courses::{self, AdaptiveCourse, Course, CourseRecommendation, CourseTopic},
    curriculum::{CurriculumBuilder, WeeklyCurriculum},
    diagnostics::{DiagnosticAggregator, Diagnostics},
    fatigue::Fatigue,
    item::{AttemptOutcome, ItemId, ItemStat, NewTrainingItem, TrainingItem},
    plan::{Plan, PlanBuilder},
    pro::{ProAnalyzer, ProDiagnostics},
    repository::{Repository, RepositoryError},
    review::{ReviewEntry, ReviewId, ReviewScheduler},
    session::{self, SessionItem, SessionOrder},
    tag_stats::TagStats,
    text::TextGenerator,
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum CoachError {
    #[display("repository operation failed")]
    Repository(RepositoryError),
    #[display("blunder mining failed")]
    Mining(MiningError),
    #[display("fetching games failed")]
    GameSource(GameSourceError),
}

pub type CoachResult<T> = Result<T, CoachError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub fetched: usize,
    pub stored: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningSummary {
    pub games_inspected: usize,
    pub blunders_found: usize,
    /// Ids of the newly stored items (duplicates of earlier runs are skipped).
    pub stored: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub plan: Plan,
    pub recommended_courses: Vec<CourseRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptReport {
    pub item_id: ItemId,
    pub outcome: AttemptOutcome,
    /// Counters after the attempt; `None` when the attempt was not recorded.
    pub stat: Option<ItemStat>,
}

const FATIGUE_INFERRED_NOTE: &str = "inferred";
const OPENING_EXAMPLE_GAMES: usize = 15;

pub struct Coach<R> {
    repo: R,
    config: CoachConfig,
    miner: BlunderMiner,
    tagger: MotifTagger,
    structures: StructureDetector,
    aggregator: DiagnosticAggregator,
    planner: PlanBuilder,
    curriculum: CurriculumBuilder,
    scheduler: ReviewScheduler,
    pro: ProAnalyzer,
}

impl<R> Coach<R>
where
    R: Repository,
{
    #[must_use]
    pub fn new(repo: R, config: CoachConfig) -> Self {
        let scheduler = ReviewScheduler::new(config.review.clone());
        Self {
            miner: BlunderMiner::new(config.mining.clone()),
            tagger: MotifTagger::new(&config.tagger),
            structures: StructureDetector::new(config.structure),
            aggregator: DiagnosticAggregator::new(config.diagnostics),
            planner: PlanBuilder::new(config.plan),
            curriculum: CurriculumBuilder::new(config.curriculum, scheduler.clone()),
            scheduler,
            pro: ProAnalyzer::new(config.pro),
            repo,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    #[must_use]
    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn into_repository(self) -> R {
        self.repo
    }

    pub fn import_games<S>(&mut self, source: &mut S, username: &str, limit: usize) -> CoachResult<ImportSummary>
    where
        S: GameSource + ?Sized,
    {
        let games = source.fetch_games(username, limit)?;
        let stored = self.repo.save_games(username, &games)?;
        tracing::info!(username, platform = source.platform(), fetched = games.len(), stored, "games imported");
        Ok(ImportSummary {
            fetched: games.len(),
            stored,
        })
    }

    /// Mines the player's most recent games and stores the flagged plies as tagged
    /// training items.
    ///
    /// An evaluation failure aborts the run before anything is stored.
    pub fn mine<P>(&mut self, username: &str, port: &mut P, now: DateTime<Utc>) -> CoachResult<MiningSummary>
    where
        P: EvaluationPort + ?Sized,
    {
        let games = self.repo.recent_games(username, self.miner.config().max_games)?;
        let blunders = self.miner.mine(&games, port, Some(username))?;
        let blunders_found = blunders.len();

        let items = blunders
            .into_iter()
            .map(|blunder| {
                let tags = match self.tagger.tag_fen(&blunder.fen_before, &blunder.pv) {
                    Ok(tags) => tags,
                    Err(err) => {
                        tracing::warn!(game_id = %blunder.game_id, ply = blunder.ply, %err, "tagging failed, leaving item untagged");
                        MotifSet::EMPTY
                    }
                };
                NewTrainingItem::from_blunder(blunder, tags, now)
            })
            .collect();
        let stored = self.repo.insert_items(username, items)?;

        tracing::info!(username, games = games.len(), blunders_found, stored = stored.len(), "mining finished");
        Ok(MiningSummary {
            games_inspected: games.len(),
            blunders_found,
            stored,
        })
    }

    /// Back-fills tags of recent items that have none. Returns the number of items
    /// tagged.
    pub fn tag_missing(&mut self, username: &str) -> CoachResult<usize> {
        let items = self.repo.recent_items(username, self.config.history.tag_window)?;
        let mut tagged = 0;
        for item in items.iter().filter(|item| item.tags.is_empty()) {
            match self.tagger.tag_fen(&item.fen_before, &item.pv) {
                Ok(tags) => {
                    if self.repo.set_tags(item.id, tags)? {
                        tagged += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(item = %item.id, %err, "stored position is invalid, cannot tag");
                }
            }
        }
        Ok(tagged)
    }

    /// Fatigue for today: an explicit value is stored as today's check-in, otherwise
    /// today's check-in is used, otherwise fatigue is inferred from recent results and
    /// stored.
    pub fn resolve_fatigue(
        &mut self,
        username: &str,
        explicit: Option<Fatigue>,
        today: NaiveDate,
    ) -> CoachResult<Fatigue> {
        if let Some(fatigue) = explicit {
            self.repo.save_checkin(username, today, fatigue, None)?;
            return Ok(fatigue);
        }
        if let Some(fatigue) = self.repo.checkin(username, today)? {
            return Ok(fatigue);
        }
        let recent = self.repo.recent_items(username, self.config.history.fatigue_window)?;
        let attempts = recent.iter().map(|item| item.stat.attempts).sum();
        let solved = recent.iter().map(|item| u32::from(item.stat.solved)).sum();
        let fatigue = Fatigue::infer(attempts, solved);
        self.repo
            .save_checkin(username, today, fatigue, Some(FATIGUE_INFERRED_NOTE))?;
        tracing::debug!(username, %fatigue, attempts, solved, "fatigue inferred");
        Ok(fatigue)
    }

    pub fn record_checkin(
        &mut self,
        username: &str,
        day: NaiveDate,
        fatigue: Fatigue,
        note: Option<&str>,
    ) -> CoachResult<()> {
        self.repo.save_checkin(username, day, fatigue, note)?;
        Ok(())
    }

    pub fn tag_stats(&self, username: &str) -> CoachResult<TagStats> {
        let items = self.repo.recent_items(username, self.config.history.tag_window)?;
        Ok(TagStats::from_items(&items))
    }

    /// Ranks what the player should work on.
    ///
    /// Opening signals are left out when the repository cannot provide opening
    /// statistics.
    pub fn diagnostics(&self, username: &str) -> CoachResult<Diagnostics> {
        let tag_stats = self.tag_stats(username)?;
        let games = self.repo.recent_games(username, self.config.history.diagnostic_games)?;
        let structures = self.structures.detect(&games);
        let openings = if self.repo.capabilities().opening_stats {
            Some(self.repo.opening_stats(username, self.config.history.opening_limit)?)
        } else {
            tracing::debug!(username, "repository has no opening statistics");
            None
        };
        Ok(self
            .aggregator
            .aggregate(username, &tag_stats, &structures, openings.as_deref()))
    }

    pub fn daily_plan(
        &mut self,
        username: &str,
        fatigue: Option<Fatigue>,
        minutes: Option<u32>,
        today: NaiveDate,
    ) -> CoachResult<DailyPlan> {
        let fatigue = self.resolve_fatigue(username, fatigue, today)?;
        let tag_stats = self.tag_stats(username)?;
        let games = self.repo.recent_games(username, self.config.history.plan_games)?;
        let structures = self.structures.detect(&games).present();
        let minutes = minutes.unwrap_or(self.config.plan.default_minutes);
        let plan = self
            .planner
            .build(username, fatigue, &tag_stats, &structures, minutes);
        let diagnostics = self.diagnostics(username)?;
        Ok(DailyPlan {
            plan,
            recommended_courses: courses::recommend_courses(&diagnostics, self.config.plan_courses),
        })
    }

    /// Curriculum of the week starting at `start`, served from the repository when one
    /// was stored for the same start date, unless `refresh` is set.
    pub fn weekly_curriculum(
        &mut self,
        username: &str,
        start: NaiveDate,
        refresh: bool,
    ) -> CoachResult<WeeklyCurriculum> {
        let cached = if refresh {
            None
        } else {
            self.repo.curriculum(username, start)?
        };
        if let Some(cached) = cached {
            tracing::debug!(username, %start, "serving stored curriculum");
            return Ok(cached);
        }
        let diagnostics = self.diagnostics(username)?;
        let curriculum = self
            .curriculum
            .build(&mut self.repo, username, start, &diagnostics)?;
        self.repo.save_curriculum(&curriculum)?;
        Ok(curriculum)
    }

    /// Checks one solution step and records the attempt when it counts.
    pub fn attempt(&mut self, id: ItemId, step: usize, mv: Move, now: DateTime<Utc>) -> CoachResult<AttemptReport> {
        let item = self
            .repo
            .item(id)?
            .ok_or(RepositoryError::ItemNotFound { id })?;
        let outcome = item.check_attempt(step, mv);
        let stat = match outcome.recorded_result() {
            Some(solved) => Some(self.repo.record_attempt(id, solved, now)?),
            None => None,
        };
        Ok(AttemptReport {
            item_id: id,
            outcome,
            stat,
        })
    }

    pub fn session(
        &mut self,
        username: &str,
        fatigue: Option<Fatigue>,
        limit: Option<usize>,
        today: NaiveDate,
    ) -> CoachResult<Vec<SessionItem>> {
        let fatigue = self.resolve_fatigue(username, fatigue, today)?;
        let candidates = self.repo.recent_items(username, self.config.history.session_pool)?;
        Ok(session::build_session(
            candidates,
            fatigue,
            limit.unwrap_or(self.config.history.session_size),
        ))
    }

    pub fn due_reviews(&self, username: &str, date: NaiveDate) -> CoachResult<Vec<ReviewEntry>> {
        Ok(self.scheduler.due(&self.repo, username, date)?)
    }

    pub fn complete_review(&mut self, id: ReviewId) -> CoachResult<()> {
        self.repo.mark_review_done(id)?;
        Ok(())
    }

    #[must_use]
    pub fn course(&self, topic: &CourseTopic, generator: Option<&mut dyn TextGenerator>) -> Course {
        courses::generate_course(topic, generator)
    }

    pub fn adaptive_course(
        &self,
        username: &str,
        topic: &CourseTopic,
        generator: Option<&mut dyn TextGenerator>,
    ) -> CoachResult<AdaptiveCourse> {
        let items = self.course_examples(username, topic)?;
        Ok(courses::adaptive_course(username, topic, &items, generator))
    }

    fn course_examples(&self, username: &str, topic: &CourseTopic) -> CoachResult<Vec<TrainingItem>> {
        let limit = self.config.history.course_examples;
        if let CourseTopic::Tactic(tag) = topic {
            return Ok(self.repo.items_by_tag(username, *tag, limit)?);
        }
        if let CourseTopic::Opening(name) = topic {
            let games = self.repo.games_by_opening(username, name, OPENING_EXAMPLE_GAMES)?;
            return self.first_item_per_game(username, &games, limit);
        }
        if let Some(tag) = topic.structure() {
            let games = self.repo.recent_games(username, self.config.history.diagnostic_games)?;
            let matching: Vec<Game> = games
                .into_iter()
                .filter(|game| self.shows_structure(game, tag))
                .collect();
            return self.first_item_per_game(username, &matching, limit);
        }

        let mut items = self.repo.recent_items(username, self.config.history.session_pool)?;
        let order = SessionOrder::for_fatigue(Fatigue::NEUTRAL);
        items.sort_by(|a, b| order.compare(a, b));
        items.truncate(limit);
        Ok(items)
    }

    fn shows_structure(&self, game: &Game, tag: StructureTag) -> bool {
        self.structures
            .snapshot(game)
            .is_some_and(|position| structure::classify(&position).contains(&tag))
    }

    fn first_item_per_game(&self, username: &str, games: &[Game], limit: usize) -> CoachResult<Vec<TrainingItem>> {
        let mut items = Vec::new();
        for game in games {
            if items.len() >= limit {
                break;
            }
            if let Some(item) = self
                .repo
                .items_by_game(username, &game.game_id, 1)?
                .into_iter()
                .next()
            {
                items.push(item);
            }
        }
        Ok(items)
    }

    pub fn pro_diagnostics(&self, username: &str) -> CoachResult<ProDiagnostics> {
        let games = self.repo.recent_games(username, self.config.history.pro_games)?;
        let items = self.repo.recent_items(username, self.config.history.pro_items)?;
        Ok(self.pro.analyze(username, &games, &items))
    }
}
