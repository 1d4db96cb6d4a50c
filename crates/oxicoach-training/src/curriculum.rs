//! Seven-day curricula.
//!
//! Every day of the week repeats the same three blocks, built from the course
//! recommendations of the diagnostic ranking:
//!
//! ```text
//! fix_urgent     most urgent recommendation, its own duration
//! build_skill    second recommendation, duration - 5 (at least 20)
//! spaced_review  fixed 15 minutes
//! ```
//!
//! Building a curriculum also registers review dates for up to 12 unsolved items
//! carrying the weakest tactical tags; the number of new entries ends up in
//! [`CurriculumMeta::scheduled_reviews`]. Because scheduling is idempotent, rebuilding
//! a curriculum for the same start date schedules nothing new.

use chrono::{Days, NaiveDate};
use oxicoach_tactics::motif::MotifTag;
use serde::{Deserialize, Serialize};

use crate::{
    courses::{self, CourseTopic},
    diagnostics::Diagnostics,
    repository::{ItemStore, RepositoryResult, ReviewStore},
    review::ReviewScheduler,
};

pub const CURRICULUM_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurriculumBlockKind {
    FixUrgent,
    BuildSkill,
    SpacedReview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumBlock {
    #[serde(rename = "type")]
    pub kind: CurriculumBlockKind,
    pub title: String,
    pub minutes: u32,
    pub rationale: String,
    /// Course the block works through; `None` for review blocks.
    pub topic: Option<CourseTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumDay {
    pub date: NaiveDate,
    pub blocks: Vec<CurriculumBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumMeta {
    pub recommended_topics: Vec<CourseTopic>,
    pub weak_tags: Vec<MotifTag>,
    /// Review entries newly created while building this curriculum.
    pub scheduled_reviews: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyCurriculum {
    pub username: String,
    pub start_date: NaiveDate,
    pub goals: Vec<String>,
    pub days: Vec<CurriculumDay>,
    pub meta: CurriculumMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurriculumConfig {
    pub max_recommendations: usize,
    /// Recommendations listed in the metadata.
    pub listed_topics: usize,
    /// Tactical tags whose items are scheduled for review.
    pub weak_tag_count: usize,
    pub review_item_limit: usize,
    pub build_skill_reduction: u32,
    pub build_skill_floor: u32,
    pub spaced_review_minutes: u32,
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            max_recommendations: 6,
            listed_topics: 4,
            weak_tag_count: 6,
            review_item_limit: 12,
            build_skill_reduction: 5,
            build_skill_floor: 20,
            spaced_review_minutes: 15,
        }
    }
}

const GOALS: [&str; 3] = [
    "Reduce blunders in your main tactical motif",
    "Master your most frequent structure or opening",
    "Improve conversion: close out games with an advantage",
];

#[derive(Debug, Clone, Default)]
pub struct CurriculumBuilder {
    config: CurriculumConfig,
    scheduler: ReviewScheduler,
}

impl CurriculumBuilder {
    #[must_use]
    pub fn new(config: CurriculumConfig, scheduler: ReviewScheduler) -> Self {
        Self { config, scheduler }
    }

    /// Builds the week starting at `start` and schedules the review items, with
    /// `start` as the scheduling day.
    pub fn build<S>(
        &self,
        store: &mut S,
        username: &str,
        start: NaiveDate,
        diagnostics: &Diagnostics,
    ) -> RepositoryResult<WeeklyCurriculum>
    where
        S: ItemStore + ReviewStore + ?Sized,
    {
        let recommendations = courses::recommend_courses(diagnostics, self.config.max_recommendations);

        let weak_tags = diagnostics.weakest_tags(self.config.weak_tag_count);
        let item_ids = if weak_tags.is_empty() {
            Vec::new()
        } else {
            store.unresolved_items(username, &weak_tags, self.config.review_item_limit)?
        };
        let scheduled_reviews = self.scheduler.schedule(store, username, &item_ids, start)?;

        let mut template = Vec::new();
        if let Some(urgent) = recommendations.first() {
            template.push(CurriculumBlock {
                kind: CurriculumBlockKind::FixUrgent,
                title: urgent.title.clone(),
                minutes: urgent.minutes,
                rationale: urgent.rationale.clone(),
                topic: Some(urgent.topic.clone()),
            });
        }
        if let Some(skill) = recommendations.get(1) {
            template.push(CurriculumBlock {
                kind: CurriculumBlockKind::BuildSkill,
                title: skill.title.clone(),
                minutes: skill
                    .minutes
                    .saturating_sub(self.config.build_skill_reduction)
                    .max(self.config.build_skill_floor),
                rationale: skill.rationale.clone(),
                topic: Some(skill.topic.clone()),
            });
        }
        template.push(CurriculumBlock {
            kind: CurriculumBlockKind::SpacedReview,
            title: "Spaced review (your puzzles)".to_owned(),
            minutes: self.config.spaced_review_minutes,
            rationale: "Reinforce patterns with scheduled repetition.".to_owned(),
            topic: None,
        });

        let days = (0..CURRICULUM_DAYS)
            .filter_map(|offset| start.checked_add_days(Days::new(offset)))
            .map(|date| CurriculumDay {
                date,
                blocks: template.clone(),
            })
            .collect();

        tracing::info!(
            username,
            %start,
            recommendations = recommendations.len(),
            scheduled_reviews,
            "weekly curriculum built"
        );
        Ok(WeeklyCurriculum {
            username: username.to_owned(),
            start_date: start,
            goals: GOALS.iter().map(|&goal| goal.to_owned()).collect(),
            days,
            meta: CurriculumMeta {
                recommended_topics: recommendations
                    .iter()
                    .take(self.config.listed_topics)
                    .map(|rec| rec.topic.clone())
                    .collect(),
                weak_tags,
                scheduled_reviews,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use oxicoach_tactics::structure::{StructureReport, StructureTag};

    use super::*;
    use crate::{
        diagnostics::DiagnosticAggregator,
        item::test_util::new_item,
        memory::MemoryRepository,
        tag_stats::{TagRecord, TagStats},
    };

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn diagnostics() -> Diagnostics {
        let stats = TagStats::default()
            .with(MotifTag::Fork, TagRecord::new(10, 2))
            .with(MotifTag::Pin, TagRecord::new(10, 8));
        let mut structures = StructureReport::default();
        structures.counts.insert(StructureTag::HangingPawns, 1);
        DiagnosticAggregator::default().aggregate("alice", &stats, &structures, None)
    }

    #[test]
    fn test_week_layout() {
        let mut repo = MemoryRepository::default();
        let curriculum = CurriculumBuilder::default()
            .build(&mut repo, "alice", day(6, 28), &diagnostics())
            .unwrap();

        assert_eq!(curriculum.days.len(), 7);
        assert_eq!(curriculum.days[0].date, day(6, 28));
        assert_eq!(curriculum.days[6].date, day(7, 4));
        assert_eq!(curriculum.goals.len(), 3);

        // hanging pawns 1.0 (40 min), fork 0.8 (20 min), pin 0.2
        let blocks = &curriculum.days[3].blocks;
        let kinds: Vec<_> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            [
                CurriculumBlockKind::FixUrgent,
                CurriculumBlockKind::BuildSkill,
                CurriculumBlockKind::SpacedReview
            ]
        );
        assert_eq!(blocks[0].minutes, 40);
        assert_eq!(blocks[0].topic, Some(CourseTopic::Structure(StructureTag::HangingPawns)));
        assert_eq!(blocks[1].minutes, 20);
        assert_eq!(blocks[2].minutes, 15);
        assert_eq!(curriculum.meta.weak_tags, [MotifTag::Fork, MotifTag::Pin]);
        assert_eq!(curriculum.meta.recommended_topics.len(), 3);
    }

    #[test]
    fn test_schedules_weak_items_once() {
        let mut repo = MemoryRepository::default();
        repo.insert_items(
            "alice",
            vec![
                new_item("g1", 10, 300, &[MotifTag::Fork]),
                new_item("g2", 12, 500, &[MotifTag::Pin]),
                new_item("g3", 14, 700, &[MotifTag::Mate]),
            ],
        )
        .unwrap();

        let builder = CurriculumBuilder::default();
        let first = builder.build(&mut repo, "alice", day(6, 1), &diagnostics()).unwrap();
        assert_eq!(first.meta.scheduled_reviews, 6);
        let second = builder.build(&mut repo, "alice", day(6, 1), &diagnostics()).unwrap();
        assert_eq!(second.meta.scheduled_reviews, 0);
    }

    #[test]
    fn test_empty_diagnostics_still_reviews() {
        let mut repo = MemoryRepository::default();
        let empty = DiagnosticAggregator::default().aggregate(
            "alice",
            &TagStats::default(),
            &StructureReport::default(),
            None,
        );
        let curriculum = CurriculumBuilder::default()
            .build(&mut repo, "alice", day(6, 1), &empty)
            .unwrap();
        assert!(curriculum.days.iter().all(|d| d.blocks.len() == 1));
        assert_eq!(curriculum.meta.scheduled_reviews, 0);
    }

    #[test]
    fn test_serde_uses_type_field() {
        let mut repo = MemoryRepository::default();
        let curriculum = CurriculumBuilder::default()
            .build(&mut repo, "alice", day(6, 1), &diagnostics())
            .unwrap();
        let json = serde_json::to_value(&curriculum).unwrap();
        assert_eq!(json["days"][0]["blocks"][0]["type"], "fix_urgent");
        assert_eq!(json["meta"]["weak_tags"][0], "fork");
        let back: WeeklyCurriculum = serde_json::from_value(json).unwrap();
        assert_eq!(back, curriculum);
    }
}
