//! Single-session training plans.
//!
//! # Policy
//!
//! The fatigue tier picks one of three fixed block lists:
//!
//! | Tier      | Blocks (minutes)                                                 |
//! |-----------|------------------------------------------------------------------|
//! | Exhausted | strongest tag (15), weakest tag (10), basic endgames (10)        |
//! | Steady    | weakest tag (20), strongest tag (10), frequent opening (15)      |
//! | Fresh     | two weakest tags (25), game analysis (20), technical endgames (15) |
//!
//! Weak and strong tags come from [`TagStats::weakest_first`]; without any history the
//! plan falls back to `hanging_piece` and `check`.
//!
//! # Fitting
//!
//! [`fit_blocks`] packs blocks into the time budget in order: a block that fits is kept
//! whole, the first one that does not is cut to the remaining minutes and packing
//! stops. Later blocks are dropped, never reordered.
//!
//! Course suggestions for detected structures are added independently of the budget.

use oxicoach_tactics::{motif::MotifTag, structure::StructureTag};
use serde::{Deserialize, Serialize};

use crate::{
    fatigue::{Fatigue, FatigueTier},
    tag_stats::TagStats,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingArea {
    Tactics,
    Openings,
    Endgames,
    Analysis,
}

/// One segment of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingBlock {
    pub area: TrainingArea,
    pub title: String,
    pub minutes: u32,
    pub rationale: String,
}

impl TrainingBlock {
    fn new(area: TrainingArea, title: impl Into<String>, minutes: u32, rationale: &str) -> Self {
        Self {
            area,
            title: title.into(),
            minutes,
            rationale: rationale.to_owned(),
        }
    }
}

/// A structure course proposed alongside the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSuggestion {
    pub topic: String,
    pub structure: StructureTag,
    pub rationale: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub headline: String,
    pub fatigue: Fatigue,
    /// Budget the blocks were fitted into.
    pub minutes: u32,
    pub blocks: Vec<TrainingBlock>,
    pub courses: Vec<CourseSuggestion>,
    /// Weakest tags, weakest first.
    pub focus_tags: Vec<MotifTag>,
}

impl Plan {
    #[must_use]
    pub fn total_minutes(&self) -> u32 {
        self.blocks.iter().map(|block| block.minutes).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Budget used when the caller does not give one.
    pub default_minutes: u32,
    /// Smallest budget ever planned for (the shortest block length).
    pub min_minutes: u32,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            default_minutes: 45,
            min_minutes: 10,
        }
    }
}

const FOCUS_TAG_COUNT: usize = 3;
const FALLBACK_FOCUS: [MotifTag; 2] = [MotifTag::HangingPiece, MotifTag::Check];
const ADJUSTED_NOTE: &str = " (adjusted to available time)";

#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    config: PlanConfig,
}

impl PlanBuilder {
    #[must_use]
    pub fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn build(
        &self,
        username: &str,
        fatigue: Fatigue,
        tag_stats: &TagStats,
        structures: &[StructureTag],
        available_minutes: u32,
    ) -> Plan {
        let ranked = tag_stats.weakest_first();
        let weak: Vec<MotifTag> = if ranked.is_empty() {
            FALLBACK_FOCUS.to_vec()
        } else {
            ranked.iter().copied().take(FOCUS_TAG_COUNT).collect()
        };
        // strongest first
        let strong: Vec<MotifTag> = if ranked.len() >= 2 {
            ranked.iter().rev().copied().take(2).collect()
        } else {
            weak.clone()
        };
        let weakest = weak[0];
        let second_weakest = weak.get(1).copied().unwrap_or(weakest);
        let strongest = strong[0];

        let (headline, blocks) = match fatigue.tier() {
            FatigueTier::Exhausted => (
                format!("Light plan for {username}: rebuild confidence (fatigue {fatigue})"),
                vec![
                    TrainingBlock::new(
                        TrainingArea::Tactics,
                        format!("Guided repetition: {}", strongest.label()),
                        15,
                        "Get into flow with patterns you already master.",
                    ),
                    TrainingBlock::new(
                        TrainingArea::Tactics,
                        format!("Short review: {}", weakest.label()),
                        10,
                        "A touch of challenge without overload.",
                    ),
                    TrainingBlock::new(
                        TrainingArea::Endgames,
                        "Basic endgames: active king and passed pawns",
                        10,
                        "Simple concepts with a high return.",
                    ),
                ],
            ),
            FatigueTier::Steady => (
                format!("Balanced plan for {username} (fatigue {fatigue})"),
                vec![
                    TrainingBlock::new(
                        TrainingArea::Tactics,
                        format!("Weak pattern: {}", weakest.label()),
                        20,
                        "Attack your weakest theme.",
                    ),
                    TrainingBlock::new(
                        TrainingArea::Tactics,
                        format!("Reinforcement: {}", strongest.label()),
                        10,
                        "Consolidate confidence.",
                    ),
                    TrainingBlock::new(
                        TrainingArea::Openings,
                        "Review your most frequent opening and its typical trap",
                        15,
                        "Practical stability.",
                    ),
                ],
            ),
            FatigueTier::Fresh => (
                format!("Intense plan for {username} (fatigue {fatigue})"),
                vec![
                    TrainingBlock::new(
                        TrainingArea::Tactics,
                        format!(
                            "Weaknesses: {} + {}",
                            weakest.label(),
                            second_weakest.label()
                        ),
                        25,
                        "High energy: work on what feels uncomfortable.",
                    ),
                    TrainingBlock::new(
                        TrainingArea::Analysis,
                        "Analyze one game: three critical decisions",
                        20,
                        "Turn mistakes into rules.",
                    ),
                    TrainingBlock::new(
                        TrainingArea::Endgames,
                        "Technical endgames: opposition and zugzwang",
                        15,
                        "Fast rating gains.",
                    ),
                ],
            ),
        };

        let budget = available_minutes.max(self.config.min_minutes);
        Plan {
            headline,
            fatigue,
            minutes: budget,
            blocks: fit_blocks(blocks, budget),
            courses: structure_courses(structures),
            focus_tags: weak,
        }
    }
}

/// Packs `blocks` into `budget` minutes, truncating the first block that does not fit.
#[must_use]
pub fn fit_blocks(blocks: Vec<TrainingBlock>, budget: u32) -> Vec<TrainingBlock> {
    let mut fitted = Vec::new();
    let mut remaining = budget;
    for mut block in blocks {
        if remaining == 0 {
            break;
        }
        if block.minutes <= remaining {
            remaining -= block.minutes;
            fitted.push(block);
        } else {
            block.minutes = remaining;
            block.rationale.push_str(ADJUSTED_NOTE);
            fitted.push(block);
            break;
        }
    }
    fitted
}

/// Fixed course suggestions for the structures that have one.
#[must_use]
pub fn structure_courses(structures: &[StructureTag]) -> Vec<CourseSuggestion> {
    structures
        .iter()
        .filter_map(|&structure| match structure {
            StructureTag::IsolatedQueenPawn => Some(CourseSuggestion {
                topic: "Course: Isolated Queen Pawn (IQP)".to_owned(),
                structure,
                rationale: "IQP positions appear in your recent games.".to_owned(),
                minutes: 35,
            }),
            StructureTag::HangingPawns => Some(CourseSuggestion {
                topic: "Course: Hanging Pawns".to_owned(),
                structure,
                rationale: "Hanging-pawn structures appear in your recent games.".to_owned(),
                minutes: 30,
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag_stats::TagRecord;

    fn stats() -> TagStats {
        TagStats::default()
            .with(MotifTag::Fork, TagRecord::new(10, 1))
            .with(MotifTag::Pin, TagRecord::new(10, 4))
            .with(MotifTag::Check, TagRecord::new(10, 9))
            .with(MotifTag::Mate, TagRecord::new(10, 7))
    }

    fn block(minutes: u32) -> TrainingBlock {
        TrainingBlock::new(TrainingArea::Tactics, "block", minutes, "why")
    }

    #[test]
    fn test_fit_truncates_first_overflow_and_stops() {
        let fitted = fit_blocks(vec![block(25), block(15), block(10)], 22);
        assert_eq!(fitted.len(), 1);
        assert_eq!(fitted[0].minutes, 22);
        assert_eq!(fitted[0].rationale, "why (adjusted to available time)");
    }

    #[test]
    fn test_fit_keeps_whole_blocks() {
        let fitted = fit_blocks(vec![block(25), block(15), block(10)], 45);
        let minutes: Vec<_> = fitted.iter().map(|b| b.minutes).collect();
        assert_eq!(minutes, [25, 15, 5]);
        let exact = fit_blocks(vec![block(25), block(15)], 40);
        assert_eq!(exact.len(), 2);
        assert!(exact.iter().all(|b| b.rationale == "why"));
    }

    #[test]
    fn test_plan_never_exceeds_budget() {
        let builder = PlanBuilder::default();
        for level in 0..=10 {
            for minutes in [10, 12, 22, 30, 45, 60, 90] {
                let plan = builder.build("alice", Fatigue::new(level), &stats(), &[], minutes);
                assert!(plan.total_minutes() <= minutes, "{level} {minutes}");
            }
        }
    }

    #[test]
    fn test_exhausted_plan_leads_with_strongest_tag() {
        let plan = PlanBuilder::default().build("alice", Fatigue::new(9), &stats(), &[], 45);
        assert_eq!(plan.blocks.len(), 3);
        assert_eq!(plan.blocks[0].title, "Guided repetition: Check");
        assert_eq!(plan.blocks[1].title, "Short review: Fork");
        assert_eq!(plan.focus_tags, [MotifTag::Fork, MotifTag::Pin, MotifTag::Mate]);
    }

    #[test]
    fn test_fresh_plan_front_loads_two_weakest() {
        let plan = PlanBuilder::default().build("alice", Fatigue::new(1), &stats(), &[], 60);
        assert_eq!(plan.blocks[0].title, "Weaknesses: Fork + Pin");
        assert_eq!(plan.blocks[0].minutes, 25);
        assert_eq!(plan.blocks[1].area, TrainingArea::Analysis);
        assert_eq!(plan.total_minutes(), 60);
    }

    #[test]
    fn test_no_history_uses_fallback_focus() {
        let plan = PlanBuilder::default().build("alice", Fatigue::new(5), &TagStats::default(), &[], 45);
        assert_eq!(plan.focus_tags, FALLBACK_FOCUS);
        assert_eq!(plan.blocks[0].title, "Weak pattern: Hanging Piece");
        assert_eq!(plan.blocks[1].title, "Reinforcement: Hanging Piece");
    }

    #[test]
    fn test_budget_floor_and_structure_courses() {
        let plan = PlanBuilder::default().build(
            "alice",
            Fatigue::new(5),
            &stats(),
            &[StructureTag::HangingPawns, StructureTag::Carlsbad, StructureTag::IsolatedQueenPawn],
            3,
        );
        assert_eq!(plan.minutes, 10);
        assert_eq!(plan.total_minutes(), 10);
        let minutes: Vec<_> = plan.courses.iter().map(|c| c.minutes).collect();
        assert_eq!(minutes, [30, 35]);
    }
}
