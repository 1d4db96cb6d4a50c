use oxicoach_tactics::{
    blunder_miner::MiningConfig, motif::TaggerConfig, structure::StructureConfig,
};
use serde::{Deserialize, Serialize};

use crate::{
    curriculum::CurriculumConfig, diagnostics::DiagnosticsConfig, plan::PlanConfig,
    pro::ProConfig, review::ReviewConfig,
};

/// How much stored history each stage reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Games sampled for structure signals in the diagnostics.
    pub diagnostic_games: usize,
    /// Games sampled for structure course suggestions in a plan.
    pub plan_games: usize,
    /// Most recent items folded into per-tag statistics.
    pub tag_window: usize,
    /// Most recent items used to infer fatigue without a check-in.
    pub fatigue_window: usize,
    /// Openings read from the repository for opening signals.
    pub opening_limit: usize,
    /// Items considered when picking a session.
    pub session_pool: usize,
    pub session_size: usize,
    pub course_examples: usize,
    pub pro_games: usize,
    pub pro_items: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            diagnostic_games: 80,
            plan_games: 50,
            tag_window: 200,
            fatigue_window: 30,
            opening_limit: 10,
            session_pool: 500,
            session_size: 10,
            course_examples: 6,
            pro_games: 300,
            pro_items: 5000,
        }
    }
}

/// Settings of every pipeline stage, loadable from one JSON document.
///
/// Every section and field is optional; missing values take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    pub mining: MiningConfig,
    pub tagger: TaggerConfig,
    pub structure: StructureConfig,
    pub diagnostics: DiagnosticsConfig,
    pub plan: PlanConfig,
    pub curriculum: CurriculumConfig,
    pub review: ReviewConfig,
    pub pro: ProConfig,
    pub history: HistoryConfig,
    /// Course recommendations attached to a daily plan.
    pub plan_courses: usize,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            mining: MiningConfig::default(),
            tagger: TaggerConfig::default(),
            structure: StructureConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            plan: PlanConfig::default(),
            curriculum: CurriculumConfig::default(),
            review: ReviewConfig::default(),
            pro: ProConfig::default(),
            history: HistoryConfig::default(),
            plan_courses: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: CoachConfig = serde_json::from_str(
            r#"{ "mining": { "swing_threshold_cp": 300 }, "review": { "offsets_days": [1, 3] } }"#,
        )
        .unwrap();
        assert_eq!(config.mining.swing_threshold_cp, 300);
        assert_eq!(config.mining.mate_distance, 5);
        assert_eq!(config.review.offsets_days, [1, 3]);
        assert_eq!(config.review.due_limit, 20);
        assert_eq!(config.history, HistoryConfig::default());
        assert_eq!(config.plan_courses, 4);
    }
}
