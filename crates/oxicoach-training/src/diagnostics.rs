//! Diagnostic aggregation: one ranked list of what the player should work on.
//!
//! Three independent sources are folded into [`SkillSignal`]s, each with an urgency
//! score in `[0, 1]`:
//!
//! 1. **Tactical need** per motif tag, from attempt/solve history:
//!
//!    ```text
//!    damper = min(1, attempts / 10)
//!    need   = clamp01((1 - solved / attempts) * (0.5 + 0.5 * damper))
//!    ```
//!
//!    A tag without attempts gets a fixed need of 0.2, so an untrained theme is still
//!    listed. The damper halves the need of a tag with very few attempts, because one
//!    failure says little.
//!
//! 2. **Structural need** per detected archetype: `min(1, 0.3 + 0.7 * frequency)`, with
//!    the frequency taken over all archetype occurrences.
//!
//! 3. **Opening need** for the most played openings: `min(1, 0.25 + 0.75 * frequency)`.
//!
//! All signals are merged and stably sorted by score, highest first. This ranking is
//! the input of both the plan and the curriculum builders.
//!
//! A missing source (no games, no opening data) contributes no signals; it is never an
//! error.

use std::fmt;

use oxicoach_tactics::{
    motif::MotifTag,
    structure::{StructureReport, StructureTag},
};
use serde::{Deserialize, Serialize, Serializer};

use crate::tag_stats::{TagRecord, TagStats};

/// Namespaced identifier of a skill signal (`tactics.fork`, `structure.carlsbad`,
/// `opening.italian_game`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignalKey {
    Tactics(MotifTag),
    Structure(StructureTag),
    /// Opening display name, as reported by the platform.
    Opening(String),
}

impl SignalKey {
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Tactics(_) => "tactics",
            Self::Structure(_) => "structure",
            Self::Opening(_) => "opening",
        }
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tactics(tag) => write!(f, "tactics.{tag}"),
            Self::Structure(tag) => write!(f, "structure.{tag}"),
            Self::Opening(name) => write!(f, "opening.{}", opening_slug(name)),
        }
    }
}

impl Serialize for SignalKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lower-cased opening name with spaces replaced by underscores.
#[must_use]
pub fn opening_slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Supporting numbers behind a signal's score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Evidence {
    Practice {
        attempts: u32,
        solved: u32,
        solve_rate: f64,
    },
    Frequency {
        count: usize,
        frequency: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillSignal {
    pub key: SignalKey,
    pub label: String,
    /// Urgency in `[0, 1]`; higher is more urgent.
    pub score: f64,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsMeta {
    pub tag_count: usize,
    pub structures_detected: usize,
    pub openings_detected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub username: String,
    /// Sorted by score, highest first.
    pub signals: Vec<SkillSignal>,
    pub meta: DiagnosticsMeta,
}

impl Diagnostics {
    /// Signals of one namespace, in ranking order.
    pub fn signals_in<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a SkillSignal> + 'a {
        self.signals
            .iter()
            .filter(move |signal| signal.key.namespace() == namespace)
    }

    /// The `n` most urgent tactical tags.
    #[must_use]
    pub fn weakest_tags(&self, n: usize) -> Vec<MotifTag> {
        self.signals
            .iter()
            .filter_map(|signal| match signal.key {
                SignalKey::Tactics(tag) => Some(tag),
                _ => None,
            })
            .take(n)
            .collect()
    }
}

/// How often the player reached an opening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningStat {
    pub opening: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Need assigned to a tag that has never been attempted.
    pub unattempted_need: f64,
    /// Attempts needed for the tactical need to reach full weight.
    pub full_confidence_attempts: u32,
    /// Only the most frequent openings produce signals.
    pub max_openings: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            unattempted_need: 0.2,
            full_confidence_attempts: 10,
            max_openings: 8,
        }
    }
}

const STRUCTURE_NEED_FLOOR: f64 = 0.3;
const OPENING_NEED_FLOOR: f64 = 0.25;

#[derive(Debug, Clone, Default)]
pub struct DiagnosticAggregator {
    config: DiagnosticsConfig,
}

impl DiagnosticAggregator {
    #[must_use]
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn tactical_need(&self, record: TagRecord) -> f64 {
        if record.attempts == 0 {
            return self.config.unattempted_need;
        }
        let damper = (f64::from(record.attempts)
            / f64::from(self.config.full_confidence_attempts.max(1)))
        .min(1.0);
        ((1.0 - record.solve_rate()) * (0.5 + 0.5 * damper)).clamp(0.0, 1.0)
    }

    /// Builds the ranked signal list.
    ///
    /// `openings` is `None` when the repository cannot provide opening statistics;
    /// it is expected sorted by count, most frequent first.
    #[must_use]
    pub fn aggregate(
        &self,
        username: &str,
        tag_stats: &TagStats,
        structures: &StructureReport,
        openings: Option<&[OpeningStat]>,
    ) -> Diagnostics {
        let mut signals = Vec::new();

        for (tag, record) in tag_stats.iter() {
            signals.push(SkillSignal {
                key: SignalKey::Tactics(tag),
                label: format!("Tactics: {}", tag.label()),
                score: self.tactical_need(record),
                evidence: Evidence::Practice {
                    attempts: record.attempts,
                    solved: record.solved,
                    solve_rate: record.solve_rate(),
                },
            });
        }

        let present = structures.present();
        for &tag in &present {
            let frequency = structures.frequency(tag);
            signals.push(SkillSignal {
                key: SignalKey::Structure(tag),
                label: format!("Structure: {}", tag.label()),
                score: frequency_need(STRUCTURE_NEED_FLOOR, frequency),
                evidence: Evidence::Frequency {
                    count: structures.counts.get(&tag).copied().unwrap_or(0),
                    frequency,
                },
            });
        }

        let openings = openings.unwrap_or_default();
        let total: usize = openings.iter().map(|stat| stat.count).sum();
        for stat in openings.iter().take(self.config.max_openings) {
            let frequency = ratio(stat.count, total);
            signals.push(SkillSignal {
                key: SignalKey::Opening(stat.opening.clone()),
                label: format!("Opening: {}", stat.opening),
                score: frequency_need(OPENING_NEED_FLOOR, frequency),
                evidence: Evidence::Frequency {
                    count: stat.count,
                    frequency,
                },
            });
        }

        signals.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(username, signals = signals.len(), "diagnostics aggregated");
        Diagnostics {
            username: username.to_owned(),
            signals,
            meta: DiagnosticsMeta {
                tag_count: tag_stats.len(),
                structures_detected: present.len(),
                openings_detected: openings.len(),
            },
        }
    }
}

fn frequency_need(floor: f64, frequency: f64) -> f64 {
    (floor + (1.0 - floor) * frequency).min(1.0)
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[expect(clippy::cast_precision_loss)]
    let ratio = count as f64 / total as f64;
    ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_tactical_need_formula() {
        let aggregator = DiagnosticAggregator::default();
        assert!(approx(aggregator.tactical_need(TagRecord::new(10, 2)), 0.8));
        assert!(approx(aggregator.tactical_need(TagRecord::new(0, 0)), 0.2));
        // 2 attempts, none solved: damper 0.2
        assert!(approx(aggregator.tactical_need(TagRecord::new(2, 0)), 0.6));
        assert!(approx(aggregator.tactical_need(TagRecord::new(40, 40)), 0.0));
    }

    #[test]
    fn test_signals_are_ranked_and_bounded() {
        let stats = TagStats::default()
            .with(MotifTag::Fork, TagRecord::new(10, 2))
            .with(MotifTag::Pin, TagRecord::new(0, 0))
            .with(MotifTag::Check, TagRecord::new(20, 19));
        let mut structures = StructureReport::default();
        structures.counts.insert(StructureTag::IsolatedQueenPawn, 3);
        structures.counts.insert(StructureTag::HangingPawns, 1);
        let openings = [
            OpeningStat {
                opening: "Italian Game".to_owned(),
                count: 6,
            },
            OpeningStat {
                opening: "Sicilian Defense".to_owned(),
                count: 2,
            },
        ];

        let diag = DiagnosticAggregator::default().aggregate(
            "alice",
            &stats,
            &structures,
            Some(&openings),
        );

        assert!(diag.signals.iter().all(|s| (0.0..=1.0).contains(&s.score)));
        assert!(diag.signals.windows(2).all(|w| w[0].score >= w[1].score));

        let keys: Vec<String> = diag.signals.iter().map(|s| s.key.to_string()).collect();
        assert_eq!(
            keys,
            [
                "structure.isolated_queen_pawn", // 0.3 + 0.7 * 0.75 = 0.825
                "opening.italian_game",          // 0.25 + 0.75 * 0.75 = 0.8125
                "tactics.fork",                  // 0.8
                "structure.hanging_pawns",       // 0.475
                "opening.sicilian_defense",      // 0.4375
                "tactics.pin",                   // 0.2
                "tactics.check",                 // 0.05
            ]
        );
        assert_eq!(
            diag.meta,
            DiagnosticsMeta {
                tag_count: 3,
                structures_detected: 2,
                openings_detected: 2
            }
        );
        assert_eq!(diag.weakest_tags(2), [MotifTag::Fork, MotifTag::Pin]);
    }

    #[test]
    fn test_missing_sources_contribute_nothing() {
        let diag = DiagnosticAggregator::default().aggregate(
            "alice",
            &TagStats::default(),
            &StructureReport::default(),
            None,
        );
        assert!(diag.signals.is_empty());
        assert_eq!(diag.meta, DiagnosticsMeta::default());
    }

    #[test]
    fn test_opening_cap() {
        let openings: Vec<_> = (0..12)
            .map(|i| OpeningStat {
                opening: format!("Opening {i}"),
                count: 12 - i,
            })
            .collect();
        let config = DiagnosticsConfig {
            max_openings: 8,
            ..DiagnosticsConfig::default()
        };
        let diag = DiagnosticAggregator::new(config).aggregate(
            "alice",
            &TagStats::default(),
            &StructureReport::default(),
            Some(&openings),
        );
        assert_eq!(diag.signals.len(), 8);
        assert_eq!(diag.meta.openings_detected, 12);
        assert_eq!(diag.signals[0].key.to_string(), "opening.opening_0");
    }
}
