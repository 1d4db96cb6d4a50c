use std::collections::BTreeMap;

use oxicoach_tactics::motif::MotifTag;
use serde::{Deserialize, Serialize};

use crate::item::TrainingItem;

/// Attempt and solve counts of the items carrying one motif tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub attempts: u32,
    /// Number of solved items (each item counts at most once).
    pub solved: u32,
}

impl TagRecord {
    #[must_use]
    pub fn new(attempts: u32, solved: u32) -> Self {
        Self { attempts, solved }
    }

    /// `solved / attempts`, with zero attempts treated as one.
    #[must_use]
    pub fn solve_rate(self) -> f64 {
        f64::from(self.solved) / f64::from(self.attempts.max(1))
    }
}

/// Per-tag practice history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagStats(BTreeMap<MotifTag, TagRecord>);

impl TagStats {
    /// Folds the counters of `items` into per-tag totals. An item with several tags
    /// counts towards each of them.
    pub fn from_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a TrainingItem>,
    {
        let mut stats = Self::default();
        for item in items {
            for tag in item.tags.iter() {
                let record = stats.0.entry(tag).or_default();
                record.attempts += item.stat.attempts;
                record.solved += u32::from(item.stat.solved);
            }
        }
        stats
    }

    #[must_use]
    pub fn with(mut self, tag: MotifTag, record: TagRecord) -> Self {
        self.0.insert(tag, record);
        self
    }

    #[must_use]
    pub fn get(&self, tag: MotifTag) -> Option<TagRecord> {
        self.0.get(&tag).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MotifTag, TagRecord)> + '_ {
        self.0.iter().map(|(tag, record)| (*tag, *record))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tags ordered weakest first: solve rate ascending, then attempts descending.
    #[must_use]
    pub fn weakest_first(&self) -> Vec<MotifTag> {
        let mut scored: Vec<_> = self.iter().collect();
        scored.sort_by(|(_, a), (_, b)| {
            a.solve_rate()
                .total_cmp(&b.solve_rate())
                .then(b.attempts.cmp(&a.attempts))
        });
        scored.into_iter().map(|(tag, _)| tag).collect()
    }
}
