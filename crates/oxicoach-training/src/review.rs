//! Spaced-repetition scheduling of training items.
//!
//! Every scheduled item gets one review at each configured day offset from "today"
//! (2, 7 and 21 days by default). An entry is identified by
//! `(username, item_id, due_date)`; the scheduler checks for an existing entry before
//! adding one, so scheduling the same items twice on the same day is a no-op.
//!
//! ```text
//! today ──+2──► review ──+5──► review ──+14──► review
//! ```
//!
//! Entries only move from pending to done.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    item::ItemId,
    repository::{RepositoryResult, ReviewStore},
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct ReviewId(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub id: ReviewId,
    pub username: String,
    pub item_id: ItemId,
    pub due_date: NaiveDate,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Days from today at which each item is reviewed.
    pub offsets_days: Vec<u32>,
    /// Maximum number of entries a due query returns.
    pub due_limit: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            offsets_days: vec![2, 7, 21],
            due_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewScheduler {
    config: ReviewConfig,
}

impl ReviewScheduler {
    #[must_use]
    pub fn new(config: ReviewConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn due_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        self.config
            .offsets_days
            .iter()
            .filter_map(|&days| today.checked_add_days(Days::new(u64::from(days))))
            .collect()
    }

    /// Schedules reviews of `item_ids` and returns the number of new entries.
    pub fn schedule<S>(
        &self,
        store: &mut S,
        username: &str,
        item_ids: &[ItemId],
        today: NaiveDate,
    ) -> RepositoryResult<usize>
    where
        S: ReviewStore + ?Sized,
    {
        let due_dates = self.due_dates(today);
        let mut created = 0;
        for &item_id in item_ids {
            for &due_date in &due_dates {
                if store.review_exists(username, item_id, due_date)? {
                    continue;
                }
                if store.add_review(username, item_id, due_date)? {
                    created += 1;
                }
            }
        }
        tracing::debug!(username, items = item_ids.len(), created, "reviews scheduled");
        Ok(created)
    }

    /// Pending reviews due on or before `date`, earliest first.
    pub fn due<S>(&self, store: &S, username: &str, date: NaiveDate) -> RepositoryResult<Vec<ReviewEntry>>
    where
        S: ReviewStore + ?Sized,
    {
        store.due_reviews(username, date, self.config.due_limit)
    }
}
