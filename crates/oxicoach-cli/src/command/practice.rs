use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use oxicoach_board::Move;
use oxicoach_training::{fatigue::Fatigue, item::ItemId, review::ReviewId};

use crate::{command::StoreArg, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SessionArg {
    /// Player to train
    #[arg(long)]
    username: String,
    /// Fatigue from 0 to 10; today's check-in or an estimate is used when omitted
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
    fatigue: Option<u8>,
    /// Number of puzzles
    #[arg(long)]
    limit: Option<usize>,
    /// Day of the session (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AttemptArg {
    /// Item being solved
    #[arg(long)]
    item: i64,
    /// Index of the move within the solution line (0 = first move)
    #[arg(long, default_value_t = 0)]
    step: usize,
    /// Move played, in UCI notation
    #[arg(long = "move")]
    mv: Move,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ReviewsArg {
    #[command(subcommand)]
    action: ReviewAction,
}

#[derive(Debug, Clone, Subcommand)]
enum ReviewAction {
    /// List reviews due on a day
    Due {
        #[arg(long)]
        username: String,
        /// Day to check (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mark a review as done
    Done {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Debug, serde::Serialize)]
struct ReviewDone {
    id: ReviewId,
    done: bool,
}

pub(crate) fn run_session(store: &StoreArg, arg: &SessionArg) -> anyhow::Result<()> {
    let SessionArg {
        username,
        fatigue,
        limit,
        date,
    } = arg;

    let mut coach = store.open_coach()?;
    let items = coach.session(
        username,
        fatigue.map(Fatigue::new),
        *limit,
        util::date_or_today(*date),
    )?;
    tracing::info!(username, items = items.len(), "session ready");
    store.write(&items)
}

pub(crate) fn run_attempt(store: &StoreArg, arg: &AttemptArg) -> anyhow::Result<()> {
    let AttemptArg { item, step, mv } = arg;

    let mut coach = store.open_coach()?;
    let report = coach.attempt(ItemId(*item), *step, *mv, Utc::now())?;
    store.write(&report)
}

pub(crate) fn run_reviews(store: &StoreArg, arg: &ReviewsArg) -> anyhow::Result<()> {
    match &arg.action {
        ReviewAction::Due { username, date } => {
            let coach = store.open_coach()?;
            let due = coach.due_reviews(username, util::date_or_today(*date))?;
            store.write(&due)
        }
        ReviewAction::Done { id } => {
            let id = ReviewId(*id);
            let mut coach = store.open_coach()?;
            coach.complete_review(id)?;
            tracing::info!(%id, "review completed");
            store.write(&ReviewDone { id, done: true })
        }
    }
}
