use chrono::NaiveDate;
use oxicoach_training::fatigue::Fatigue;

use crate::{command::StoreArg, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CheckinArg {
    /// Player checking in
    #[arg(long)]
    username: String,
    /// Fatigue from 0 (fresh) to 10 (exhausted)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
    fatigue: u8,
    /// Free-form note stored with the check-in
    #[arg(long)]
    note: Option<String>,
    /// Day of the check-in (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PlanArg {
    /// Player to plan for
    #[arg(long)]
    username: String,
    /// Fatigue from 0 to 10; today's check-in or an estimate is used when omitted
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
    fatigue: Option<u8>,
    /// Available minutes
    #[arg(long)]
    minutes: Option<u32>,
    /// Day to plan (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CurriculumArg {
    /// Player to plan for
    #[arg(long)]
    username: String,
    /// First day of the week (defaults to today)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Rebuild even if a curriculum is stored for this week
    #[arg(long)]
    refresh: bool,
}

#[derive(Debug, serde::Serialize)]
struct CheckinRecord<'a> {
    username: &'a str,
    date: NaiveDate,
    fatigue: Fatigue,
    note: Option<&'a str>,
}

pub(crate) fn run_checkin(store: &StoreArg, arg: &CheckinArg) -> anyhow::Result<()> {
    let CheckinArg {
        username,
        fatigue,
        note,
        date,
    } = arg;

    let date = util::date_or_today(*date);
    let fatigue = Fatigue::new(*fatigue);
    let mut coach = store.open_coach()?;
    coach.record_checkin(username, date, fatigue, note.as_deref())?;
    tracing::info!(username, %date, %fatigue, "check-in saved");
    store.write(&CheckinRecord {
        username,
        date,
        fatigue,
        note: note.as_deref(),
    })
}

pub(crate) fn run_plan(store: &StoreArg, arg: &PlanArg) -> anyhow::Result<()> {
    let PlanArg {
        username,
        fatigue,
        minutes,
        date,
    } = arg;

    let mut coach = store.open_coach()?;
    let plan = coach.daily_plan(
        username,
        fatigue.map(Fatigue::new),
        *minutes,
        util::date_or_today(*date),
    )?;
    tracing::info!(
        username,
        fatigue = %plan.plan.fatigue,
        blocks = plan.plan.blocks.len(),
        "plan ready"
    );
    store.write(&plan)
}

pub(crate) fn run_curriculum(store: &StoreArg, arg: &CurriculumArg) -> anyhow::Result<()> {
    let CurriculumArg {
        username,
        start,
        refresh,
    } = arg;

    let mut coach = store.open_coach()?;
    let curriculum = coach.weekly_curriculum(username, util::date_or_today(*start), *refresh)?;
    store.write(&curriculum)
}
