use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use oxicoach_store::SqliteRepository;
use oxicoach_training::{coach::Coach, config::CoachConfig};

use self::{
    course::CourseArg,
    diagnose::{DiagnoseArg, ProArg},
    import::ImportArg,
    mine::{MineArg, TagArg},
    plan::{CheckinArg, CurriculumArg, PlanArg},
    practice::{AttemptArg, ReviewsArg, SessionArg},
};
use crate::util::{self, Output};

mod course;
mod diagnose;
mod import;
mod mine;
mod plan;
mod practice;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[clap(flatten)]
    store: StoreArg,
    /// What to run
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Fetch a player's recent games
    Import(#[clap(flatten)] ImportArg),
    /// Find blunders in stored games and store them as training items
    Mine(#[clap(flatten)] MineArg),
    /// Tag stored items that have no motif tags yet
    Tag(#[clap(flatten)] TagArg),
    /// Rank what the player should work on
    Diagnose(#[clap(flatten)] DiagnoseArg),
    /// Phase, opening breakpoint and conversion statistics
    Pro(#[clap(flatten)] ProArg),
    /// Record today's fatigue
    Checkin(#[clap(flatten)] CheckinArg),
    /// Build today's training plan
    Plan(#[clap(flatten)] PlanArg),
    /// Build (or show the stored) seven-day curriculum
    Curriculum(#[clap(flatten)] CurriculumArg),
    /// Pick today's puzzles
    Session(#[clap(flatten)] SessionArg),
    /// Submit one move of a puzzle solution
    Attempt(#[clap(flatten)] AttemptArg),
    /// List or complete spaced reviews
    Reviews(#[clap(flatten)] ReviewsArg),
    /// Generate a course on a topic
    Course(#[clap(flatten)] CourseArg),
}

/// Options shared by every command.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct StoreArg {
    /// SQLite database file
    #[arg(long, global = true, default_value = "oxicoach.sqlite")]
    db: PathBuf,
    /// Pipeline configuration file (JSON); defaults apply to missing fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Output file path (stdout when omitted)
    #[arg(long, global = true)]
    output: Option<PathBuf>,
}

impl StoreArg {
    pub(crate) fn open_coach(&self) -> anyhow::Result<Coach<SqliteRepository>> {
        let config: CoachConfig = match &self.config {
            Some(path) => util::read_json_file("configuration", path)?,
            None => CoachConfig::default(),
        };
        let repo = SqliteRepository::open(&self.db)
            .with_context(|| format!("Failed to open database: {}", self.db.display()))?;
        Ok(Coach::new(repo, config))
    }

    pub(crate) fn write<T>(&self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        Output::save_json(value, self.output.as_deref())
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    let store = &args.store;
    match &args.mode {
        Mode::Import(arg) => import::run(store, arg)?,
        Mode::Mine(arg) => mine::run_mine(store, arg)?,
        Mode::Tag(arg) => mine::run_tag(store, arg)?,
        Mode::Diagnose(arg) => diagnose::run_diagnose(store, arg)?,
        Mode::Pro(arg) => diagnose::run_pro(store, arg)?,
        Mode::Checkin(arg) => plan::run_checkin(store, arg)?,
        Mode::Plan(arg) => plan::run_plan(store, arg)?,
        Mode::Curriculum(arg) => plan::run_curriculum(store, arg)?,
        Mode::Session(arg) => practice::run_session(store, arg)?,
        Mode::Attempt(arg) => practice::run_attempt(store, arg)?,
        Mode::Reviews(arg) => practice::run_reviews(store, arg)?,
        Mode::Course(arg) => course::run(store, arg)?,
    }
    Ok(())
}
