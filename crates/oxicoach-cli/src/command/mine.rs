use chrono::Utc;

use crate::{
    adapter::uci::{EngineArg, UciEngine},
    command::StoreArg,
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct MineArg {
    /// Player whose games are analyzed
    #[arg(long)]
    username: String,
    #[clap(flatten)]
    engine: EngineArg,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TagArg {
    /// Player whose items are tagged
    #[arg(long)]
    username: String,
}

#[derive(Debug, serde::Serialize)]
struct TagSummary {
    tagged: usize,
}

pub(crate) fn run_mine(store: &StoreArg, arg: &MineArg) -> anyhow::Result<()> {
    let MineArg { username, engine } = arg;

    let mut coach = store.open_coach()?;
    let mut engine = UciEngine::spawn(engine)?;
    let summary = coach.mine(username, &mut engine, Utc::now())?;
    store.write(&summary)
}

pub(crate) fn run_tag(store: &StoreArg, arg: &TagArg) -> anyhow::Result<()> {
    let mut coach = store.open_coach()?;
    let tagged = coach.tag_missing(&arg.username)?;
    tracing::info!(username = %arg.username, tagged, "untagged items processed");
    store.write(&TagSummary { tagged })
}
