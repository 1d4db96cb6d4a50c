use crate::{
    adapter::lichess::{LichessArg, LichessClient},
    command::StoreArg,
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ImportArg {
    /// Player whose games are fetched
    #[arg(long)]
    username: String,
    /// Maximum number of games to fetch
    #[arg(long, default_value_t = 100)]
    limit: usize,
    #[clap(flatten)]
    lichess: LichessArg,
}

pub(crate) fn run(store: &StoreArg, arg: &ImportArg) -> anyhow::Result<()> {
    let ImportArg {
        username,
        limit,
        lichess,
    } = arg;

    let mut coach = store.open_coach()?;
    let mut source = LichessClient::new(lichess)?;
    let summary = coach.import_games(&mut source, username, *limit)?;
    store.write(&summary)
}
