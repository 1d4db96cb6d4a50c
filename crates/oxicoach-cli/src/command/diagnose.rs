use crate::command::StoreArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct DiagnoseArg {
    /// Player to diagnose
    #[arg(long)]
    username: String,
    /// Print per-motif statistics instead of the ranked diagnostics
    #[arg(long)]
    tags_only: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ProArg {
    /// Player to diagnose
    #[arg(long)]
    username: String,
}

pub(crate) fn run_diagnose(store: &StoreArg, arg: &DiagnoseArg) -> anyhow::Result<()> {
    let coach = store.open_coach()?;
    if arg.tags_only {
        let stats = coach.tag_stats(&arg.username)?;
        return store.write(&stats);
    }
    let diagnostics = coach.diagnostics(&arg.username)?;
    tracing::info!(
        username = %arg.username,
        signals = diagnostics.signals.len(),
        structures = diagnostics.meta.structures_detected,
        "diagnostics ready"
    );
    store.write(&diagnostics)
}

pub(crate) fn run_pro(store: &StoreArg, arg: &ProArg) -> anyhow::Result<()> {
    let coach = store.open_coach()?;
    let pro = coach.pro_diagnostics(&arg.username)?;
    store.write(&pro)
}
