use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

mod adapter;
mod command;
mod util;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oxicoach=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    command::run()
}
