use oxicoach_training::{courses::CourseTopic, text::TextGenerator};

use crate::{
    adapter::ollama::{OllamaArg, OllamaGenerator},
    command::StoreArg,
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CourseArg {
    /// `tactic:<tag>`, `structure:<archetype>`, `opening:<name>` or free text
    #[arg(long)]
    topic: CourseTopic,
    /// Build the course around this player's own mistakes
    #[arg(long)]
    username: Option<String>,
    #[clap(flatten)]
    ollama: OllamaArg,
}

pub(crate) fn run(store: &StoreArg, arg: &CourseArg) -> anyhow::Result<()> {
    let CourseArg {
        topic,
        username,
        ollama,
    } = arg;

    let mut generator = OllamaGenerator::from_arg(ollama)?;
    let generator = generator
        .as_mut()
        .map(|generator| generator as &mut dyn TextGenerator);
    let coach = store.open_coach()?;
    match username {
        Some(username) => {
            let course = coach.adaptive_course(username, topic, generator)?;
            tracing::info!(username, %topic, "adaptive course ready");
            store.write(&course)
        }
        None => {
            let course = coach.course(topic, generator);
            tracing::info!(%topic, "course ready");
            store.write(&course)
        }
    }
}
