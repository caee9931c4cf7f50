use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use homedir::my_home;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod catalog;
mod cli;
mod commands;
mod config;
mod embedding;
mod paginate;
mod recommend;
mod storage;
#[cfg(test)]
mod tests;

use cli::Command;
use config::Config;

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("likeness=info"),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to install log subscriber")
}

fn base_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var("LIKENESS_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }

    let home = my_home()
        .context("Could not determine home directory")?
        .context("Home directory path is empty")?;
    Ok(home.join(".local/share/likeness"))
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_tracing()?;

    let config = Config::load_with(base_path()?)?;
    log::debug!("using base path {}", config.base_path().display());

    match args.command {
        Command::Recommend {
            like,
            dislike,
            page,
            page_size,
            max_results,
            json,
        } => commands::recommend(
            &config,
            commands::RecommendArgs {
                like,
                dislike,
                page,
                page_size,
                max_results,
                json,
            },
        ),
        Command::Browse { page_size } => commands::browse(&config, page_size),
        Command::Import { source } => commands::import(&config, &source),
        Command::Info {} => commands::info(&config),
    }
}
