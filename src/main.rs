use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use inquire::error::InquireResult;
use tracing_subscriber::EnvFilter;

mod ai;
mod app;
mod cli;
mod config;
mod documents;
mod library;
mod lock;
mod pipeline;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use app::AppFactory;
use cli::Command;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let paths = AppFactory::get_paths()?;
    let config = AppFactory::create_config(&paths.base_path)?;

    let _lock = lock::LibraryLock::try_acquire(Path::new(&paths.base_path))
        .context("failed to lock library")?;

    let app = AppFactory::create_app_service(&paths, &config, args.command.needs_ai())?;

    match args.command {
        Command::Daemon { addr } => {
            let addr = addr.unwrap_or_else(|| config.daemon.addr.clone());
            web::start_daemon(app, &addr)
        }

        Command::Upload { owner, paths } => {
            let mut outcomes = vec![];
            for path in paths {
                let filename = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .with_context(|| format!("not a file path: {}", path.display()))?
                    .to_string();
                let content = std::fs::read(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;

                outcomes.push(app.upload(&owner.owner, &filename, &content)?);
            }
            print_json(&outcomes)
        }

        Command::List { owner } => print_json(&app.list(&owner.owner)?),

        Command::Delete {
            owner,
            filename,
            yes,
        } => {
            if !yes {
                match inquire::prompt_confirmation(format!(
                    "Are you sure you want to delete {filename}?"
                )) {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                }
            }

            app.delete(&owner.owner, &filename)?;
            print_json(&serde_json::json!({"filename": filename, "deleted": true}))
        }

        Command::Retag { owner, filename } => {
            print_json(&app.retag(&owner.owner, &filename)?)
        }

        Command::Categorize { owner } => print_json(&app.categorize(&owner.owner)?),

        Command::Search { owner, query } => {
            print_json(&app.search(&owner.owner, &query.join(" "))?)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
