use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

mod args;
mod auth;
mod cfg;
mod commands;
mod csv_source;
mod error;
mod job;
mod oauth;
mod paths;
mod redact;
mod resolve;
mod sheets;

use args::{Args, Command, ConfigAction};
use auth::CredentialStore;
use cfg::SettingsStore;
use job::{JobContext, JobOptions};
use oauth::HttpTokenEndpoint;
use paths::AppPaths;
use sheets::GoogleSheets;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level)?;

    let paths = AppPaths::resolve(args.config_dir.clone()).context("cannot locate config directory")?;
    let settings = SettingsStore::new(paths.config_file());
    let credentials = CredentialStore::new(paths.auth_file());
    info!("Using config directory {:?}", paths.dir());

    let mut stdout = std::io::stdout();

    match &args.command {
        None => {
            let endpoint = HttpTokenEndpoint::new()?;
            let ctx = JobContext {
                settings: &settings,
                credentials: &credentials,
                token_endpoint: &endpoint,
            };
            let options = JobOptions {
                title: args.title.clone(),
                overrides: args.overrides(),
            };
            let url = job::run_job(&ctx, &options, std::io::stdin().lock(), GoogleSheets::new)
                .await
                .context("failed to write spreadsheet")?;
            println!("{}", url);
        }
        Some(Command::Auth { credentials: file }) => {
            let endpoint = HttpTokenEndpoint::new()?;
            commands::auth::run(
                &credentials,
                &endpoint,
                file.as_deref(),
                &mut std::io::stdin().lock(),
                &mut stdout,
            )
            .await?;
        }
        Some(Command::Config { action }) => match action {
            ConfigAction::List => commands::config::list(&settings, &mut stdout)?,
            ConfigAction::Get { key } => commands::config::get(&settings, key, &mut stdout)?,
            ConfigAction::Set { key, value } => {
                commands::config::set(&settings, key, value, &mut stdout)?
            }
            ConfigAction::Unset { key } => commands::config::unset(&settings, key, &mut stdout)?,
        },
        Some(Command::Info) => commands::info::run(&paths, &settings, &credentials, &mut stdout)?,
        Some(Command::Version) => commands::version::run(&mut stdout)?,
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match level {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    };

    // stdout carries the spreadsheet URL and command output only
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
