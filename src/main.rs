//! Tabshelf - Main Entry Point
//!
//! Save URLs into groups and reopen them as embedded panels. Pages that refuse
//! to be framed fall back to provider embeds, link cards or a blocked notice.

mod config;
mod error;
mod export;
mod render;
mod resolver;
mod session;
mod state;
mod store;
mod ui;
mod url_utils;

use clap::{Parser, Subcommand};
use config::{get_config_file_path, get_data_dir, load_config, save_config, Settings};
use error::Result;
use log::{error, info, warn};
use resolver::Resolver;
use state::AppState;
use std::path::PathBuf;
use store::{JsonFileStore, KeyValueStore};
use ui::{Command, Shell};

/// Application name constant.
const APP_NAME: &str = "Tabshelf";

#[derive(Parser, Debug)]
#[command(name = "tabshelf", version, about = "Saved tabs reopened as embedded panels")]
struct Cli {
    /// Override the CORS relay prefix for this run
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Directory holding saved items and groups
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep saved items in memory only
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Start the interactive shell (default)
    Shell,
    /// Print how a URL would be displayed
    Resolve { url: String },
    /// List saved items
    List {
        /// Only items whose name or URL contains this text
        search: Option<String>,
    },
    /// Save a URL
    Add {
        url: String,
        #[arg(long)]
        name: Option<String>,
        /// Name of an existing group
        #[arg(long)]
        group: Option<String>,
    },
    /// Show the effective configuration
    Config {
        /// Write it back to the config file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = load_config();
    if let Some(proxy) = cli.proxy {
        settings.cors_proxy_url = proxy;
    }
    if let Some(dir) = cli.data_dir {
        settings.data_dir = Some(dir);
    }
    settings.sanitize();

    let command = cli.command.unwrap_or(CliCommand::Shell);

    match command {
        CliCommand::Config { write } => {
            if write {
                save_config(&settings)?;
            }
            println!("# {}", get_config_file_path()?.display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        CliCommand::Resolve { url } => {
            let resolver = Resolver::from_settings(&settings)?;
            let url = resolve_target(&url);
            let decision = resolver.resolve(&url).await;
            println!("{} {}", decision.label(), url);
            Ok(())
        }
        CliCommand::List { search } => {
            let state = open_state(settings, cli.in_memory)?;
            let resolver = Resolver::from_settings(&state.settings)?;
            let mut shell = Shell::new(state, resolver);
            shell.execute(Command::ListSaved(search), &mut std::io::stdout())?;
            Ok(())
        }
        CliCommand::Add { url, name, group } => {
            let mut state = open_state(settings, cli.in_memory)?;
            let group_id = match group {
                Some(wanted) => {
                    let found = state
                        .store()
                        .groups()
                        .iter()
                        .find(|g| g.name.eq_ignore_ascii_case(wanted.trim()))
                        .map(|g| g.id);
                    if found.is_none() {
                        warn!("No group named '{}', saving as uncategorized", wanted);
                    }
                    found
                }
                None => None,
            };
            let name = name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| url_utils::tab_title(&url_utils::normalize_scheme(&url)));
            state.store_mut().add_item(&name, &url, group_id)?;
            println!("Saved '{}'", name);
            Ok(())
        }
        CliCommand::Shell => {
            info!("Starting {}", APP_NAME);
            let state = open_state(settings, cli.in_memory)?;
            let resolver = Resolver::from_settings(&state.settings)?;
            info!("Using CORS relay {}", resolver.relay().prefix());
            Shell::new(state, resolver).run().await
        }
    }
}

/// URL a session would load for `raw`.
fn resolve_target(raw: &str) -> String {
    url_utils::canonical_url(raw)
}

/// Build the app state over the configured backend.
fn open_state(settings: Settings, in_memory: bool) -> Result<AppState> {
    if in_memory {
        info!("Keeping saved items in memory");
        return Ok(AppState::in_memory(settings));
    }
    let dir = get_data_dir(&settings)?;
    info!("Saved items stored in {}", dir.display());
    let backend: Box<dyn KeyValueStore> = Box::new(JsonFileStore::open(dir)?);
    Ok(AppState::new(settings, backend))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_targets_embed_url() {
        assert_eq!(
            resolve_target("youtube.com/watch?v=x"),
            "https://www.youtube.com/embed/x"
        );
        assert_eq!(resolve_target("docs.rs"), "https://docs.rs");
    }

    #[test]
    fn test_cli_defaults_to_shell() {
        let cli = Cli::try_parse_from(["tabshelf", "--in-memory"]).unwrap();
        assert!(cli.in_memory);
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["tabshelf", "resolve", "docs.rs", "--proxy", "p?"]).unwrap();
        assert_eq!(cli.proxy.as_deref(), Some("p?"));
        assert!(matches!(cli.command, Some(CliCommand::Resolve { ref url }) if url == "docs.rs"));
    }
}
