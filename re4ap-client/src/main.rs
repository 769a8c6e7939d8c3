mod config;
mod protocol;
mod runtime;
mod session;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use re4ap_lib::bridge::Bridge;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::ClientConfig,
    runtime::{run, ClientOptions},
};

#[derive(Parser)]
#[command(name = "re4ap-client", version)]
#[command(about = "Archipelago client for Resident Evil 4 UHD")]
struct Args {
    /// Client settings file. Defaults to ~/.re4_ap_client.json
    #[arg(short, long, env = "RE4AP_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs)]
struct ConnectionArgs {
    #[arg(long)]
    server: Option<String>,

    #[arg(long)]
    slot: Option<String>,

    #[arg(long, env = "RE4AP_PASSWORD", default_value = "")]
    password: String,

    /// Directory that holds the ap_*.txt files, next to the mod
    #[arg(long)]
    save_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to the server and relay items and checks until Ctrl-C
    Connect(ConnectionArgs),
    /// Copy server and slot from the game's ap_config.txt into the client settings
    SyncFromGame {
        #[arg(long)]
        save_path: Option<PathBuf>,
    },
    /// Write the client settings to the game's ap_config.txt
    PushToGame(ConnectionArgs),
}

fn merged(mut config: ClientConfig, args: &ConnectionArgs) -> ClientConfig {
    if let Some(server) = &args.server {
        config.server = server.trim().to_owned();
    }
    if let Some(slot) = &args.slot {
        config.slot = slot.trim().to_owned();
    }
    if let Some(save_path) = &args.save_path {
        config.save_path = save_path.clone();
    }
    config
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("re4ap_client=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(ClientConfig::default_path);
    let config = ClientConfig::load(&config_path);

    match args.command {
        Command::Connect(connection) => {
            let config = merged(config, &connection);
            config.validate()?;
            config.save(&config_path)?;
            let _ = rustls::crypto::ring::default_provider().install_default();

            let options = ClientOptions {
                server: config.server,
                slot: config.slot,
                password: connection.password,
                save_path: config.save_path,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run(options, async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!("Ctrl-C handler unavailable: {}", err);
                    std::future::pending::<()>().await;
                }
            }))?;
        }
        Command::SyncFromGame { save_path } => {
            let mut config = config;
            if let Some(save_path) = save_path {
                config.save_path = save_path;
            }
            let Some(game) = Bridge::new(config.save_path.clone()).read_config()? else {
                bail!(
                    "No game config found in {}. Configure the connection in the game first.",
                    config.save_path.display()
                );
            };
            config.apply_game_config(&game);
            config.save(&config_path)?;
            info!("Synced from game: {} on {}", config.slot, config.server);
        }
        Command::PushToGame(connection) => {
            let config = merged(config, &connection);
            config.validate()?;
            let bridge = Bridge::new(config.save_path.clone());
            bridge.write_config(&config.to_game_config(&connection.password))?;
            config.save(&config_path)?;
            info!(
                "Pushed to game: {} on {} ({})",
                config.slot,
                config.server,
                bridge.dir().display()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_saved_settings() {
        let args = Args::parse_from([
            "re4ap-client",
            "connect",
            "--slot",
            " Leon ",
            "--save-path",
            "game",
        ]);
        let Command::Connect(connection) = args.command else {
            panic!("expected connect");
        };
        let config = merged(ClientConfig::default(), &connection);
        assert_eq!(config.server, config::DEFAULT_SERVER);
        assert_eq!(config.slot, "Leon");
        assert_eq!(config.save_path, PathBuf::from("game"));
    }

    #[test]
    fn parses_sync_from_game() {
        let args = Args::parse_from(["re4ap-client", "--config", "c.json", "sync-from-game"]);
        assert_eq!(args.config, Some(PathBuf::from("c.json")));
        assert!(matches!(
            args.command,
            Command::SyncFromGame { save_path: None }
        ));
    }
}
