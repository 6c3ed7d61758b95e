//! `lobby config`: inspect the layered configuration the demo runs with

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use lobby_core::PasswordAdvertisement;

use crate::config::{ConfigLoader, LobbyConfig};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings after merging user and project layers
    Show {
        /// Print the merged configuration as TOML instead of a table
        #[arg(long)]
        toml: bool,
    },
    /// List configuration layers in the order they are applied
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show { toml } => {
            let config = ConfigLoader::load()?;
            if toml {
                print!("{}", toml::to_string_pretty(&config)?);
            } else {
                println!("{}", settings_table(&config));
            }
        }
        ConfigCommands::Path => {
            let user = ConfigLoader::user_config_path();
            println!("{}", describe_layer("user", user.as_deref()));
            println!(
                "{}",
                describe_layer("project", Some(&ConfigLoader::project_config_path()))
            );
            println!("Later layers override earlier ones field by field.");
        }
    }
    Ok(())
}

/// Effective settings as `(key, value)` pairs, grouped by section
fn settings(config: &LobbyConfig) -> Vec<(&'static str, String)> {
    let coordinator = &config.coordinator;
    let timeouts = &coordinator.timeouts;
    let host = &config.host;
    vec![
        ("player.name", config.player.name.clone()),
        ("coordinator.session_name", coordinator.session_name.clone()),
        ("coordinator.menu_level", coordinator.menu_level.clone()),
        (
            "coordinator.password_advertisement",
            match coordinator.password_advertisement {
                PasswordAdvertisement::FlagOnly => "flag_only",
                PasswordAdvertisement::Cleartext => "cleartext",
            }
            .to_string(),
        ),
        (
            "coordinator.timeouts",
            format!(
                "create {}s, start {}s, find {}s, join {}s, destroy {}s",
                timeouts.create_secs,
                timeouts.start_secs,
                timeouts.find_secs,
                timeouts.join_secs,
                timeouts.destroy_secs
            ),
        ),
        (
            "coordinator.search",
            format!(
                "up to {} results, ping bucket {}ms",
                coordinator.search.max_results, coordinator.search.ping_bucket_size
            ),
        ),
        ("host.display_name", host.display_name.clone()),
        ("host.map_or_level_id", host.map_or_level_id.clone()),
        ("host.max_players", host.max_players.to_string()),
        ("host.is_lan", host.is_lan.to_string()),
        ("host.uses_presence", host.uses_presence.to_string()),
        (
            "host.password",
            if host.password().is_some() { "set" } else { "none" }.to_string(),
        ),
        ("loopback.latency_ms", config.loopback.latency_ms.to_string()),
    ]
}

fn settings_table(config: &LobbyConfig) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (key, value) in settings(config) {
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    table
}

fn describe_layer(label: &str, path: Option<&Path>) -> String {
    match path {
        Some(path) if path.exists() => format!("{label:<8} {} (found)", path.display()),
        Some(path) => format!("{label:<8} {} (missing)", path.display()),
        None => format!("{label:<8} (no config directory on this platform)"),
    }
}
