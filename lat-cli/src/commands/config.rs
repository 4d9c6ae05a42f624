//! `lat config` - inspect the merged configuration

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::{COLLECTOR_URL_ENV, ConfigLoader, PROJECT_CONFIG_DIR_ENV};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print where configuration is read from
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = ConfigLoader::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommands::Path => {
            match ConfigLoader::user_config_path() {
                Some(path) => println!("User config:    {}", describe(&path)),
                None => println!("User config:    (no home directory)"),
            }
            println!(
                "Project config: {}",
                describe(&ConfigLoader::project_config_path())
            );
            println!("Overrides:      {PROJECT_CONFIG_DIR_ENV}, {COLLECTOR_URL_ENV}");
            Ok(())
        }
    }
}

fn describe(path: &Path) -> String {
    let state = if path.exists() { "found" } else { "missing" };
    format!("{} ({state})", path.display())
}
