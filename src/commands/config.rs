use clap::{Args, Subcommand};
use serde::Serialize;

use hostadmin::defaults::{self, HostadminConfig};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display configuration (defaults merged with hostadmin.json)
    Show,
    /// Show the path to hostadmin.json
    Path,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<HostadminConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
}

pub fn run(args: ConfigArgs, global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show => show(global),
        ConfigCommand::Path => path(global),
    }
}

fn show(global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    let config = global.load_config()?;
    Ok((
        ConfigOutput {
            command: "config.show".to_string(),
            config: Some(config),
            path: None,
            exists: None,
        },
        0,
    ))
}

fn path(global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    let path = defaults::config_file(global.config_path.as_deref())?;
    Ok((
        ConfigOutput {
            command: "config.path".to_string(),
            config: None,
            exists: Some(path.exists()),
            path: Some(path.display().to_string()),
        },
        0,
    ))
}
