use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{config, credential, dns, identity, pipeline};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "hostadmin")]
#[command(version = VERSION)]
#[command(about = "CLI for remote Windows DNS administration and pipeline walkthroughs")]
struct Cli {
    /// Use an alternate config file instead of hostadmin.json
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: TopLevel,
}

#[derive(Subcommand)]
enum TopLevel {
    #[command(flatten)]
    Json(Commands),
    /// List available commands (alias for --help)
    List,
}

#[derive(Subcommand)]
enum Commands {
    /// Confirm a target's host name and logged-on user
    Identity(identity::IdentityArgs),
    /// Show or change the DNS servers of a remote host
    Dns(dns::DnsArgs),
    /// Split a piped command and evaluate it stage by stage
    Pipeline(pipeline::PipelineArgs),
    /// Manage named credentials for remote connections
    Credential(credential::CredentialArgs),
    /// Show hostadmin configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let command = match cli.command {
        TopLevel::Json(command) => command,
        TopLevel::List => {
            let mut cmd = Cli::command();
            if cmd.print_help().is_err() {
                return std::process::ExitCode::from(1);
            }
            println!();
            return std::process::ExitCode::SUCCESS;
        }
    };

    let global = GlobalArgs {
        config_path: cli.config,
    };

    let (json_result, exit_code) = commands::run_json(command, &global);

    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("{}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_is_handled_outside_json_dispatch() {
        let cli = Cli::try_parse_from(["hostadmin", "list"]).unwrap();
        assert!(matches!(cli.command, TopLevel::List));

        let cli = Cli::try_parse_from(["hostadmin", "dns", "show", "WIN10"]).unwrap();
        assert!(matches!(cli.command, TopLevel::Json(Commands::Dns(_))));
    }

    #[test]
    fn global_config_flag_follows_subcommand() {
        let cli =
            Cli::try_parse_from(["hostadmin", "config", "path", "--config", "/tmp/alt.json"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/alt.json")));
    }

    #[test]
    fn credential_set_help_warns_that_secret_is_echoed() {
        let mut cmd = Cli::command();
        let set = cmd
            .find_subcommand_mut("credential")
            .and_then(|c| c.find_subcommand_mut("set"))
            .unwrap();
        let help = set.render_long_help().to_string();
        assert!(help.contains("echoed"), "{}", help);
    }
}
