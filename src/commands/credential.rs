use clap::{Args, Subcommand};
use serde::Serialize;

use hostadmin::credentials::{self, CredentialSummary, Keychain};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct CredentialArgs {
    #[command(subcommand)]
    command: CredentialCommand,
}

#[derive(Subcommand)]
enum CredentialCommand {
    /// Store a named credential (the secret is prompted for)
    ///
    /// The secret is read as a plain line from the terminal and is echoed
    /// while typed. Enter it where the screen is not shared or recorded.
    Set {
        /// Profile name used with --credential
        name: String,

        /// Account to connect as (e.g. CORP\admin)
        #[arg(long)]
        user: String,
    },
    /// List stored credential profiles
    List,
    /// Remove a credential profile and its secret
    Remove {
        /// Profile name
        name: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CredentialOutput {
    Set(CredentialSummary),
    List { credentials: Vec<CredentialSummary> },
    Remove { name: String },
}

pub fn run(args: CredentialArgs, global: &GlobalArgs) -> CmdResult<CredentialOutput> {
    let mut config = global.load_config()?;

    match args.command {
        CredentialCommand::Set { name, user } => {
            if !crate::tty::is_stdin_tty() {
                return Err(hostadmin::Error::validation_invalid_argument(
                    "secret",
                    "The secret must be entered at an interactive terminal",
                    Some(name),
                ));
            }
            let secret = crate::tty::prompt_password(&format!("Password for {}: ", user))?;
            let summary = credentials::set(&mut config, &Keychain, &name, &user, &secret)?;
            global.save_config(&config)?;
            Ok((CredentialOutput::Set(summary), 0))
        }
        CredentialCommand::List => {
            let credentials = credentials::list(&config, &Keychain)?;
            Ok((CredentialOutput::List { credentials }, 0))
        }
        CredentialCommand::Remove { name } => {
            credentials::remove(&mut config, &Keychain, &name)?;
            global.save_config(&config)?;
            Ok((
                CredentialOutput::Remove {
                    name: name.trim().to_string(),
                },
                0,
            ))
        }
    }
}
