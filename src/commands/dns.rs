use clap::{Args, Subcommand};
use serde::Serialize;

use hostadmin::dns::{self, DnsSnapshot, DnsUpdateOutcome};
use hostadmin::remote::PowerShellClient;

use super::{resolve_credentials, CmdResult, GlobalArgs};
use crate::output::EXIT_RECORDED_FAILURE;
use crate::tty::ConsoleOperator;

#[derive(Args)]
pub struct DnsArgs {
    #[command(subcommand)]
    command: DnsCommand,
}

#[derive(Subcommand)]
enum DnsCommand {
    /// Show the DNS servers of the target's active interface
    Show {
        /// Host name or IP address of the target
        target: String,

        /// Named credential profile to connect with
        #[arg(long)]
        credential: Option<String>,
    },
    /// Replace the DNS servers of the target's active interface
    ///
    /// Shows the resolved host and asks for confirmation before changing anything.
    Set {
        /// Host name or IP address of the target
        target: String,

        /// DNS server addresses in order of preference (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        servers: Vec<String>,

        /// Named credential profile to connect with
        #[arg(long)]
        credential: Option<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DnsOutput {
    Show(DnsSnapshot),
    Set(DnsUpdateOutcome),
}

pub fn run(args: DnsArgs, global: &GlobalArgs) -> CmdResult<DnsOutput> {
    let config = global.load_config()?;
    let client = PowerShellClient::from_config(&config.defaults.powershell);

    match args.command {
        DnsCommand::Show { target, credential } => {
            let credentials = resolve_credentials(&config, credential.as_deref())?;
            let snapshot = dns::show_dns(&client, &target, &credentials)?;
            Ok((DnsOutput::Show(snapshot), 0))
        }
        DnsCommand::Set {
            target,
            servers,
            credential,
        } => {
            let credentials = resolve_credentials(&config, credential.as_deref())?;
            let mut operator = ConsoleOperator;
            let outcome = dns::update_dns(&client, &mut operator, &target, &servers, &credentials)?;

            let exit_code = exit_code_for_outcome(&outcome);
            Ok((DnsOutput::Set(outcome), exit_code))
        }
    }
}

/// An applied change that failed a later step, or whose read-back list differs
/// from the requested one, exits non-zero. An abort is a clean exit.
fn exit_code_for_outcome(outcome: &DnsUpdateOutcome) -> i32 {
    match outcome {
        DnsUpdateOutcome::Applied(record) if !record.is_complete() => EXIT_RECORDED_FAILURE,
        _ => 0,
    }
}
