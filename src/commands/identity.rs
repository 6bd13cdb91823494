use clap::Args;

use hostadmin::identity::{self, ConfirmationResult};
use hostadmin::remote::PowerShellClient;

use super::{resolve_credentials, CmdResult, GlobalArgs};
use crate::output::EXIT_RECORDED_FAILURE;

#[derive(Args)]
pub struct IdentityArgs {
    /// Host name or IP address of the target
    pub target: String,

    /// Expected logged-on user (`name` or `DOMAIN\name`)
    #[arg(long)]
    pub user: Option<String>,

    /// Named credential profile to connect with (defaults to the current identity)
    #[arg(long)]
    pub credential: Option<String>,
}

pub fn run(args: IdentityArgs, global: &GlobalArgs) -> CmdResult<ConfirmationResult> {
    let config = global.load_config()?;
    let credentials = resolve_credentials(&config, args.credential.as_deref())?;
    let client = PowerShellClient::from_config(&config.defaults.powershell);

    let result = identity::confirm(&client, &args.target, args.user.as_deref(), &credentials)?;
    let exit_code = if result.error.is_some() {
        EXIT_RECORDED_FAILURE
    } else {
        0
    };

    Ok((result, exit_code))
}
