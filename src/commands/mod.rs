use std::path::PathBuf;

use hostadmin::credentials::{self, Keychain};
use hostadmin::defaults::{self, HostadminConfig};
use hostadmin::remote::Credentials;

pub type CmdResult<T> = hostadmin::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Alternate config file (defaults to the platform hostadmin.json)
    pub config_path: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn load_config(&self) -> hostadmin::Result<HostadminConfig> {
        defaults::load_config(self.config_path.as_deref())
    }

    pub fn save_config(&self, config: &HostadminConfig) -> hostadmin::Result<()> {
        defaults::save_config(config, self.config_path.as_deref())
    }
}

/// Resolve `--credential <name>` against the config and the system keychain.
pub(crate) fn resolve_credentials(
    config: &HostadminConfig,
    reference: Option<&str>,
) -> hostadmin::Result<Credentials> {
    credentials::resolve(reference, config, &Keychain)
}

pub mod config;
pub mod credential;
pub mod dns;
pub mod identity;
pub mod pipeline;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (hostadmin::Result<serde_json::Value>, i32) {
    crate::tty::status("hostadmin is working...");

    match command {
        crate::Commands::Identity(args) => dispatch!(args, global, identity),
        crate::Commands::Dns(args) => dispatch!(args, global, dns),
        crate::Commands::Pipeline(args) => dispatch!(args, global, pipeline),
        crate::Commands::Credential(args) => dispatch!(args, global, credential),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
