//! Command dispatch.

pub mod check;
pub mod classify;
pub mod config_cmd;
pub mod serve;

use clap::CommandFactory;
use hostsync_config::Config;

use crate::cli::{Cli, Command, CompletionsArgs, GlobalOpts};
use crate::error::CliError;

/// Print shell completions to stdout.
pub fn completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    clap_complete::generate(args.shell, &mut cmd, "hostsync", &mut std::io::stdout());
}

/// Run a command that needs the loaded configuration.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Serve(args) => serve::handle(&args, cfg).await,
        Command::Classify(args) => classify::handle(&args, cfg, global),
        Command::Check => check::handle(cfg, global).await,
        Command::Config(args) => config_cmd::handle(&args, global),
        Command::Completions(args) => {
            completions(&args);
            Ok(())
        }
    }
}
