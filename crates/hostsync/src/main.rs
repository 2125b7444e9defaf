mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod server;

use clap::Parser;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands work without a valid configuration
        Command::Config(ref args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(ref args) => {
            commands::completions(args);
            Ok(())
        }

        cmd => {
            let cfg = hostsync_config::load_config(cli.global.config.as_deref())?;
            let default_level = if matches!(cmd, Command::Serve(_)) {
                cfg.logging.level.as_str()
            } else {
                "warn"
            };
            let _guard = logging::init(cli.global.verbose, default_level, &cfg.logging)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &cfg, &cli.global).await
        }
    }
}
