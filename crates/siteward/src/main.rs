mod cli;
mod commands;
mod error;
mod http;
mod logging;

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
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "siteward", &mut std::io::stdout());
            Ok(())
        }

        Command::ConfigPath => {
            let path = cli
                .global
                .config
                .unwrap_or_else(siteward_config::config_path);
            println!("{}", path.display());
            Ok(())
        }

        cmd => {
            let config = siteward_config::load_config(cli.global.config.as_deref())?;
            logging::init(cli.global.verbose, &config.logging);
            commands::dispatch(cmd, &config).await
        }
    }
}
