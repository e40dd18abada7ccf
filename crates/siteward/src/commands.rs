//! Subcommands that need a loaded configuration.

use std::net::SocketAddr;

use tracing::debug;

use siteward_config::Config;
use siteward_core::{RemoteSessionProvider, SiteAccessDowngrader};

use crate::cli::{Command, DowngradeArgs, ServeArgs};
use crate::error::CliError;
use crate::http::{self, AppState};

pub async fn dispatch(cmd: Command, config: &Config) -> Result<(), CliError> {
    debug!(command = ?cmd, "dispatching command");
    match cmd {
        Command::Serve(args) => serve(args, config).await,
        Command::Downgrade(args) => downgrade(&args, config).await,
        Command::ConfigPath | Command::Completions(_) => Ok(()),
    }
}

async fn serve(args: ServeArgs, config: &Config) -> Result<(), CliError> {
    // Refuse to expose an unguarded trigger.
    let key = config.function_key()?;

    let addr: SocketAddr = match args.bind {
        Some(bind) => bind.parse().map_err(|_| CliError::Validation {
            message: format!("invalid --bind address: {bind}"),
        })?,
        None => config.bind_addr()?,
    };

    let provider = RemoteSessionProvider::new(config.connection()?)?;
    let state = AppState::new(SiteAccessDowngrader::new(provider), key);

    http::serve(addr, state).await?;
    Ok(())
}

async fn downgrade(args: &DowngradeArgs, config: &Config) -> Result<(), CliError> {
    let provider = RemoteSessionProvider::new(config.connection()?)?;
    let outcome = SiteAccessDowngrader::new(provider)
        .downgrade(&args.site_url, &args.owner)
        .await?;

    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}
