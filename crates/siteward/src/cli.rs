//! Clap derive structures for the `siteward` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// siteward -- switch collaboration sites to read-only access
#[derive(Debug, Parser)]
#[command(
    name = "siteward",
    version,
    about = "Switch collaboration sites to read-only access",
    long_about = "Runs the SetSiteReadOnly HTTP trigger, or performs a single downgrade\n\
        from the command line. Visitors, members and owners are cleared, the new\n\
        owner is installed, and visitors are repopulated from the prior membership.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the configuration file
    #[arg(long, env = "SITEWARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP trigger
    Serve(ServeArgs),

    /// Downgrade a single site and print the JSON result
    Downgrade(DowngradeArgs),

    /// Print the configuration file path
    ConfigPath,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Socket address to listen on (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Debug, Args)]
pub struct DowngradeArgs {
    /// Absolute URL of the site to downgrade
    #[arg(long)]
    pub site_url: String,

    /// Login name installed as the sole owner
    #[arg(long)]
    pub owner: String,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
