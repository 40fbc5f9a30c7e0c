//! envstack CLI
//!
//! Assembles the multi-environment topology and prints or writes it.
//!
//! # Usage
//!
//! ```bash
//! envstack validate --config deploy/envstack.toml
//! envstack stacks --env uat
//! envstack outputs --stack production-app-django-api --format json
//! envstack graph --dot | dot -Tsvg > topology.svg
//! envstack synth --parallel --out topology.json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::Session;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "envstack")]
#[command(version)]
#[command(about = "Multi-environment cloud topology assembler", long_about = None)]
struct Cli {
    /// Deployment config (TOML); the built-in environment table when omitted
    #[arg(long, short, env = "ENVSTACK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Cloud account id
    #[arg(long, env = "CDK_DEFAULT_ACCOUNT", global = true)]
    account: Option<String>,

    /// Restrict to these environments
    #[arg(long = "env", short = 'e', global = true)]
    environments: Vec<String>,

    /// Output format
    #[arg(long, short, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Assemble environments on parallel threads
    #[arg(long, global = true)]
    parallel: bool,

    /// Profile name from config file
    #[arg(long, short, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the service profile and environment table
    Validate,
    /// Assemble every environment and emit the topology
    Synth {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// List stacks with placement and dependencies
    Stacks,
    /// List named outputs
    Outputs {
        /// Only this stack
        #[arg(long)]
        stack: Option<String>,
    },
    /// Show dependency edges
    Graph {
        /// Graphviz instead of a table
        #[arg(long)]
        dot: bool,
    },
    /// Manage the CLI profile file
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Write an empty profile
    Init,
    /// Set a profile value
    Set { key: String, value: String },
    /// Get a profile value
    Get { key: String },
    /// List all profile values
    List,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let profile = config::Config::load(cli.profile.as_deref())?;

    let session = || -> Result<Session> {
        let format = match (cli.format, profile.default_format.as_deref()) {
            (Some(format), _) => format,
            (None, Some(name)) => OutputFormat::parse(name)?,
            (None, None) => OutputFormat::Table,
        };
        Session::new(
            cli.config.as_deref().or(profile.deployment.as_deref()),
            &cli.environments,
            resolve_account(
                cli.account.clone(),
                std::env::var("AWS_ACCOUNT_ID").ok(),
                profile.account.clone(),
            ),
            format,
            cli.parallel || profile.parallel.unwrap_or(false),
        )
    };

    match cli.command {
        Commands::Validate => commands::validate::handle(&session()?),
        Commands::Synth { out } => commands::synth::handle(&session()?, out.as_deref()),
        Commands::Stacks => commands::stacks::handle(&session()?),
        Commands::Outputs { stack } => commands::outputs::handle(&session()?, stack.as_deref()),
        Commands::Graph { dot } => commands::graph::handle(&session()?, dot),
        Commands::Profile { action } => commands::profile::handle(action, cli.profile.as_deref()),
    }
}

/// `--account` / `CDK_DEFAULT_ACCOUNT`, then `AWS_ACCOUNT_ID`, then the profile.
/// Empty values fall through; empty when none is set and the backend resolves it.
fn resolve_account(
    flag: Option<String>,
    environment: Option<String>,
    profile: Option<String>,
) -> String {
    [flag, environment, profile]
        .into_iter()
        .flatten()
        .find(|account| !account.is_empty())
        .unwrap_or_default()
}
