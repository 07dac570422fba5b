//! The command-line surface, one subcommand per operation.

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, WrapErr};

use crate::{
    center::Center,
    config::Config,
    fleet::{Fleet, Report, DEFAULT_CONCURRENCY},
    keys::remote,
    session::{Connector, Ssh},
};

mod add;
mod del;
mod list;
mod search;

/// Manage SSH authorized keys across a fleet of servers.
#[derive(Debug, Parser)]
#[command(author, version, about, rename_all = "kebab-case")]
pub struct Cli {
    /// The configuration file, in YAML or JSON.
    #[arg(short, long, env = "KEYFLEET_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Treat `name` as a group of servers.
    #[arg(short, long)]
    pub group: bool,

    /// The number of servers operated on simultaneously.
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub jobs: usize,

    /// Seconds to wait for a server to accept the connection.
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// The server or group name.
    pub name: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab-case")]
pub enum Command {
    /// List the keys of the servers.
    List(list::List),
    /// Search keys by user or key part.
    Search(search::Search),
    /// Add a key to the servers.
    Add(add::Add),
    /// Delete every key of a user from the servers.
    Del(del::Del),
}

impl Command {
    pub async fn run<C: Connector>(self, center: &Center<C>, targets: &[String]) -> eyre::Result<()> {
        match self {
            Command::List(cmd) => cmd.run(center, targets).await,
            Command::Search(cmd) => cmd.run(center, targets).await,
            Command::Add(cmd) => cmd.run(center, targets).await,
            Command::Del(cmd) => cmd.run(center, targets).await,
        }
    }
}

impl Cli {
    pub async fn run(self) -> eyre::Result<()> {
        let config = Config::load(&self.config).wrap_err("Unable to load the configuration")?;

        let targets = config.resolve(&self.name, self.group);
        if targets.is_empty() {
            tracing::info!("No server matches `{}`, nothing to do", self.name);

            return Ok(());
        }

        let center = Center::new(
            Arc::new(config),
            Ssh::new(Duration::from_secs(self.timeout)),
            Fleet::new(self.jobs),
        );

        let canceller = center.fleet().canceller();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, waiting for the servers in flight to complete..");

                canceller.cancel();
            }
        });

        self.command.run(&center, &targets).await
    }
}

/// Turn the failures of the `report` into the process outcome,
/// `rejected` tells which successful results still count as failures.
fn conclude<T>(report: &Report<T>, rejected: impl Fn(&T) -> bool) -> eyre::Result<()> {
    let lockouts: Vec<_> = report
        .failures()
        .filter(|(_, err)| err.is_lockout())
        .map(|(name, _)| name)
        .collect();

    if !lockouts.is_empty() {
        eyre::bail!(
            "SSH access may be lost on {}, restore `{}` manually",
            lockouts.join(", "),
            remote::PATH
        );
    }

    let failed = report
        .iter()
        .filter(|(_, result)| result.as_ref().map_or(true, &rejected))
        .count();

    match failed {
        0 => Ok(()),
        failed => Err(eyre::eyre!("{failed} of {} servers failed", report.len())),
    }
}
