use std::io;

use clap::Parser;
use color_eyre::eyre;

use crate::{
    center::{Center, Filter},
    report,
    session::Connector,
};

/// Search the keys of the targeted servers, all the criteria must match.
#[derive(Debug, Parser)]
pub struct Search {
    /// A part of the user name.
    #[arg(short, long)]
    pub user: Option<String>,

    /// A part of the public key.
    #[arg(short, long)]
    pub key: Option<String>,

    /// Only search enabled keys.
    #[arg(short, long)]
    pub enabled: bool,
}

impl Search {
    pub async fn run<C: Connector>(self, center: &Center<C>, targets: &[String]) -> eyre::Result<()> {
        let filter = Filter {
            enabled_only: self.enabled,
            user: self.user,
            key: self.key,
        };
        let report = center.search(targets, &filter).await;

        report::matches(&mut io::stdout().lock(), &report)?;

        super::conclude(&report, |_| false)
    }
}
