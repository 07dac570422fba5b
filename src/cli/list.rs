use std::io;

use clap::Parser;
use color_eyre::eyre;

use crate::{center::Center, report, session::Connector};

/// List every key of the targeted servers, grouped by server.
#[derive(Debug, Parser)]
pub struct List {
    /// Only list enabled keys.
    #[arg(short, long)]
    pub enabled: bool,
}

impl List {
    pub async fn run<C: Connector>(self, center: &Center<C>, targets: &[String]) -> eyre::Result<()> {
        let report = center.list(targets, self.enabled).await;

        report::listing(&mut io::stdout().lock(), &report)?;

        super::conclude(&report, |_| false)
    }
}
