use std::io;

use clap::Parser;
use color_eyre::eyre;

use crate::{center::Center, mutation::Outcome, report, session::Connector};

/// Remove every key of a user from the `authorized_keys` of the targeted servers.
#[derive(Debug, Parser)]
pub struct Del {
    /// The name of the user, matched exactly against the key comments.
    pub username: String,
}

impl Del {
    pub async fn run<C: Connector>(self, center: &Center<C>, targets: &[String]) -> eyre::Result<()> {
        let report = center.delete(targets, &self.username).await;

        report::outcomes(&mut io::stdout().lock(), &report)?;

        super::conclude(&report, |outcome| {
            matches!(outcome, Outcome::RolledBack { .. })
        })
    }
}
