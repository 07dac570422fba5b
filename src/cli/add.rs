use std::io;

use clap::Parser;
use color_eyre::eyre::{self, WrapErr};

use crate::{
    center::Center,
    keys::{Entry, DEFAULT_KEY_TYPE},
    mutation::Outcome,
    report,
    session::Connector,
};

/// Append a public key to the `authorized_keys` of the targeted servers.
#[derive(Debug, Parser)]
pub struct Add {
    /// The base64 public key material.
    pub publickey: String,

    /// The name of the user, stored as the key comment.
    pub username: String,

    /// The type of the public key.
    #[arg(short = 't', long, default_value = DEFAULT_KEY_TYPE)]
    pub keytype: String,
}

impl Add {
    pub async fn run<C: Connector>(self, center: &Center<C>, targets: &[String]) -> eyre::Result<()> {
        let entry = Entry::new(self.keytype, self.publickey, self.username);
        entry
            .validate()
            .wrap_err("Refusing to distribute an invalid public key")?;

        let report = center.add(targets, entry).await;

        report::outcomes(&mut io::stdout().lock(), &report)?;

        super::conclude(&report, |outcome| {
            matches!(outcome, Outcome::RolledBack { .. })
        })
    }
}
