//! Human-readable rendering of fleet reports.

use std::io::{self, Write};

use crate::{
    fleet::{Error, Report},
    keys::Entry,
    mutation::Outcome,
};

/// The one-line display of an [`Entry`].
pub struct Summary<'e>(pub &'e Entry);

impl std::fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Summary(entry) = self;
        let marker = if entry.enabled { "[+]" } else { "[X]" };

        write!(
            f,
            "{marker}User: {} ({})",
            entry.comment,
            entry.short_key()
        )
    }
}

fn error(out: &mut impl Write, name: &str, err: &Error) -> io::Result<()> {
    writeln!(out, "{name}: error: {err}")
}

/// Render entries grouped by server, under a header per server.
pub fn listing(out: &mut impl Write, report: &Report<Vec<Entry>>) -> io::Result<()> {
    for (name, result) in report.iter() {
        writeln!(out, "===== {name} =====")?;

        match result {
            Ok(entries) => {
                for entry in entries {
                    writeln!(out, "{}", Summary(entry))?;
                }
            }
            Err(err) => error(out, name, err)?,
        }
    }

    Ok(())
}

/// Render entries one per line, each prefixed with its server.
pub fn matches(out: &mut impl Write, report: &Report<Vec<Entry>>) -> io::Result<()> {
    for (name, result) in report.iter() {
        match result {
            Ok(entries) => {
                for entry in entries {
                    writeln!(out, "{name} | {}", Summary(entry))?;
                }
            }
            Err(err) => error(out, name, err)?,
        }
    }

    Ok(())
}

/// Render the outcome of a mutation on every server.
pub fn outcomes(out: &mut impl Write, report: &Report<Outcome>) -> io::Result<()> {
    for (name, result) in report.iter() {
        match result {
            Ok(outcome) => writeln!(out, "{name}: {outcome}")?,
            Err(err) => error(out, name, err)?,
        }
    }

    Ok(())
}
