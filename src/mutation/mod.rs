//! Verified writes of the remote `authorized_keys` file.
//!
//! Every write is followed by a reconnection probe, when the probe fails the
//! previous content is restored through the session still open.

use parse_display::Display;

use crate::{
    config::Server,
    keys::remote,
    session::{self, Connector, Session},
};

mod error;
pub use error::Error;

/// The progress of a single verified write.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display(style = "kebab-case")]
pub enum State {
    Pending,
    Written,
    Committed,
    RolledBack,
    RollbackFailed,
}

impl State {
    fn allows(self, next: State) -> bool {
        matches!(
            (self, next),
            (State::Pending, State::Written)
                | (
                    State::Written,
                    State::Committed | State::RolledBack | State::RollbackFailed
                )
        )
    }
}

/// What happened to a server's file after a mutation.
#[derive(Debug)]
pub enum Outcome {
    /// The new content was written and a fresh connection succeeded.
    Committed,

    /// The new content prevented a fresh connection and was reverted.
    RolledBack { cause: session::Error },

    /// The mutation did not change anything, nothing was written.
    Unchanged,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Committed => f.write_str("committed"),
            Self::RolledBack { cause } => write!(f, "rolled-back ({cause})"),
            Self::Unchanged => f.write_str("unchanged"),
        }
    }
}

struct Write<'n> {
    name: &'n str,
    state: State,
}

impl<'n> Write<'n> {
    fn new(name: &'n str) -> Self {
        Self {
            name,
            state: State::Pending,
        }
    }

    fn advance(&mut self, next: State) {
        debug_assert!(
            self.state.allows(next),
            "Illegal write transition from `{}` to `{next}`",
            self.state
        );

        tracing::debug!("Write to `{}`: {} -> {next}", self.name, self.state);

        self.state = next;
    }
}

/// Replace the `original` file content of the server `name` with `new`
/// through `session`, then probe a fresh connection with `connector`,
/// reverting to `original` if the probe fails.
pub async fn write_with_verification<C: Connector>(
    connector: &C,
    name: &str,
    server: &Server,
    session: &mut C::Session,
    original: &[u8],
    new: &[u8],
) -> Result<Outcome, Error> {
    let mut write = Write::new(name);

    remote::write(&mut *session, name, new)
        .await
        .map_err(Error::Write)?;
    write.advance(State::Written);

    let probe = match connector.connect(name, server).await {
        Ok(mut probe) => {
            probe.close().await;
            write.advance(State::Committed);

            return Ok(Outcome::Committed);
        }
        Err(err) => err,
    };

    tracing::warn!("Unable to reconnect to `{name}` after the write, rolling back: {probe}");

    match remote::write(&mut *session, name, original).await {
        Ok(()) => {
            write.advance(State::RolledBack);

            Ok(Outcome::RolledBack { cause: probe })
        }
        Err(rollback) => {
            write.advance(State::RollbackFailed);

            tracing::error!(
                "Rollback failed on `{name}`, SSH access may be lost, restore `{}` manually: {rollback}",
                remote::PATH
            );

            Err(Error::RollbackFailed { probe, rollback })
        }
    }
}
