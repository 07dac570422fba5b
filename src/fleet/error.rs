use thiserror::Error;

use crate::{mutation, session};

/// An [`enum@Error`] captured for a single server of a fleet operation,
/// it never affects the other servers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Server `{0}` is not defined in the configuration")]
    UnknownServer(String),

    #[error(transparent)]
    Session(#[from] session::Error),

    #[error(transparent)]
    Mutation(#[from] mutation::Error),

    /// The fleet operation was cancelled before this server was started.
    #[error("Cancelled before being started")]
    Cancelled,

    #[error("The operation panicked: {0}")]
    Panicked(String),
}

impl Error {
    /// Whether this error may have left the server inaccessible.
    pub fn is_lockout(&self) -> bool {
        matches!(self, Self::Mutation(mutation::Error::RollbackFailed { .. }))
    }
}
