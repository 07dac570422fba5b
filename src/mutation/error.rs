use thiserror::Error;

use crate::session;

/// An [`enum@Error`] that can occur during a verified write.
#[derive(Debug, Error)]
pub enum Error {
    /// The new content could not be delivered, the file was left untouched.
    #[error("Unable to write `~/.ssh/authorized_keys`: {0}")]
    Write(#[source] session::Error),

    /// The write locked us out, and the previous content could not be restored.
    #[error(
        "Unable to reconnect after writing ({probe}) and to restore the previous content ({rollback}), \
        SSH access may be lost: restore `~/.ssh/authorized_keys` manually"
    )]
    RollbackFailed {
        probe: session::Error,
        rollback: session::Error,
    },
}
