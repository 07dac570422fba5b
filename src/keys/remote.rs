//! Reading and overwriting the remote `authorized_keys` file through a [`Session`].
//!
//! The new content is streamed over the command's `stdin` into a temporary file
//! next to the managed one, which is then renamed over it: an interrupted
//! transfer leaves the previous file in place.

use crate::session::{self, Session};

/// The location of the managed file on every remote.
pub const PATH: &str = "~/.ssh/authorized_keys";

pub(crate) const READ_COMMAND: &str = "cat ~/.ssh/authorized_keys";
pub(crate) const WRITE_COMMAND: &str = "umask 077 && mkdir -p ~/.ssh \
    && cat > ~/.ssh/authorized_keys.keyfleet \
    && mv -f ~/.ssh/authorized_keys.keyfleet ~/.ssh/authorized_keys";

/// Fetch the raw content of the remote file, byte for byte.
///
/// Anything the remote writes on `stderr` is surfaced as a warning while
/// `stdout` is still used, so a missing file reads as an empty one.
pub async fn read(session: &mut impl Session, name: &str) -> Result<Vec<u8>, session::Error> {
    let output = session.exec(READ_COMMAND, &[]).await?;

    if !output.stderr.is_empty() || !output.success() {
        tracing::warn!("`{name}` reported while reading `{PATH}`: {}", output.stderr());
    }

    Ok(output.stdout)
}

/// Overwrite the remote file with `content`.
///
/// The write only counts as delivered once the remote reported a zero exit status.
pub async fn write(
    session: &mut impl Session,
    name: &str,
    content: &[u8],
) -> Result<(), session::Error> {
    let output = session.exec(WRITE_COMMAND, content).await?;

    match output.status {
        None => Err(session::Error::Closed),
        Some(0) => {
            if !output.stderr.is_empty() {
                tracing::warn!("`{name}` reported while writing `{PATH}`: {}", output.stderr());
            }

            Ok(())
        }
        Some(status) => Err(session::Error::Status {
            status,
            stderr: output.stderr(),
        }),
    }
}
