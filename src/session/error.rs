use thiserror::Error;

/// An [`enum@Error`] that can occur while talking to a remote host.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not be established.
    #[error("Unable to connect to `{addr}`: {source}")]
    Connect {
        addr: String,
        source: russh::Error,
    },

    /// The transport could not be established in time.
    #[error("Timed out connecting to `{0}`")]
    Timeout(String),

    /// No configured credential was accepted by the remote.
    #[error("Authentication failed for `{user}@{host}`")]
    AuthFailure { user: String, host: String },

    /// The command channel failed before the command completed.
    #[error("Unable to execute remote command: {0}")]
    Exec(#[source] russh::Error),

    /// The command ran but reported a failure.
    #[error("Remote command exited with status {status}: {stderr}")]
    Status { status: u32, stderr: String },

    /// The session was closed by the remote before the command completed.
    #[error("The remote closed the session")]
    Closed,
}
