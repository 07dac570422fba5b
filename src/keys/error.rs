use thiserror::Error;

#[cfg(doc)]
use super::Entry;

/// An [`enum@Error`] that can occur while parsing or building an [`Entry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A line of the file does not have the `[#]<type> <key> [comment]` shape.
    #[error("Malformed entry on line {line}: {reason}")]
    MalformedEntry { line: usize, reason: &'static str },

    /// An operator-supplied public key is not a valid OpenSSH key.
    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    /// An operator-supplied comment would not fit on a single line.
    #[error("Invalid comment {0:?}: control characters are not allowed")]
    InvalidComment(String),
}
