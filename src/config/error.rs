use std::path::PathBuf;

use thiserror::Error;

#[cfg(doc)]
use super::Config;

/// An [`enum@Error`] that can occur while loading the [`Config`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    ConfigSpanned(format_serde_error::SerdeError),

    /// A required field is neither set on the server nor on `default`.
    #[error("Server `{server}` has no `{field}`, and none is set in `default`")]
    MissingField {
        server: String,
        field: &'static str,
    },
}
