//! The boundary to remote hosts: opening authenticated sessions
//! and executing single shell commands on them.

use async_trait::async_trait;

use crate::config::Server;

mod error;
pub use error::Error;

mod ssh;
pub use ssh::{Ssh, SshSession};

#[cfg(test)]
pub mod memory;

/// The captured result of a remote command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Output {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: Option<u32>,
}

impl Output {
    /// Whether the command reported success, a missing status counts as one.
    pub fn success(&self) -> bool {
        self.status.unwrap_or(0) == 0
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// An authenticated session to a single host.
#[async_trait]
pub trait Session: Send {
    /// Execute `command` through the remote shell, feeding it `stdin`
    /// followed by an end-of-file, and capture its output.
    async fn exec(&mut self, command: &str, stdin: &[u8]) -> Result<Output, Error>;

    /// Gracefully terminate the session.
    async fn close(&mut self) {}
}

/// A factory of [`Session`]s, shared between every fleet task.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Session: Session + 'static;

    /// Open and authenticate a fresh session to the server `name`.
    async fn connect(&self, name: &str, server: &Server) -> Result<Self::Session, Error>;
}
