//! The fleet description: servers, their credentials, and named groups of them.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;

mod error;
pub use error::Error;

/// The port used when neither the server nor `default` sets one.
pub const DEFAULT_PORT: u16 = 22;

/// A server definition as written in the configuration file,
/// every field may be left unset and inherited from `default`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerDef {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    keyfile: Option<PathBuf>,
    password: Option<String>,
}

impl ServerDef {
    /// Fill every unset field from the `default` definition.
    fn merge(self, default: &ServerDef) -> Self {
        Self {
            host: self.host.or_else(|| default.host.clone()),
            port: self.port.or(default.port),
            user: self.user.or_else(|| default.user.clone()),
            keyfile: self.keyfile.or_else(|| default.keyfile.clone()),
            password: self.password.or_else(|| default.password.clone()),
        }
    }

    fn resolve(self, name: &str) -> Result<Server, Error> {
        let missing = |field| Error::MissingField {
            server: name.into(),
            field,
        };

        Ok(Server {
            host: self.host.ok_or_else(|| missing("host"))?,
            port: self.port.unwrap_or(DEFAULT_PORT),
            user: self.user.ok_or_else(|| missing("user"))?,
            keyfile: self.keyfile,
            password: self.password,
        })
    }
}

/// A fully resolved remote host, ready to be connected to.
#[derive(Clone, PartialEq, Eq)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub keyfile: Option<PathBuf>,
    pub password: Option<String>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("keyfile", &self.keyfile)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDef {
    #[serde(default)]
    default: ServerDef,

    #[serde(default)]
    servers: BTreeMap<String, ServerDef>,

    #[serde(default)]
    groups: HashMap<String, Vec<String>>,
}

/// The loaded configuration, immutable once constructed
/// and shared read-only between every fleet task.
#[derive(Debug)]
pub struct Config {
    servers: BTreeMap<String, Server>,
    groups: HashMap<String, Vec<String>>,
}

impl Config {
    /// Read and resolve the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.into(),
            source,
        })?;

        tracing::debug!("Loaded configuration from `{}`", path.display());

        content.parse()
    }

    /// Access the resolved server named `name`.
    pub fn server(&self, name: &str) -> Option<&Server> {
        self.servers.get(name)
    }

    /// Resolve the operator-supplied `name` to the list of targeted servers,
    /// either as a group name or as a single server name.
    ///
    /// An unknown name resolves to no targets at all, which is not an error.
    pub fn resolve(&self, name: &str, group: bool) -> Vec<String> {
        match group {
            true => self.groups.get(name).cloned().unwrap_or_default(),
            false if self.servers.contains_key(name) => vec![name.into()],
            false => Vec::new(),
        }
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let def: ConfigDef = serde_yaml::from_str(s)
            .map_err(|err| Error::ConfigSpanned(format_serde_error::SerdeError::new(s.into(), err)))?;

        let servers = def
            .servers
            .into_iter()
            .map(|(name, server)| {
                let server = server.merge(&def.default).resolve(&name)?;

                Ok((name, server))
            })
            .collect::<Result<BTreeMap<_, _>, Error>>()?;

        for (group, members) in &def.groups {
            for member in members.iter().filter(|m| !servers.contains_key(*m)) {
                tracing::warn!("Group `{group}` references the undefined server `{member}`");
            }
        }

        Ok(Self {
            servers,
            groups: def.groups,
        })
    }
}
