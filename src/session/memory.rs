//! In-memory hosts standing in for real remotes in tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;

use super::{Connector, Error, Output, Session};
use crate::{
    config::Server,
    keys::{
        remote::{READ_COMMAND, WRITE_COMMAND},
        AuthorizedKeys,
    },
};

/// A fake remote holding a single `authorized_keys` file.
#[derive(Debug, Default)]
pub struct Host {
    content: Mutex<Option<Vec<u8>>>,
    writes: Mutex<Vec<Vec<u8>>>,
    connections: AtomicUsize,

    /// Connections are only accepted while this key is present and enabled.
    operator: Option<String>,
    /// The host becomes unreachable right after the first write.
    drops_after_write: bool,
    /// Writes are cut before the command reports its exit status.
    interrupts_writes: bool,
    /// Writes are refused by the remote shell.
    read_only: bool,
    unreachable: AtomicBool,
}

impl Host {
    pub fn new(content: impl AsRef<[u8]>) -> Self {
        Self {
            content: Mutex::new(Some(content.as_ref().to_vec())),
            ..Default::default()
        }
    }

    /// A host without any `authorized_keys` file.
    pub fn missing() -> Self {
        Self::default()
    }

    /// A host refusing every connection.
    pub fn unreachable() -> Self {
        Self {
            unreachable: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn guarded_by(mut self, key_material: &str) -> Self {
        self.operator = Some(key_material.into());
        self
    }

    pub fn dropping_after_write(mut self) -> Self {
        self.drops_after_write = true;
        self
    }

    pub fn interrupting_writes(mut self) -> Self {
        self.interrupts_writes = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn raw(&self) -> Option<Vec<u8>> {
        self.content.lock().unwrap().clone()
    }

    pub fn content(&self) -> Option<String> {
        self.raw()
            .map(|raw| String::from_utf8_lossy(&raw).into_owned())
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .collect()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn accepts(&self) -> bool {
        if self.unreachable.load(Ordering::SeqCst) {
            return false;
        }

        match &self.operator {
            Some(key) => {
                let (keys, _) = AuthorizedKeys::decode(&self.raw().unwrap_or_default());

                let accepted = keys
                    .entries()
                    .any(|entry| entry.enabled && &entry.key_material == key);
                accepted
            }
            None => true,
        }
    }
}

/// A [`Connector`] to a set of named in-memory [`Host`]s.
#[derive(Debug, Default)]
pub struct Memory {
    hosts: HashMap<String, Arc<Host>>,
}

impl Memory {
    pub fn with(mut self, name: &str, host: Host) -> Self {
        self.hosts.insert(name.into(), Arc::new(host));
        self
    }

    pub fn host(&self, name: &str) -> Arc<Host> {
        self.hosts[name].clone()
    }
}

#[async_trait]
impl Connector for Memory {
    type Session = MemorySession;

    async fn connect(&self, name: &str, server: &Server) -> Result<Self::Session, Error> {
        let host = self
            .hosts
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Timeout(format!("{}:{}", server.host, server.port)))?;

        host.connections.fetch_add(1, Ordering::SeqCst);

        if !host.accepts() {
            return Err(Error::AuthFailure {
                user: server.user.clone(),
                host: server.host.clone(),
            });
        }

        Ok(MemorySession { host })
    }
}

pub struct MemorySession {
    host: Arc<Host>,
}

impl MemorySession {
    fn write(&self, content: &[u8]) -> Output {
        if self.host.read_only {
            return Output {
                stderr: b"cat: /root/.ssh/authorized_keys.keyfleet: Permission denied".to_vec(),
                status: Some(1),
                ..Default::default()
            };
        }

        // The temporary file is never renamed over the managed one
        if self.host.interrupts_writes {
            return Output::default();
        }

        *self.host.content.lock().unwrap() = Some(content.to_vec());
        self.host.writes.lock().unwrap().push(content.to_vec());

        if self.host.drops_after_write {
            self.host.unreachable.store(true, Ordering::SeqCst);
        }

        Output {
            status: Some(0),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn exec(&mut self, command: &str, stdin: &[u8]) -> Result<Output, Error> {
        if self.host.unreachable.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        Ok(match command {
            READ_COMMAND => match self.host.raw() {
                Some(content) => Output {
                    stdout: content,
                    status: Some(0),
                    ..Default::default()
                },
                None => Output {
                    stderr: b"cat: /root/.ssh/authorized_keys: No such file or directory".to_vec(),
                    status: Some(1),
                    ..Default::default()
                },
            },
            WRITE_COMMAND => self.write(stdin),
            command => Output {
                stderr: format!("sh: {command}: not found").into_bytes(),
                status: Some(127),
                ..Default::default()
            },
        })
    }
}
