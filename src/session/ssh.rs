use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use russh::{client, ChannelMsg, Disconnect};
use russh_keys::key;

use super::{Connector, Error, Output, Session};
use crate::config::Server;

/// The client-side [`client::Handler`], accepting any host key on first use.
struct Handler {
    name: String,
}

#[async_trait]
impl client::Handler for Handler {
    type Error = russh::Error;

    async fn check_server_key(
        self,
        server_public_key: &key::PublicKey,
    ) -> Result<(Self, bool), Self::Error> {
        tracing::debug!(
            "Trusting host key of `{}` on first use ({})",
            self.name,
            server_public_key.fingerprint()
        );

        Ok((self, true))
    }
}

/// A [`Connector`] opening real SSH sessions with `russh`.
#[derive(Clone)]
pub struct Ssh {
    config: Arc<client::Config>,
    timeout: Duration,
}

impl Ssh {
    /// Create a connector giving up on hosts not authenticated within `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let config = client::Config {
            connection_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        Self {
            config: Arc::new(config),
            timeout,
        }
    }

    /// Try the keyfile first, then fall back to the password.
    async fn authenticate(
        handle: &mut client::Handle<Handler>,
        name: &str,
        server: &Server,
    ) -> Result<bool, russh::Error> {
        if let Some(keyfile) = &server.keyfile {
            match russh_keys::load_secret_key(keyfile, server.password.as_deref()) {
                Ok(keypair) => {
                    if handle
                        .authenticate_publickey(&server.user, Arc::new(keypair))
                        .await?
                    {
                        return Ok(true);
                    }

                    tracing::debug!("`{name}` rejected the key `{}`", keyfile.display());
                }
                Err(err) => tracing::warn!(
                    "Unable to load the key `{}` for `{name}`: {err}",
                    keyfile.display()
                ),
            }
        }

        match &server.password {
            Some(password) => handle.authenticate_password(&server.user, password).await,
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Connector for Ssh {
    type Session = SshSession;

    async fn connect(&self, name: &str, server: &Server) -> Result<Self::Session, Error> {
        let addr = format!("{}:{}", server.host, server.port);
        let handler = Handler { name: name.into() };

        let connection = async {
            let mut handle = client::connect(
                self.config.clone(),
                (server.host.as_str(), server.port),
                handler,
            )
            .await?;

            let authenticated = Self::authenticate(&mut handle, name, server).await?;

            Ok::<_, russh::Error>((handle, authenticated))
        };

        let (handle, authenticated) = tokio::time::timeout(self.timeout, connection)
            .await
            .map_err(|_| Error::Timeout(addr.clone()))?
            .map_err(|source| Error::Connect { addr, source })?;

        if !authenticated {
            return Err(Error::AuthFailure {
                user: server.user.clone(),
                host: server.host.clone(),
            });
        }

        tracing::trace!("Opened SSH session to `{name}`");

        Ok(SshSession { handle })
    }
}

/// An authenticated `russh` session, one channel is opened per command.
pub struct SshSession {
    handle: client::Handle<Handler>,
}

#[async_trait]
impl Session for SshSession {
    async fn exec(&mut self, command: &str, stdin: &[u8]) -> Result<Output, Error> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(Error::Exec)?;
        channel.exec(true, command).await.map_err(Error::Exec)?;

        if !stdin.is_empty() {
            channel.data(stdin).await.map_err(Error::Exec)?;
        }
        channel.eof().await.map_err(Error::Exec)?;

        let mut output = Output::default();
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => output.stdout.extend_from_slice(data),
                // Extended data of type `1` is the remote `stderr`
                ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                    output.stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status } => output.status = Some(exit_status),
                msg => tracing::trace!("Ignored channel message: {msg:?}"),
            }
        }

        Ok(output)
    }

    async fn close(&mut self) {
        if let Err(err) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            tracing::trace!("Unable to cleanly disconnect: {err}");
        }
    }
}
