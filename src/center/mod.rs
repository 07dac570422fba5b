//! The key management operations: reading, filtering and editing the
//! `authorized_keys` of every targeted server through the [`Fleet`].

use std::sync::Arc;

use crate::{
    config::{Config, Server},
    fleet::{Error, Fleet, Report},
    keys::{remote, AuthorizedKeys, Entry},
    mutation::{self, Outcome},
    session::{Connector, Session},
};

/// A conjunction of criteria on [`Entry`]s, applied in declaration order.
#[derive(Debug, Default, Clone)]
pub struct Filter {
    /// Only keep enabled entries.
    pub enabled_only: bool,
    /// Only keep entries whose comment contains this string.
    pub user: Option<String>,
    /// Only keep entries whose key material contains this string.
    pub key: Option<String>,
}

impl Filter {
    pub fn matches(&self, entry: &Entry) -> bool {
        (!self.enabled_only || entry.enabled)
            && self
                .user
                .as_deref()
                .map_or(true, |user| entry.comment.contains(user))
            && self
                .key
                .as_deref()
                .map_or(true, |key| entry.key_material.contains(key))
    }
}

/// Connect to the server `name`, read and decode its `authorized_keys`,
/// handing back the still-open session and the raw content, untouched.
async fn open<C: Connector>(
    connector: &C,
    name: &str,
    server: &Server,
) -> Result<(C::Session, Vec<u8>, AuthorizedKeys), Error> {
    let mut session = connector.connect(name, server).await?;
    let raw = remote::read(&mut session, name).await?;

    let (keys, errors) = AuthorizedKeys::decode(&raw);
    for err in errors {
        tracing::warn!("Kept a line of `{name}` as-is: {err}");
    }

    Ok((session, raw, keys))
}

/// The entrypoint of every operation, holding the shared state of the fleet tasks.
pub struct Center<C> {
    config: Arc<Config>,
    connector: Arc<C>,
    fleet: Fleet,
}

impl<C: Connector> Center<C> {
    pub fn new(config: Arc<Config>, connector: C, fleet: Fleet) -> Self {
        Self {
            config,
            connector: Arc::new(connector),
            fleet,
        }
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Read the `authorized_keys` of every target.
    pub async fn fetch(&self, targets: &[String]) -> Report<AuthorizedKeys> {
        let (config, connector) = (self.config.clone(), self.connector.clone());

        self.fleet
            .run(targets, move |name| {
                let (config, connector) = (config.clone(), connector.clone());

                async move {
                    let server = config
                        .server(&name)
                        .ok_or_else(|| Error::UnknownServer(name.clone()))?;

                    let (mut session, _, keys) = open(&*connector, &name, server).await?;
                    session.close().await;

                    Ok::<_, Error>(keys)
                }
            })
            .await
    }

    /// List the entries of every target, in file order.
    pub async fn list(&self, targets: &[String], enabled_only: bool) -> Report<Vec<Entry>> {
        self.search(
            targets,
            &Filter {
                enabled_only,
                ..Default::default()
            },
        )
        .await
    }

    /// List the entries of every target matching the `filter`.
    pub async fn search(&self, targets: &[String], filter: &Filter) -> Report<Vec<Entry>> {
        self.fetch(targets).await.map(|keys| {
            keys.entries()
                .filter(|entry| filter.matches(entry))
                .cloned()
                .collect()
        })
    }

    /// Append `entry` to the `authorized_keys` of every target.
    pub async fn add(&self, targets: &[String], entry: Entry) -> Report<Outcome> {
        self.mutate(targets, move |keys| {
            keys.push(entry.clone());

            true
        })
        .await
    }

    /// Remove every entry whose comment is exactly `comment` from every target.
    pub async fn delete(&self, targets: &[String], comment: &str) -> Report<Outcome> {
        let comment = comment.to_string();

        self.mutate(targets, move |keys| {
            let removed = keys.remove(&comment);
            tracing::debug!("Removed {removed} entries for `{comment}`");

            removed > 0
        })
        .await
    }

    /// Read, `edit` and write back the `authorized_keys` of every target,
    /// `edit` reports whether it changed anything.
    async fn mutate<E>(&self, targets: &[String], edit: E) -> Report<Outcome>
    where
        E: Fn(&mut AuthorizedKeys) -> bool + Send + Sync + 'static,
    {
        let (config, connector, edit) = (self.config.clone(), self.connector.clone(), Arc::new(edit));

        self.fleet
            .run(targets, move |name| {
                let (config, connector, edit) = (config.clone(), connector.clone(), edit.clone());

                async move {
                    let server = config
                        .server(&name)
                        .ok_or_else(|| Error::UnknownServer(name.clone()))?;

                    let (mut session, original, mut keys) =
                        open(&*connector, &name, server).await?;

                    let outcome = if edit(&mut keys) {
                        mutation::write_with_verification(
                            &*connector,
                            &name,
                            server,
                            &mut session,
                            &original,
                            &keys.encode(),
                        )
                        .await
                        .map_err(Error::from)
                    } else {
                        Ok(Outcome::Unchanged)
                    };
                    session.close().await;

                    outcome
                }
            })
            .await
    }
}
