//! The fleet operation engine, dispatching one task per server
//! with bounded concurrency and collecting exactly one result per server.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::sync::Semaphore;
use tracing::Instrument;

mod error;
pub use error::Error;

/// How many servers are operated on simultaneously by default.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// A handle to cancel the pending part of a [`Fleet`] operation.
#[derive(Debug, Clone)]
pub struct Canceller(Arc<AtomicBool>);

impl Canceller {
    /// Prevent every server not yet started from being started,
    /// servers in flight still run to completion.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A bounded pool of tasks operating on servers.
#[derive(Debug)]
pub struct Fleet {
    concurrency: usize,
    cancelled: Arc<AtomicBool>,
}

impl Fleet {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            cancelled: Default::default(),
        }
    }

    pub fn canceller(&self) -> Canceller {
        Canceller(self.cancelled.clone())
    }

    /// Run `op` for every server of `targets`, at most `concurrency` at once.
    ///
    /// The [`Report`] holds exactly one result per distinct target, in the order
    /// of `targets`, whatever the other servers did.
    pub async fn run<T, F, Fut>(&self, targets: &[String], op: F) -> Report<T>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let mut unique: Vec<String> = Vec::with_capacity(targets.len());
        for target in targets {
            if unique.contains(target) {
                tracing::warn!("Server `{target}` is targeted more than once, ignoring duplicates");
            } else {
                unique.push(target.clone());
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let handles: Vec<_> = unique
            .iter()
            .map(|target| {
                let task = op(target.clone());
                let semaphore = semaphore.clone();
                let cancelled = self.cancelled.clone();
                let span = tracing::info_span!("fleet", server = %target);

                tokio::spawn(
                    async move {
                        let _permit = semaphore
                            .acquire_owned()
                            .await
                            .map_err(|_| Error::Cancelled)?;

                        if cancelled.load(Ordering::SeqCst) {
                            return Err(Error::Cancelled);
                        }

                        task.await
                    }
                    .instrument(span),
                )
            })
            .collect();

        let results = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap_or_else(|err| Err(Error::Panicked(err.to_string()))));

        Report {
            results: unique.into_iter().zip(results).collect(),
        }
    }
}

/// The per-server results of a fleet operation, in target order.
#[derive(Debug)]
pub struct Report<T> {
    results: Vec<(String, Result<T, Error>)>,
}

impl<T> Report<T> {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Result<T, Error>> {
        self.results
            .iter()
            .find(|(target, _)| target == name)
            .map(|(_, result)| result)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Result<T, Error>)> {
        self.results
            .iter()
            .map(|(target, result)| (target.as_str(), result))
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|(target, _)| target.as_str())
    }

    /// Iterate over the servers whose operation failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.iter()
            .filter_map(|(target, result)| result.as_ref().err().map(|err| (target, err)))
    }

    /// Transform every successful result with `f`.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Report<U> {
        Report {
            results: self
                .results
                .into_iter()
                .map(|(target, result)| (target, result.map(&mut f)))
                .collect(),
        }
    }
}

impl<T> IntoIterator for Report<T> {
    type Item = (String, Result<T, Error>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::AtomicUsize, time::Duration};

    use super::*;

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn it_reports_every_target_even_when_all_fail() {
        let targets = targets(&["web1", "web2", "db"]);

        let report = Fleet::new(DEFAULT_CONCURRENCY)
            .run(&targets, |target| async move {
                Err::<(), _>(Error::UnknownServer(target))
            })
            .await;

        assert_eq!(report.targets().collect::<Vec<_>>(), targets);
        assert_eq!(report.failures().count(), 3);
        assert!(matches!(report.get("db"), Some(Err(Error::UnknownServer(name))) if name == "db"));
    }

    #[tokio::test(start_paused = true)]
    async fn it_keeps_target_order_whatever_the_completion_order() {
        let targets = targets(&["a", "b", "c", "d"]);

        let report = Fleet::new(4)
            .run(&targets, |target| async move {
                let delay = 4 - (target.as_bytes()[0] - b'a') as u64;
                tokio::time::sleep(Duration::from_millis(delay * 10)).await;

                Ok(target.to_uppercase())
            })
            .await;

        let values: Vec<_> = report.into_iter().map(|(_, r)| r.unwrap()).collect();
        assert_eq!(values, ["A", "B", "C", "D"]);
    }

    #[tokio::test(start_paused = true)]
    async fn it_bounds_concurrency() {
        let targets: Vec<String> = (0..24).map(|i| format!("host{i}")).collect();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let report = Fleet::new(3)
            .run(&targets, |_| {
                let (running, peak) = (running.clone(), peak.clone());

                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);

                    Ok(())
                }
            })
            .await;

        assert_eq!(report.len(), 24);
        assert_eq!(report.failures().count(), 0);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn it_collapses_duplicate_targets() {
        let calls = Arc::new(AtomicUsize::new(0));

        let report = Fleet::new(2)
            .run(&targets(&["a", "b", "a"]), |_| {
                let calls = calls.clone();

                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert_eq!(report.targets().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn it_isolates_panicking_targets() {
        let report = Fleet::new(2)
            .run(&targets(&["ok", "boom"]), |target| async move {
                if target == "boom" {
                    panic!("exploded");
                }

                Ok(())
            })
            .await;

        assert!(matches!(report.get("ok"), Some(Ok(()))));
        assert!(matches!(report.get("boom"), Some(Err(Error::Panicked(_)))));
    }

    #[tokio::test]
    async fn it_cancels_pending_targets() {
        let fleet = Fleet::new(1);
        fleet.canceller().cancel();

        let report = fleet
            .run(&targets(&["a", "b"]), |_| async { Ok(()) })
            .await;

        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|(_, r)| matches!(r, Err(Error::Cancelled))));
    }

    #[tokio::test]
    async fn it_completes_targets_in_flight_when_cancelled() {
        let fleet = Fleet::new(1);
        let canceller = fleet.canceller();

        let report = fleet
            .run(&targets(&["a", "b", "c"]), |target| {
                let canceller = canceller.clone();

                async move {
                    if target == "a" {
                        canceller.cancel();
                        tokio::task::yield_now().await;
                    }

                    Ok(target)
                }
            })
            .await;

        assert_eq!(report.targets().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert!(matches!(report.get("a"), Some(Ok(target)) if target == "a"));
        assert!(matches!(report.get("b"), Some(Err(Error::Cancelled))));
        assert!(matches!(report.get("c"), Some(Err(Error::Cancelled))));
    }

    #[tokio::test]
    async fn it_accepts_empty_target_lists() {
        let report = Fleet::new(DEFAULT_CONCURRENCY)
            .run(&[], |_| async { Ok(()) })
            .await;

        assert!(report.is_empty());
    }
}
