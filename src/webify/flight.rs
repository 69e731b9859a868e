//! Per-key request coalescing.
//!
//! The first caller for a key runs the work; callers arriving while it runs
//! wait for the same outcome instead of starting a second run. Waiters see
//! failures as [`Error::TranscodeFailed`] carrying the leader's message.

use std::path::PathBuf;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fileserve_common::{Error, Result};
use std::future::Future;
use tokio::sync::watch;

type Outcome<T> = Option<std::result::Result<T, String>>;

enum Role<T> {
    Leader(watch::Sender<Outcome<T>>),
    Follower(watch::Receiver<Outcome<T>>),
}

pub struct SingleFlight<T> {
    inflight: DashMap<PathBuf, watch::Receiver<Outcome<T>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            inflight: DashMap::new(),
        }
    }
}

/// Releases the key even if the leader's future is dropped mid-run.
struct FlightGuard<'a, T> {
    inflight: &'a DashMap<PathBuf, watch::Receiver<Outcome<T>>>,
    key: PathBuf,
}

impl<T> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        self.inflight.remove(&self.key);
    }
}

impl<T: Clone + Send + Sync> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently running.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    /// Run `work` for `key` unless a run is already in flight, in which case
    /// wait for that run's outcome.
    pub async fn run<F, Fut>(&self, key: PathBuf, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut work = Some(work);
        loop {
            let role = match self.inflight.entry(key.clone()) {
                Entry::Occupied(entry) => Role::Follower(entry.get().clone()),
                Entry::Vacant(entry) => {
                    let (tx, rx) = watch::channel(None);
                    entry.insert(rx);
                    Role::Leader(tx)
                }
            };

            match role {
                Role::Follower(mut rx) => {
                    tracing::debug!("Joining in-flight run for {:?}", key);
                    let outcome = match rx.wait_for(Option::is_some).await {
                        Ok(outcome) => outcome.clone(),
                        Err(_) => None,
                    };
                    match outcome {
                        Some(Ok(value)) => return Ok(value),
                        Some(Err(reason)) => return Err(Error::TranscodeFailed(reason)),
                        // Leader vanished without publishing; take over
                        None => continue,
                    }
                }
                Role::Leader(tx) => {
                    let _guard = FlightGuard {
                        inflight: &self.inflight,
                        key: key.clone(),
                    };
                    let Some(work) = work.take() else {
                        return Err(Error::Internal("single-flight work already consumed".into()));
                    };
                    let result = work().await;
                    tx.send_replace(Some(match &result {
                        Ok(value) => Ok(value.clone()),
                        Err(e) => Err(e.to_string()),
                    }));
                    return result;
                }
            }
        }
    }
}
