//! Single-flight memoization of the phase metadata fetch.
//!
//! The [`LazyFetchCell`] holds exactly one *generation* at a time. A generation is a spawned
//! fetch whose result is published through a shared channel, so any number of callers can attach
//! to it while it is in flight and keep reading it after it completed.
//!
//! A failed generation replaces itself with a new one before its failure is handed out, so the
//! failure is never replayed to later callers.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use tracing::Instrument;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::records::RawMetadataRecord;
use crate::sources::MetadataSource;
use crate::utils::defer::defer;

/// The immutable, shareable sequence of fetched records.
pub type Records = Arc<[RawMetadataRecord]>;

/// The outcome of a single generation.
pub type FetchResult = Result<Records, FetchError>;

type FetchChannel = Shared<oneshot::Receiver<FetchResult>>;

/// What started a generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
    /// A caller found the cell empty.
    Demand,
    /// The previous generation failed and its reset fetches again right away.
    Reset,
}

impl Trigger {
    fn as_str(&self) -> &'static str {
        match self {
            Trigger::Demand => "demand",
            Trigger::Reset => "reset",
        }
    }
}

#[derive(Clone)]
struct Generation {
    id: u64,
    channel: FetchChannel,
}

struct Inner<S> {
    source: S,
    config: FetchConfig,
    /// The current generation. `None` means the next caller starts a fresh fetch.
    current: Mutex<Option<Generation>>,
    next_id: AtomicU64,
}

/// A lazily fetched, memoized sequence of [`RawMetadataRecord`]s.
///
/// - Concurrent callers share a single in-flight fetch.
/// - A successful result is kept until the cell is dropped.
/// - A failed fetch is reported to everyone waiting on it, but the cell resets itself, so the
///   next call is served by a new fetch.
///
/// The fetch runs as its own tokio task and is owned by the cell. Dropping the future returned by
/// [`get_or_fetch`](Self::get_or_fetch) does not cancel the fetch for other callers.
///
/// Cloning the cell is cheap and all clones share the same state.
pub struct LazyFetchCell<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for LazyFetchCell<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for LazyFetchCell<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let generation = self
            .inner
            .current
            .try_lock()
            .and_then(|current| current.as_ref().map(|generation| generation.id));
        f.debug_struct("LazyFetchCell")
            .field("config", &self.inner.config)
            .field("generation", &generation)
            .finish()
    }
}

impl<S: MetadataSource> LazyFetchCell<S> {
    /// Creates an empty cell with the default [`FetchConfig`].
    ///
    /// Nothing is fetched until the first call to [`get_or_fetch`](Self::get_or_fetch).
    pub fn new(source: S) -> Self {
        Self::with_config(source, FetchConfig::default())
    }

    /// Creates an empty cell.
    pub fn with_config(source: S, config: FetchConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                current: Mutex::new(None),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the memoized records, fetching them if necessary.
    ///
    /// All callers attached to the same generation receive the same result. When that result is
    /// an error, it is the unchanged error of the source.
    ///
    /// This must be called within a tokio runtime.
    pub async fn get_or_fetch(&self) -> FetchResult {
        let Generation { id, channel } = self.inner.attach();

        match channel.await {
            Ok(result) => result,
            Err(_canceled) => {
                self.inner.abandon(id);
                Err(FetchError::Interrupted)
            }
        }
    }
}

impl<S: MetadataSource> Inner<S> {
    /// Returns the current generation, starting a new one if the cell is empty.
    fn attach(self: &Arc<Self>) -> Generation {
        let mut current = self.current.lock();

        if let Some(generation) = current.as_ref() {
            metric!(counter("fetch.channel.hit") += 1);
            return generation.clone();
        }

        metric!(counter("fetch.channel.miss") += 1);
        let generation = self.spawn_generation(Trigger::Demand);
        *current = Some(generation.clone());
        generation
    }

    /// Spawns the fetch for a new generation.
    ///
    /// This does not install the generation, the caller has to do that while holding the lock on
    /// `current`.
    fn spawn_generation(self: &Arc<Self>, trigger: Trigger) -> Generation {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = oneshot::channel();

        let inner = Arc::clone(self);
        let task = async move {
            // Clears the generation if the task unwinds or is dropped before it completes.
            let abandon_token = {
                let inner = Arc::clone(&inner);
                defer(move || inner.abandon(id))
            };

            let result = inner.fetch(id, trigger).await;

            if result.is_err() {
                if let Some(next) = inner.reset(id, trigger) {
                    // The failing generation is released only after the eager re-fetch settled.
                    next.await.ok();
                }
            }

            abandon_token.disarm();
            sender.send(result).ok();
        }
        .instrument(tracing::debug_span!("phase_metadata", generation = id));

        tokio::spawn(task);

        Generation {
            id,
            channel: receiver.shared(),
        }
    }

    async fn fetch(&self, id: u64, trigger: Trigger) -> FetchResult {
        metric!(counter("fetch.started") += 1, "trigger" => trigger.as_str());
        tracing::debug!(
            generation = id,
            trigger = trigger.as_str(),
            "Fetching phase metadata"
        );

        let start = Instant::now();
        let result = self.source.fetch_all().await.map(Records::from);

        metric!(
            timer("fetch.duration") = start.elapsed(),
            "status" => if result.is_ok() { "ok" } else { "error" },
        );

        match &result {
            Ok(records) => {
                tracing::info!(
                    generation = id,
                    records = records.len(),
                    "Fetched phase metadata"
                );
            }
            Err(err) => {
                tracing::warn!(
                    generation = id,
                    error = err as &dyn std::error::Error,
                    "Failed to fetch phase metadata"
                );
            }
        }

        result
    }

    /// Replaces the failed generation `failed`.
    ///
    /// A generation that was started on demand is replaced by an eagerly started one, whose channel
    /// is returned. A generation that was itself started by a reset, or any generation when eager
    /// retries are disabled, is replaced by an empty slot.
    fn reset(self: &Arc<Self>, failed: u64, trigger: Trigger) -> Option<FetchChannel> {
        let mut current = self.current.lock();

        if current.as_ref().map(|generation| generation.id) != Some(failed) {
            return None;
        }

        metric!(counter("fetch.reset") += 1, "trigger" => trigger.as_str());

        if trigger == Trigger::Demand && self.config.eager_retry {
            tracing::debug!(generation = failed, "Resetting failed generation, fetching again");
            let next = self.spawn_generation(Trigger::Reset);
            let channel = next.channel.clone();
            *current = Some(next);
            Some(channel)
        } else {
            tracing::debug!(generation = failed, "Resetting failed generation");
            *current = None;
            None
        }
    }

    /// Clears generation `id` if it is still current.
    fn abandon(&self, id: u64) {
        let mut current = self.current.lock();

        if current.as_ref().is_some_and(|generation| generation.id == id) {
            tracing::error!(generation = id, "Phase metadata fetch was abandoned");
            *current = None;
        }
    }
}
