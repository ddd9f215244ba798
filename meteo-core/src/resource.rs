//! Observable, re-fetchable weather resource.
//!
//! A [`WeatherResource`] is backed by one background task. The task waits for
//! the [`LocationSignal`] to hold a value, fetches, publishes the outcome as a
//! [`ResourceState`], then sleeps until the location changes or
//! [`WeatherResource::refetch`] is called. [`WeatherResources`] hands out one
//! shared resource per distinct `(latitude, longitude)` argument pair.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use thiserror::Error;
use tokio::{
    sync::{Notify, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    location::{Location, LocationSignal},
    memo::Memo,
    model::{WeatherRequest, WeatherSnapshot},
    provider::WeatherProvider,
};

#[derive(Debug, Clone, Error)]
pub enum ResourceError {
    #[error("weather fetch failed: {0:#}")]
    Fetch(Arc<anyhow::Error>),

    #[error("weather resource has been disposed")]
    Disposed,
}

#[derive(Debug, Clone)]
pub enum ResourceState {
    /// No location yet, nothing fetched.
    Unresolved,
    /// A fetch is in flight. `latest` is the previous snapshot, if any.
    Loading { latest: Option<WeatherSnapshot> },
    Ready(WeatherSnapshot),
    Errored(ResourceError),
}

impl ResourceState {
    /// The value a reader should show: the settled snapshot, or the previous
    /// one while reloading.
    pub fn data(&self) -> Option<WeatherSnapshot> {
        match self {
            ResourceState::Ready(snapshot) => Some(*snapshot),
            ResourceState::Loading { latest } => *latest,
            ResourceState::Unresolved | ResourceState::Errored(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ResourceError> {
        match self {
            ResourceState::Errored(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ResourceState::Loading { .. })
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, ResourceState::Ready(_) | ResourceState::Errored(_))
    }
}

/// Caller-supplied coordinates that take precedence over the location signal, per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoordinateOverride {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CoordinateOverride {
    pub fn resolve(&self, location: Location) -> WeatherRequest {
        WeatherRequest {
            latitude: self.latitude.unwrap_or(location.latitude),
            longitude: self.longitude.unwrap_or(location.longitude),
        }
    }
}

/// Cache key for [`WeatherResources`]. Coordinates compare bitwise after
/// folding `-0.0` into `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    latitude: Option<u64>,
    longitude: Option<u64>,
}

impl From<CoordinateOverride> for ResourceKey {
    fn from(args: CoordinateOverride) -> Self {
        fn canonical(value: f64) -> u64 {
            if value == 0.0 { 0.0_f64.to_bits() } else { value.to_bits() }
        }

        Self {
            latitude: args.latitude.map(canonical),
            longitude: args.longitude.map(canonical),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Location,
    Refetch,
}

/// State shared between the task and every handle.
#[derive(Debug)]
struct Shared {
    state: watch::Sender<ResourceState>,
    /// Bumped by every `refetch()`; a result fetched under an older value is dropped.
    generation: AtomicU64,
    disposed: AtomicBool,
    refetch: Notify,
}

impl Shared {
    /// Move to `Loading`, keeping the current value visible.
    ///
    /// No-op once disposed, while already loading, or while unresolved unless
    /// `from_unresolved` is set.
    fn begin_loading(&self, from_unresolved: bool) {
        self.state.send_if_modified(|state| {
            let skip = self.disposed.load(Ordering::Acquire)
                || state.is_loading()
                || (!from_unresolved && matches!(state, ResourceState::Unresolved));
            if skip {
                return false;
            }
            *state = ResourceState::Loading { latest: state.data() };
            true
        });
    }

    /// Publish a settled state. Disposal is final, so this is ignored afterwards.
    fn settle(&self, next: ResourceState) {
        self.state.send_if_modified(|state| {
            if self.disposed.load(Ordering::Acquire) {
                return false;
            }
            *state = next;
            true
        });
    }
}

/// Background half of a resource.
struct Fetcher {
    provider: Arc<dyn WeatherProvider>,
    overrides: CoordinateOverride,
    location: watch::Receiver<Option<Location>>,
    location_open: bool,
    shared: Arc<Shared>,
}

impl Fetcher {
    async fn run(mut self) {
        loop {
            let location = *self.location.borrow_and_update();

            let superseded = match location {
                Some(location) => self.fetch(location).await,
                None => false,
            };

            if !superseded {
                self.next_trigger().await;
            }
        }
    }

    /// Fetch once. Returns `true` when a newer trigger cut the request short.
    async fn fetch(&mut self, location: Location) -> bool {
        let request = self.overrides.resolve(location);
        let generation = self.shared.generation.load(Ordering::Acquire);
        self.shared.begin_loading(true);

        let provider = Arc::clone(&self.provider);
        let outcome = tokio::select! {
            result = provider.get_weather(&request) => result,
            trigger = self.next_trigger() => {
                debug!(?trigger, ?request, "Superseding in-flight weather request");
                return true;
            }
        };

        // A refetch landed after the result arrived; its notification is
        // still pending and starts the next fetch.
        if self.shared.generation.load(Ordering::Acquire) != generation {
            debug!(?request, "Dropping weather result overtaken by a refetch");
            return false;
        }

        match outcome {
            Ok(snapshot) => {
                debug!(?snapshot, "Received weather data");
                self.shared.settle(ResourceState::Ready(snapshot));
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), ?request, "Weather fetch failed");
                let err = ResourceError::Fetch(Arc::new(err));
                self.shared.settle(ResourceState::Errored(err));
            }
        }

        false
    }

    async fn next_trigger(&mut self) -> Trigger {
        loop {
            tokio::select! {
                changed = self.location.changed(), if self.location_open => match changed {
                    Ok(()) => return Trigger::Location,
                    // Source gone; keep the last value and only answer refetches.
                    Err(_) => self.location_open = false,
                },
                () = self.shared.refetch.notified() => return Trigger::Refetch,
            }
        }
    }
}

#[derive(Debug)]
struct Inner {
    shared: Arc<Shared>,
    overrides: CoordinateOverride,
    task: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Handle to a running weather resource. Clones share the same task; the task
/// stops when the last clone is dropped or on [`dispose`](Self::dispose).
#[derive(Debug, Clone)]
pub struct WeatherResource {
    inner: Arc<Inner>,
}

impl WeatherResource {
    /// Spawn a resource. Must be called from within a Tokio runtime.
    pub fn spawn(
        provider: Arc<dyn WeatherProvider>,
        location: &LocationSignal,
        overrides: CoordinateOverride,
    ) -> Self {
        let (state, _) = watch::channel(ResourceState::Unresolved);
        let shared = Arc::new(Shared {
            state,
            generation: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
            refetch: Notify::new(),
        });

        let fetcher = Fetcher {
            provider,
            overrides,
            location: location.subscribe(),
            location_open: true,
            shared: Arc::clone(&shared),
        };
        let task = tokio::spawn(fetcher.run());

        Self { inner: Arc::new(Inner { shared, overrides, task }) }
    }

    /// Latest snapshot, if one is available.
    pub fn data(&self) -> Option<WeatherSnapshot> {
        self.inner.shared.state.borrow().data()
    }

    pub fn state(&self) -> ResourceState {
        self.inner.shared.state.borrow().clone()
    }

    pub fn error(&self) -> Option<ResourceError> {
        self.inner.shared.state.borrow().error().cloned()
    }

    pub fn overrides(&self) -> CoordinateOverride {
        self.inner.overrides
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceState> {
        self.inner.shared.state.subscribe()
    }

    /// Wait for the current fetch to settle and return the result.
    ///
    /// Returns immediately if the resource is already settled. Pends while the
    /// location is unresolved. After [`refetch`](Self::refetch) this waits for
    /// the new fetch, not the previous result.
    pub async fn settled(&self) -> Result<WeatherSnapshot, ResourceError> {
        let mut rx = self.subscribe();
        let state = rx
            .wait_for(ResourceState::is_settled)
            .await
            .map_err(|_| ResourceError::Disposed)?
            .clone();

        match state {
            ResourceState::Ready(snapshot) => Ok(snapshot),
            ResourceState::Errored(err) => Err(err),
            ResourceState::Unresolved | ResourceState::Loading { .. } => {
                Err(ResourceError::Disposed)
            }
        }
    }

    /// Re-run the fetch with the same inputs, superseding one that is in flight.
    ///
    /// Once a location is known the state turns `Loading` before this returns.
    pub fn refetch(&self) -> Result<(), ResourceError> {
        let shared = &self.inner.shared;
        if shared.disposed.load(Ordering::Acquire) {
            return Err(ResourceError::Disposed);
        }

        shared.generation.fetch_add(1, Ordering::AcqRel);
        shared.begin_loading(false);
        shared.refetch.notify_one();
        Ok(())
    }

    /// Stop the task for every clone of this handle. The state settles on
    /// [`ResourceError::Disposed`] and further refetches fail.
    pub fn dispose(&self) {
        let shared = &self.inner.shared;
        if shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.task.abort();
        shared.state.send_replace(ResourceState::Errored(ResourceError::Disposed));
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.shared.disposed.load(Ordering::Acquire)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Memoized factory for [`WeatherResource`]s sharing one provider and one location signal.
///
/// [`dispose`](Self::dispose) tears down every resource handed out so far;
/// dropping the registry releases its clones.
#[derive(Debug)]
pub struct WeatherResources {
    provider: Arc<dyn WeatherProvider>,
    location: LocationSignal,
    resources: Memo<ResourceKey, WeatherResource>,
}

impl WeatherResources {
    pub fn new(provider: Arc<dyn WeatherProvider>, location: LocationSignal) -> Self {
        Self { provider, location, resources: Memo::new() }
    }

    /// Return the shared resource for this argument pair, spawning it on first use.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn weather(&self, latitude: Option<f64>, longitude: Option<f64>) -> WeatherResource {
        let overrides = CoordinateOverride { latitude, longitude };

        self.resources.get_or_insert_with(overrides.into(), || {
            debug!(?overrides, "Creating weather resource");
            WeatherResource::spawn(Arc::clone(&self.provider), &self.location, overrides)
        })
    }

    pub fn location(&self) -> &LocationSignal {
        &self.location
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Dispose every cached resource, including clones callers still hold.
    pub fn dispose(&self) {
        let released = self.resources.clear();
        for resource in &released {
            resource.dispose();
        }
        debug!(released = released.len(), "Disposed weather resources");
    }
}
