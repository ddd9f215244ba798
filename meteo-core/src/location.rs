//! Location the weather resource follows.
//!
//! The lookup itself (IP geolocation, GPS, a fixed home) lives outside this
//! crate. Whatever produces coordinates publishes them into a
//! [`LocationSignal`]; resources subscribe and re-fetch on every new value.

use std::{future::Future, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone)]
pub struct LocationSignal {
    tx: Arc<watch::Sender<Option<Location>>>,
}

impl LocationSignal {
    /// A signal with no location yet. Subscribers wait until [`set`](Self::set) is called.
    pub fn pending() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn resolved(location: Location) -> Self {
        let (tx, _) = watch::channel(Some(location));
        Self { tx: Arc::new(tx) }
    }

    /// Run `lookup` in the background and publish its result.
    ///
    /// A failed lookup leaves the signal pending. Must be called from within a Tokio runtime.
    pub fn resolve_with<F>(lookup: F) -> Self
    where
        F: Future<Output = anyhow::Result<Location>> + Send + 'static,
    {
        let signal = Self::pending();
        let publisher = signal.clone();

        tokio::spawn(async move {
            match lookup.await {
                Ok(location) => publisher.set(location),
                Err(err) => warn!(error = %format!("{err:#}"), "Location lookup failed"),
            }
        });

        signal
    }

    /// Publish a location. Every subscriber sees a change, even if the value is equal.
    pub fn set(&self, location: Location) {
        debug!(?location, "Location updated");
        self.tx.send_replace(Some(location));
    }

    pub fn current(&self) -> Option<Location> {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Location>> {
        self.tx.subscribe()
    }
}
