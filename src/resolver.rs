//! Location Resolver
//!
//! Decides which coordinate the map should use. Resolution order:
//! 1. Stored value (skipped when forcing a fresh fix)
//! 2. One live device fix, bounded by a timeout
//! 3. Static fallback, unless the caller asked for errors
//!
//! A live fix is written back to the store by a detached task. `resolve`
//! never waits for that write and never sees its failure.

use crate::coordinate::{Coordinate, DEFAULT_CENTER};
use crate::device::{LocationError, LocationErrorKind, PositionRequest, PositionSource};
use crate::storage::LocationStore;
use crate::Result;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default bound on waiting for a live fix
pub const DEFAULT_FIX_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound used by [`LocationResolver::best_effort`] unless configured otherwise
pub const BEST_EFFORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound used by [`LocationResolver::locate_now`]
pub const FORCED_FIX_TIMEOUT: Duration = Duration::from_secs(10);

/// How old a device-cached fix may be when a fresh one is not forced
pub const DEVICE_CACHE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveOptions {
    /// Skip the stored value and always ask the device
    pub force_fresh: bool,
    /// Returned when nothing better is available and errors are swallowed
    pub fallback: Coordinate,
    pub timeout: Duration,
    /// Propagate live-fix failures instead of returning `fallback`
    pub throw_on_error: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            force_fresh: false,
            fallback: DEFAULT_CENTER,
            timeout: DEFAULT_FIX_TIMEOUT,
            throw_on_error: false,
        }
    }
}

impl ResolveOptions {
    /// Cached value if any, never fails. Used for initial map centering.
    pub fn best_effort(fallback: Coordinate, timeout: Duration) -> Self {
        Self {
            force_fresh: false,
            fallback,
            timeout,
            throw_on_error: false,
        }
    }

    /// Always a live fix, failures propagate. Used for explicit "locate me".
    pub fn forced() -> Self {
        Self {
            force_fresh: true,
            timeout: FORCED_FIX_TIMEOUT,
            throw_on_error: true,
            ..Self::default()
        }
    }

    pub fn with_fallback(mut self, fallback: Coordinate) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn device_request(&self) -> PositionRequest {
        PositionRequest {
            high_accuracy: true,
            timeout: self.timeout,
            maximum_age: if self.force_fresh {
                Duration::ZERO
            } else {
                DEVICE_CACHE_WINDOW
            },
        }
    }
}

/// Where a resolved coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Stored,
    Live,
    Fallback,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Live => "live",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    pub coordinate: Coordinate,
    pub origin: Origin,
    /// Why the fallback was used, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<LocationErrorKind>,
}

impl Resolution {
    fn new(coordinate: Coordinate, origin: Origin) -> Self {
        Self {
            coordinate,
            origin,
            failure: None,
        }
    }
}

pub struct LocationResolver {
    store: Arc<LocationStore>,
    source: Arc<dyn PositionSource>,
    fallback: Coordinate,
    best_effort_timeout: Duration,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl LocationResolver {
    pub fn new(store: Arc<LocationStore>, source: Arc<dyn PositionSource>) -> Self {
        Self {
            store,
            source,
            fallback: DEFAULT_CENTER,
            best_effort_timeout: BEST_EFFORT_TIMEOUT,
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    /// Fallback used by [`LocationResolver::best_effort`]
    pub fn with_fallback(mut self, fallback: Coordinate) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_best_effort_timeout(mut self, timeout: Duration) -> Self {
        self.best_effort_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<LocationStore> {
        &self.store
    }

    pub fn fallback(&self) -> Coordinate {
        self.fallback
    }

    pub async fn resolve(&self, options: &ResolveOptions) -> Result<Coordinate> {
        self.resolve_detailed(options).await.map(|r| r.coordinate)
    }

    /// Resolve and report which source answered.
    ///
    /// With `throw_on_error == false` this never returns `Err`.
    pub async fn resolve_detailed(&self, options: &ResolveOptions) -> Result<Resolution> {
        if !options.force_fresh {
            if let Some(stored) = self.store.get().await {
                tracing::debug!("Using stored location {}", stored);
                return Ok(Resolution::new(stored, Origin::Stored));
            }
        }

        match self.live_fix(options).await {
            Ok(coordinate) => {
                self.persist_in_background(coordinate);
                Ok(Resolution::new(coordinate, Origin::Live))
            }
            Err(err) if options.throw_on_error => Err(err.into()),
            Err(err) => {
                let fallback = usable_fallback(options.fallback);
                tracing::info!("Live fix failed ({}), using fallback {}", err.kind, fallback);
                Ok(Resolution {
                    failure: Some(err.kind),
                    ..Resolution::new(fallback, Origin::Fallback)
                })
            }
        }
    }

    /// Stored value, live fix or configured fallback. Never fails.
    pub async fn best_effort(&self) -> Coordinate {
        let options = ResolveOptions::best_effort(self.fallback, self.best_effort_timeout);
        match self.resolve(&options).await {
            Ok(coordinate) => coordinate,
            Err(_) => usable_fallback(self.fallback),
        }
    }

    /// Fresh live fix with a 10 second bound. Failures carry a displayable message.
    pub async fn locate_now(&self) -> Result<Coordinate> {
        self.resolve(&ResolveOptions::forced().with_fallback(self.fallback))
            .await
    }

    /// Write `coordinate` to the store on a detached task; failures are only logged.
    pub fn persist_in_background(&self, coordinate: Coordinate) {
        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move {
            if let Err(e) = store.put(coordinate).await {
                tracing::warn!("Failed to persist location {}: {}", coordinate, e);
            }
        });

        if let Ok(mut pending) = self.pending_writes.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    /// Wait for background writes started so far. Short-lived hosts call this
    /// before shutting the runtime down; `resolve` itself never does.
    pub async fn flush_pending_writes(&self) {
        let pending = match self.pending_writes.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!("Background location write failed: {}", e);
            }
        }
    }

    /// One device-fix attempt raced against `options.timeout`.
    ///
    /// The request runs on its own task. If the timeout wins, that task is
    /// left to finish on its own and its result is dropped.
    async fn live_fix(&self, options: &ResolveOptions) -> std::result::Result<Coordinate, LocationError> {
        if !self.source.is_supported() {
            return Err(LocationError::new(LocationErrorKind::Unsupported));
        }

        let request = options.device_request();
        let source = Arc::clone(&self.source);
        let pending = tokio::spawn(async move { source.current_position(request).await });

        let position = match tokio::time::timeout(options.timeout, pending).await {
            Ok(Ok(Ok(position))) => position,
            Ok(Ok(Err(code))) => return Err(code.into()),
            Ok(Err(join_err)) => {
                tracing::error!("Position request failed unexpectedly: {}", join_err);
                return Err(LocationError::new(LocationErrorKind::Unknown));
            }
            Err(_) => {
                tracing::debug!("Position request timed out after {:?}", options.timeout);
                return Err(LocationError::new(LocationErrorKind::Timeout));
            }
        };

        let coordinate = position.coordinate;
        if !coordinate.is_valid() {
            tracing::warn!("Device reported an invalid position ({})", coordinate);
            return Err(LocationError::new(LocationErrorKind::PositionUnavailable));
        }

        Ok(coordinate)
    }
}

/// `fallback` if it satisfies the coordinate invariant, else [`DEFAULT_CENTER`].
fn usable_fallback(fallback: Coordinate) -> Coordinate {
    if fallback.is_valid() {
        fallback
    } else {
        tracing::warn!("Ignoring invalid fallback ({}), using {}", fallback, DEFAULT_CENTER);
        DEFAULT_CENTER
    }
}
