//! Location Store - durable get/put of the current location
//!
//! The primary engine is optional infrastructure: every operation degrades
//! to the fallback key-value store when the engine is absent or errors.
//! Only a structurally invalid coordinate fails `put` regardless of backend.
//!
//! Once a `put` lands in the fallback because the primary write failed, the
//! primary row is stale: `get` prefers the fallback until a later primary
//! write succeeds.

use super::schema::{CURRENT_KEY, FALLBACK_KEY};
use super::{EngineConnector, KeyValueStore, LocationEngine};
use crate::coordinate::Coordinate;
use crate::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;

pub struct LocationStore {
    connector: Arc<dyn EngineConnector>,
    engine: OnceCell<Arc<dyn LocationEngine>>,
    fallback: Arc<dyn KeyValueStore>,
    /// Set while the newest successful write lives only in the fallback
    primary_stale: AtomicBool,
}

impl LocationStore {
    pub fn new(connector: Arc<dyn EngineConnector>, fallback: Arc<dyn KeyValueStore>) -> Self {
        Self {
            connector,
            engine: OnceCell::new(),
            fallback,
            primary_stale: AtomicBool::new(false),
        }
    }

    /// Open the primary engine, or return the handle opened earlier.
    ///
    /// Concurrent callers share one in-flight connect. A failed connect is
    /// not remembered, so a later call tries again.
    pub async fn open(&self) -> Result<Arc<dyn LocationEngine>> {
        self.engine
            .get_or_try_init(|| async {
                tracing::debug!("Opening primary location engine");
                self.connector.connect().await
            })
            .await
            .map(Arc::clone)
    }

    /// Persist `coordinate` as the current location.
    pub async fn put(&self, coordinate: Coordinate) -> Result<()> {
        coordinate.validate()?;

        let primary_err = match self.put_primary(coordinate).await {
            Ok(()) => {
                self.primary_stale.store(false, Ordering::SeqCst);
                tracing::debug!("Stored location {}", coordinate);
                return Ok(());
            }
            Err(e) => e,
        };

        tracing::warn!("Primary store write failed, using fallback: {}", primary_err);

        match self.put_fallback(coordinate).await {
            Ok(()) => {
                self.primary_stale.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(fallback_err) => Err(Error::PersistenceFailed {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            }),
        }
    }

    /// Current location, or `None` when nothing usable is stored. Never fails.
    pub async fn get(&self) -> Option<Coordinate> {
        if self.primary_stale.load(Ordering::SeqCst) {
            if let Some(coordinate) = self.read_fallback().await {
                return Some(coordinate);
            }
        }

        match self.get_primary().await {
            Ok(Some(coordinate)) if coordinate.is_valid() => return Some(coordinate),
            Ok(Some(coordinate)) => {
                tracing::warn!("Ignoring invalid stored location ({})", coordinate);
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("Primary store read failed, trying fallback: {}", e),
        }

        self.read_fallback().await
    }

    async fn read_fallback(&self) -> Option<Coordinate> {
        match self.get_fallback().await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!("Fallback store read failed: {}", e);
                None
            }
        }
    }

    async fn put_primary(&self, coordinate: Coordinate) -> Result<()> {
        self.open().await?.put(CURRENT_KEY, coordinate).await
    }

    async fn get_primary(&self) -> Result<Option<Coordinate>> {
        self.open().await?.get(CURRENT_KEY).await
    }

    async fn put_fallback(&self, coordinate: Coordinate) -> Result<()> {
        let encoded = serde_json::to_string(&coordinate)?;
        self.fallback.set_item(FALLBACK_KEY, &encoded).await
    }

    async fn get_fallback(&self) -> Result<Option<Coordinate>> {
        let Some(encoded) = self.fallback.get_item(FALLBACK_KEY).await? else {
            return Ok(None);
        };
        let coordinate: Coordinate = serde_json::from_str(&encoded)?;
        Ok(coordinate.is_valid().then_some(coordinate))
    }
}
