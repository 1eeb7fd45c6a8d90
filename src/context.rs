//! Composition root - builds the store, resolver and marker adapter from config
//!
//! The store handle is owned here and shared by reference count; nothing in
//! the crate holds a process-wide connection.

use crate::config::{self, GeocacheConfig};
use crate::device::{CommandPositionSource, PositionSource, UnsupportedSource};
use crate::resolver::LocationResolver;
use crate::storage::{FileKeyValueStore, KeyValueStore, LocationStore, SqliteConnector};
use crate::surface::{DEFAULT_QUIET_PERIOD, MarkerDebouncer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub struct LocationContext {
    pub store: Arc<LocationStore>,
    pub resolver: LocationResolver,
    debounce: Duration,
}

impl LocationContext {
    /// Build from `config`; relative paths resolve against `base`.
    pub fn from_config(config: &GeocacheConfig, base: &Path) -> Self {
        let database = config
            .storage
            .database
            .as_deref()
            .map(|p| resolve_path(base, p));
        let fallback_path = config
            .storage
            .fallback
            .as_deref()
            .map(|p| resolve_path(base, p))
            .unwrap_or_else(|| config::default_fallback_path_in(base));

        let fallback: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(fallback_path));
        let store = Arc::new(LocationStore::new(
            Arc::new(SqliteConnector::new(database)),
            fallback,
        ));

        let source: Arc<dyn PositionSource> = match &config.device.command {
            Some(command) => Arc::new(CommandPositionSource::new(command, config.device.args.clone())),
            None => Arc::new(UnsupportedSource),
        };

        let mut resolver = LocationResolver::new(Arc::clone(&store), source);
        match config.resolver.fallback {
            Some(fallback) if fallback.is_valid() => resolver = resolver.with_fallback(fallback),
            Some(fallback) => tracing::warn!(
                "Ignoring invalid resolver.fallback ({}) in config, using {}",
                fallback,
                resolver.fallback()
            ),
            None => {}
        }
        if let Some(ms) = config.resolver.best_effort_timeout_ms {
            resolver = resolver.with_best_effort_timeout(Duration::from_millis(ms));
        }

        let debounce = config
            .surface
            .debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_QUIET_PERIOD);

        Self { store, resolver, debounce }
    }

    /// Start a marker adapter that writes to this context's store.
    pub fn marker_debouncer(&self) -> MarkerDebouncer {
        MarkerDebouncer::spawn(Arc::clone(&self.store), self.debounce)
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

fn resolve_path(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;

    #[tokio::test]
    async fn test_default_config_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeocacheConfig::with_defaults();

        let context = LocationContext::from_config(&config, dir.path());
        context.store.put(Coordinate::new(12.0, 34.0)).await.unwrap();
        assert!(config::default_database_path_in(dir.path()).exists());

        let reopened = LocationContext::from_config(&config, dir.path());
        assert_eq!(reopened.store.get().await, Some(Coordinate::new(12.0, 34.0)));
    }

    #[tokio::test]
    async fn test_without_database_falls_back_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let context = LocationContext::from_config(&GeocacheConfig::default(), dir.path());

        context.store.put(Coordinate::new(-1.0, -2.0)).await.unwrap();
        assert!(config::default_fallback_path_in(dir.path()).exists());
        assert_eq!(context.store.get().await, Some(Coordinate::new(-1.0, -2.0)));
    }

    #[tokio::test]
    async fn test_no_device_resolves_to_configured_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GeocacheConfig::default();
        config.resolver.fallback = Some(Coordinate::new(3.0, 4.0));

        let context = LocationContext::from_config(&config, dir.path());
        assert_eq!(context.resolver.best_effort().await, Coordinate::new(3.0, 4.0));
        assert!(context.resolver.locate_now().await.is_err());
        assert_eq!(context.debounce(), DEFAULT_QUIET_PERIOD);
    }

    #[tokio::test]
    async fn test_invalid_configured_fallback_keeps_default_center() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GeocacheConfig::default();
        config.resolver.fallback = Some(Coordinate::new(123.0, 4.0));

        let context = LocationContext::from_config(&config, dir.path());
        assert_eq!(context.resolver.fallback(), crate::DEFAULT_CENTER);
        assert_eq!(context.resolver.best_effort().await, crate::DEFAULT_CENTER);
    }
}
