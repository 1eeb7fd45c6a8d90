//! Storage Layer - single "current location" cell
//!
//! System of record is SQLite with one table:
//! - userLocation(key, latitude, longitude), holding only the `"current"` row
//!
//! When SQLite is unavailable or fails, a flat string-keyed store holds the
//! JSON-encoded coordinate under `"user-location"` instead.

pub mod schema;
pub mod sqlite;
pub mod fallback;
pub mod store;

use crate::Result;
use crate::coordinate::Coordinate;
use async_trait::async_trait;
use std::sync::Arc;

pub use fallback::{FileKeyValueStore, MemoryKeyValueStore};
pub use sqlite::{SqliteConnector, SqliteEngine};
pub use store::LocationStore;

/// An open connection to the primary transactional engine.
#[async_trait]
pub trait LocationEngine: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Coordinate>>;

    /// Write all-or-nothing: either the whole record is visible afterwards or nothing changed.
    async fn put(&self, key: &str, coordinate: Coordinate) -> Result<()>;
}

/// Creates the primary engine connection. Called at most once per successful open.
#[async_trait]
pub trait EngineConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn LocationEngine>>;
}

/// Flat string-keyed persistence used as the fallback path.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
}
