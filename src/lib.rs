//! # Geocache - offline-first location cache for map widgets
//!
//! Decides where a map should be centered and remembers the answer.
//!
//! Geocache provides:
//! - A location store backed by SQLite, degrading to a flat key-value file
//! - A resolver that picks between the stored value, a live device fix and a static default
//! - Fire-and-forget write-back of live fixes
//! - A debouncing adapter for user-driven marker moves

pub mod coordinate;
pub mod storage;
pub mod device;
pub mod resolver;
pub mod surface;
pub mod context;
pub mod config;
pub mod output;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use coordinate::{Coordinate, DEFAULT_CENTER};
pub use device::{LocationError, LocationErrorKind, PositionSource};
pub use resolver::{LocationResolver, Origin, Resolution, ResolveOptions};
pub use storage::LocationStore;
pub use surface::MarkerDebouncer;
pub use context::LocationContext;

/// Result type alias for Geocache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Geocache operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Persistence failed (primary: {primary}; fallback: {fallback})")]
    PersistenceFailed { primary: String, fallback: String },

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
