use crate::coordinate::Coordinate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GeocacheConfig {
    pub storage: StorageConfig,
    pub resolver: ResolverConfig,
    pub device: DeviceConfig,
    pub surface: SurfaceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. Unset disables the primary engine.
    pub database: Option<String>,
    /// Fallback key-value file
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    pub fallback: Option<Coordinate>,
    pub best_effort_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Program that prints one position fix. Unset means no geolocation capability.
    pub command: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SurfaceConfig {
    pub debounce_ms: Option<u64>,
}

impl GeocacheConfig {
    /// Config written by `geocache init`
    pub fn with_defaults() -> Self {
        Self {
            storage: StorageConfig {
                database: Some(default_database_path_in(Path::new(".")).display().to_string()),
                fallback: Some(default_fallback_path_in(Path::new(".")).display().to_string()),
            },
            resolver: ResolverConfig {
                fallback: Some(crate::DEFAULT_CENTER),
                best_effort_timeout_ms: Some(crate::resolver::BEST_EFFORT_TIMEOUT.as_millis() as u64),
            },
            device: DeviceConfig::default(),
            surface: SurfaceConfig {
                debounce_ms: Some(crate::surface::DEFAULT_QUIET_PERIOD.as_millis() as u64),
            },
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("geocache.toml")
}

pub fn default_data_dir_in(base: &Path) -> PathBuf {
    base.join(".geocache")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    default_data_dir_in(base).join(format!("{}.sqlite3", crate::storage::schema::DATABASE_NAME))
}

pub fn default_fallback_path_in(base: &Path) -> PathBuf {
    default_data_dir_in(base).join("local-storage.json")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<GeocacheConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: GeocacheConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &GeocacheConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
