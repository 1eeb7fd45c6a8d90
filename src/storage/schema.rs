//! Database schema definitions

/// Logical database name, also the default file stem
pub const DATABASE_NAME: &str = "MapLocationDB";

/// Schema version stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Table holding the location record
pub const LOCATION_TABLE: &str = "userLocation";

/// Key of the single location record
pub const CURRENT_KEY: &str = "current";

/// Key used by the fallback key-value store
pub const FALLBACK_KEY: &str = "user-location";

/// SQL to create the location table
pub const CREATE_LOCATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS userLocation (
    key TEXT PRIMARY KEY,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL
)
"#;

pub const SELECT_LOCATION: &str =
    "SELECT latitude, longitude FROM userLocation WHERE key = ?1";

pub const UPSERT_LOCATION: &str =
    "INSERT OR REPLACE INTO userLocation (key, latitude, longitude) VALUES (?1, ?2, ?3)";

/// Statements run when upgrading from `from_version` to [`SCHEMA_VERSION`]
pub fn upgrade_statements(from_version: i64) -> Vec<&'static str> {
    let mut stmts = Vec::new();
    if from_version < 1 {
        stmts.push(CREATE_LOCATION_TABLE);
    }
    stmts
}
