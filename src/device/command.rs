//! Position source backed by an external program
//!
//! The program is run once per request and must print a single fix on
//! stdout, either as JSON (`{"latitude": .., "longitude": .., "accuracy": ..}`)
//! or as `lat,lon`. Exit codes map to failure codes:
//! - `1` permission denied
//! - `2` position unavailable
//! - `3` timeout
//!
//! Any other non-zero exit is reported as position unavailable.

use super::{Position, PositionErrorCode, PositionRequest, PositionSource};
use crate::coordinate::Coordinate;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::SystemTime;
use tokio::process::Command;

/// Accuracy reported when the program prints a bare `lat,lon`.
const UNKNOWN_ACCURACY: f64 = f64::INFINITY;

#[derive(Deserialize)]
struct FixOutput {
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
}

pub struct CommandPositionSource {
    program: PathBuf,
    args: Vec<String>,
    last_fix: Mutex<Option<Position>>,
}

impl CommandPositionSource {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            last_fix: Mutex::new(None),
        }
    }

    /// Most recent fix, if it is no older than `request.maximum_age`.
    fn cached_fix(&self, request: &PositionRequest) -> Option<Position> {
        if request.maximum_age.is_zero() {
            return None;
        }
        let cached = (*self.last_fix.lock().ok()?)?;
        let age = SystemTime::now().duration_since(cached.timestamp).ok()?;
        (age <= request.maximum_age).then_some(cached)
    }

    fn remember(&self, position: Position) {
        if let Ok(mut last) = self.last_fix.lock() {
            *last = Some(position);
        }
    }

    async fn run_program(
        &self,
        request: &PositionRequest,
    ) -> std::result::Result<Position, PositionErrorCode> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .env("GEOCACHE_HIGH_ACCURACY", if request.high_accuracy { "1" } else { "0" })
            .env("GEOCACHE_TIMEOUT_MS", request.timeout.as_millis().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::warn!("Failed to start {}: {}", self.program.display(), e);
                match e.kind() {
                    std::io::ErrorKind::PermissionDenied => PositionErrorCode::PermissionDenied,
                    _ => PositionErrorCode::PositionUnavailable,
                }
            })?;

        let output = match tokio::time::timeout(request.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!("Position program failed: {}", e);
                return Err(PositionErrorCode::PositionUnavailable);
            }
            Err(_) => return Err(PositionErrorCode::Timeout),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("Position program exited with {}: {}", output.status, stderr.trim());
            return Err(match output.status.code() {
                Some(1) => PositionErrorCode::PermissionDenied,
                Some(3) => PositionErrorCode::Timeout,
                _ => PositionErrorCode::PositionUnavailable,
            });
        }

        parse_fix(&String::from_utf8_lossy(&output.stdout))
            .ok_or(PositionErrorCode::PositionUnavailable)
    }
}

#[async_trait]
impl PositionSource for CommandPositionSource {
    fn is_supported(&self) -> bool {
        is_executable_available(&self.program)
    }

    async fn current_position(
        &self,
        request: PositionRequest,
    ) -> std::result::Result<Position, PositionErrorCode> {
        if let Some(cached) = self.cached_fix(&request) {
            tracing::debug!("Reusing device fix {}", cached.coordinate);
            return Ok(cached);
        }

        let position = self.run_program(&request).await?;
        self.remember(position);
        Ok(position)
    }
}

/// Parse one fix from program output. Invalid coordinates yield `None`.
fn parse_fix(stdout: &str) -> Option<Position> {
    let text = stdout.trim();

    let (coordinate, accuracy) = if text.starts_with('{') {
        let fix: FixOutput = serde_json::from_str(text).ok()?;
        (
            Coordinate::new(fix.latitude, fix.longitude),
            fix.accuracy.unwrap_or(UNKNOWN_ACCURACY),
        )
    } else {
        (text.parse::<Coordinate>().ok()?, UNKNOWN_ACCURACY)
    };

    coordinate.is_valid().then(|| Position::new(coordinate, accuracy))
}

/// Probe for the program: an explicit path must exist, a bare name must be on `PATH`.
fn is_executable_available(program: &Path) -> bool {
    if program.as_os_str().is_empty() {
        return false;
    }
    if program.components().count() > 1 {
        return program.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}
